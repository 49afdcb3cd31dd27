//! Opaque functions and tape checks shared by the unit tests.

use crate::op::OpEnum;
use crate::registry::{DiscreteFunction, OpaqueFunction, Registry};
use crate::tape::Tape;
use anyhow::{bail, Result};

/// Rounds down.
pub(crate) struct Floor;

impl DiscreteFunction<f64> for Floor {
    fn name(&self) -> &str {
        "floor"
    }

    fn eval(&self, x: f64) -> f64 {
        x.floor()
    }
}

/// `f(a, b, c, d) = (a + b, c * d)`: result 0 reads inputs 0-1 only,
/// result 1 reads inputs 2-3 only.
pub(crate) struct SplitSum;

impl OpaqueFunction<f64> for SplitSum {
    fn name(&self) -> &str {
        "split_sum"
    }

    fn forward(&self, _call_id: usize, x: &[f64], y: &mut [f64]) -> Result<()> {
        if x.len() != 4 || y.len() != 2 {
            bail!("split_sum expects 4 inputs and 2 results");
        }
        y[0] = x[0] + x[1];
        y[1] = x[2] * x[3];
        Ok(())
    }

    fn rev_depend(&self, _call_id: usize, depend_y: &[bool], depend_x: &mut [bool]) -> Result<()> {
        if depend_y[0] {
            depend_x[0] = true;
            depend_x[1] = true;
        }
        if depend_y[1] {
            depend_x[2] = true;
            depend_x[3] = true;
        }
        Ok(())
    }
}

/// Elementwise product of the two halves of its input:
/// `y[i] = x[i] * x[n + i]` with `n = y.len()`.
pub(crate) struct ElementwiseMul;

impl OpaqueFunction<f64> for ElementwiseMul {
    fn name(&self) -> &str {
        "elementwise_mul"
    }

    fn forward(&self, _call_id: usize, x: &[f64], y: &mut [f64]) -> Result<()> {
        let n = y.len();
        if x.len() != 2 * n {
            bail!("elementwise_mul expects twice as many inputs as results");
        }
        for i in 0..n {
            y[i] = x[i] * x[n + i];
        }
        Ok(())
    }

    fn rev_depend(&self, _call_id: usize, depend_y: &[bool], depend_x: &mut [bool]) -> Result<()> {
        let n = depend_y.len();
        for i in 0..n {
            if depend_y[i] {
                depend_x[i] = true;
                depend_x[n + i] = true;
            }
        }
        Ok(())
    }
}

/// Always fails to evaluate.
pub(crate) struct Failing;

impl OpaqueFunction<f64> for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn forward(&self, _call_id: usize, _x: &[f64], _y: &mut [f64]) -> Result<()> {
        bail!("no forward mode")
    }

    fn rev_depend(&self, _call_id: usize, _depend_y: &[bool], depend_x: &mut [bool]) -> Result<()> {
        depend_x.fill(true);
        Ok(())
    }
}

/// `f(a, b) = (a, b)` whose dependency answer drops input 1 whenever both
/// results are requested together.
pub(crate) struct UnderReporting;

impl OpaqueFunction<f64> for UnderReporting {
    fn name(&self) -> &str {
        "under_reporting"
    }

    fn forward(&self, _call_id: usize, x: &[f64], y: &mut [f64]) -> Result<()> {
        y.copy_from_slice(x);
        Ok(())
    }

    fn rev_depend(&self, _call_id: usize, depend_y: &[bool], depend_x: &mut [bool]) -> Result<()> {
        if depend_y[0] {
            depend_x[0] = true;
        }
        if depend_y[1] && !depend_y[0] {
            depend_x[1] = true;
        }
        Ok(())
    }
}

/// Checks the structural invariants every tape must satisfy.
pub(crate) fn assert_well_formed(tape: &Tape<f64>) {
    let ops: Vec<_> = tape.op_iter().collect();
    assert_eq!(ops[0].op_enum, OpEnum::Con);
    assert_eq!(ops[0].res_index, tape.zero_index());
    assert_eq!(tape.con_vec()[tape.arg_vec()[ops[0].arg_index]], 0.0);
    let n_res: usize = ops.iter().map(|info| info.n_res).sum();
    assert_eq!(tape.n_val(), tape.n_ind() + n_res);
    for info in &ops {
        let kind = info.kind::<f64>();
        for &i in kind.value_args(info.arg_index, tape.arg_vec()) {
            assert!(
                i < info.res_index,
                "usage {} ({}) reads value {i} at or after its result {}",
                info.i_op,
                info.op_enum.name(),
                info.res_index
            );
        }
    }
    for &dep in tape.dep_vec() {
        assert!(dep < tape.n_val());
    }
}

/// Checks that two tapes produce the same dependents at every point.
pub(crate) fn assert_equivalent(
    before: &Tape<f64>,
    after: &Tape<f64>,
    registry: &Registry<f64>,
    points: &[Vec<f64>],
) {
    for x in points {
        let expected = before.forward(registry, x).expect("original tape");
        let actual = after.forward(registry, x).expect("transformed tape");
        assert_eq!(expected.len(), actual.len());
        for (e, a) in expected.iter().zip(&actual) {
            assert!(
                e == a || (e.is_nan() && a.is_nan()),
                "at {x:?}: expected {expected:?}, got {actual:?}"
            );
        }
    }
}
