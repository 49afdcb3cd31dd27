//! Reverse liveness sweep over a tape.
//!
//! Starting from the dependent values, one walk from the last usage to the
//! first decides which usages can influence an output. Arguments always
//! precede their usage, so no fixed point is needed. Opaque usages ask their
//! registry entry which inputs matter for the results that are needed.

use crate::error::TapeError;
use crate::op::{CallHeader, CompareOp, OpEnum};
use crate::registry::{OpaqueFamily, Registry};
use crate::tape::Tape;
use crate::traits::Scalar;
use anyhow::Result;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Liveness {
    /// Per value: can it influence a dependent or a kept side effect.
    pub(crate) needed_val: Vec<bool>,
    /// Per usage: must it be re-recorded.
    pub(crate) needed_op: Vec<bool>,
    /// Per opaque usage (indexed by usage): which inputs the needed results
    /// read. `None` for every other kind.
    pub(crate) depend_x: Vec<Option<Vec<bool>>>,
    /// Per dynamic vector: the last needed load, if any.
    pub(crate) last_load: Vec<Option<usize>>,
}

impl Liveness {
    pub(crate) fn n_needed_op(&self) -> usize {
        self.needed_op.iter().filter(|&&needed| needed).count()
    }
}

pub(crate) fn compute_liveness<V: Scalar>(tape: &Tape<V>, registry: &Registry<V>) -> Result<Liveness> {
    let arg_vec = tape.arg_vec();
    let options = tape.options();
    let mut needed_val = vec![false; tape.n_val()];
    let mut needed_op = vec![false; tape.n_op()];
    let mut depend_x = vec![None; tape.n_op()];
    let mut last_load = vec![None; tape.vec_initial().len()];

    for &dep in tape.dep_vec() {
        needed_val[dep] = true;
    }
    // the zero usage is always kept
    needed_val[tape.zero_index()] = true;

    for info in tape.op_iter().rev() {
        let kind = info.kind::<V>();
        let needed = match info.op_enum {
            OpEnum::Con => info.i_op == 0 || needed_val[info.res_index],
            // a `No` comparison never fails
            OpEnum::Comp => options.keep_compare && arg_vec[info.arg_index] != CompareOp::No.code(),
            // a print whose flag is the zero value never prints
            OpEnum::Pri => options.keep_print && arg_vec[info.arg_index + 2] != tape.zero_index(),
            OpEnum::Vec => {
                let which = arg_vec[info.arg_index];
                let needed = last_load[which].is_some();
                if needed {
                    for &i in &tape.vec_initial()[which] {
                        needed_val[i] = true;
                    }
                }
                needed
            }
            OpEnum::Load => {
                let needed = needed_val[info.res_index];
                let which = arg_vec[info.arg_index];
                if needed && last_load[which].is_none() {
                    last_load[which] = Some(info.i_op);
                }
                needed
            }
            OpEnum::Store => last_load[arg_vec[info.arg_index]].is_some(),
            OpEnum::Call | OpEnum::Map => {
                let depend_y = &needed_val[info.results()];
                if depend_y.iter().any(|&needed| needed) {
                    let header = CallHeader::read(info.arg_index, arg_vec);
                    let family = match info.op_enum.opaque_family() {
                        Some(family) => family,
                        None => unreachable!("call usage without a family"),
                    };
                    let mut depend = vec![false; header.n_x()];
                    registry.rev_depend(family, header.function_id, header.call_id, depend_y, &mut depend)?;
                    if options.check_rev_depend {
                        check_rev_depend(registry, family, &header, depend_y, &depend)?;
                    }
                    for (&i, &reads) in header.x(info.arg_index, arg_vec).iter().zip(&depend) {
                        if reads {
                            needed_val[i] = true;
                        }
                    }
                    depend_x[info.i_op] = Some(depend);
                    needed_op[info.i_op] = true;
                }
                continue;
            }
            _ => info.results().any(|i| needed_val[i]),
        };
        if needed {
            needed_op[info.i_op] = true;
            for &i in kind.value_args(info.arg_index, arg_vec) {
                needed_val[i] = true;
            }
        }
    }

    Ok(Liveness {
        needed_val,
        needed_op,
        depend_x,
        last_load,
    })
}

/// Every input a single needed result reads must also be reported by the
/// combined query for all needed results.
///
/// Consistent under-reporting cannot be detected from the answers alone.
fn check_rev_depend<V: Scalar>(
    registry: &Registry<V>,
    family: OpaqueFamily,
    header: &CallHeader,
    depend_y: &[bool],
    combined: &[bool],
) -> Result<()> {
    let mut single_y = vec![false; depend_y.len()];
    let mut single_x = vec![false; combined.len()];
    for result in (0..depend_y.len()).filter(|&j| depend_y[j]) {
        single_y.fill(false);
        single_y[result] = true;
        registry.rev_depend(family, header.function_id, header.call_id, &single_y, &mut single_x)?;
        let missing = single_x
            .iter()
            .zip(combined)
            .any(|(&single, &all)| single && !all);
        if missing {
            return Err(TapeError::RevDependUnderApproximation {
                family,
                id: header.function_id,
                name: registry
                    .name(family, header.function_id)
                    .unwrap_or_default()
                    .to_string(),
                result,
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::compute_liveness;
    use crate::error::TapeError;
    use crate::op::{CompareOp, OpEnum};
    use crate::registry::{OpaqueFunction, Registry};
    use crate::tape::Tape;
    use crate::test_support::{SplitSum, UnderReporting};

    #[test]
    fn unused_chain_is_not_needed() {
        let mut tape = Tape::<f64>::new(2);
        let unused = tape.record_op(OpEnum::Exp, &[0]);
        let used = tape.record_op(OpEnum::Add, &[0, 1]);
        tape.set_dep(vec![used]);
        let liveness = compute_liveness(&tape, &Registry::new()).expect("liveness");
        assert_eq!(liveness.needed_op, vec![true, false, true]);
        assert!(!liveness.needed_val[unused]);
        assert!(liveness.needed_val[0] && liveness.needed_val[1]);
    }

    #[test]
    fn call_inputs_follow_rev_depend() {
        let mut registry = Registry::new();
        let id = registry.register_call(SplitSum);
        let mut tape = Tape::<f64>::new(4);
        let first = tape.record_call(id, 0, 2, &[0, 1, 2, 3]);
        tape.set_dep(vec![first + 1]);
        let liveness = compute_liveness(&tape, &registry).expect("liveness");
        assert_eq!(
            liveness.depend_x[1],
            Some(vec![false, false, true, true])
        );
        assert_eq!(&liveness.needed_val[..4], [false, false, true, true]);
        assert!(liveness.needed_op[1]);
    }

    #[test]
    fn stores_after_the_last_load_are_dead() {
        let mut tape = Tape::<f64>::new(2);
        let which = tape.record_vec(&[0, 1]);
        tape.record_store(which, tape.zero_index(), 1);
        let loaded = tape.record_load(which, tape.zero_index());
        tape.record_store(which, tape.zero_index(), 0);
        tape.set_dep(vec![loaded]);
        let liveness = compute_liveness(&tape, &Registry::new()).expect("liveness");
        assert_eq!(liveness.needed_op, vec![true, true, true, true, false]);
        assert_eq!(liveness.last_load, vec![Some(3)]);
    }

    #[test]
    fn kept_comparisons_make_operands_live() {
        let mut tape = Tape::<f64>::new(2);
        let root = tape.record_op(OpEnum::Sqrt, &[1]);
        tape.record_comp(CompareOp::Lt, 0, root);
        let liveness = compute_liveness(&tape, &Registry::new()).expect("liveness");
        assert!(liveness.needed_val[root]);

        tape.set_option("keep_compare", "false").expect("option");
        let liveness = compute_liveness(&tape, &Registry::new()).expect("liveness");
        assert!(!liveness.needed_val[root]);
        assert_eq!(liveness.n_needed_op(), 1);
    }

    #[test]
    fn under_reporting_rev_depend_is_caught() {
        let mut registry = Registry::new();
        let id = registry.register_call(UnderReporting);
        let mut tape = Tape::<f64>::new(2);
        let first = tape.record_call(id, 0, 2, &[0, 1]);
        tape.set_dep(vec![first, first + 1]);

        tape.set_option("check_rev_depend", "true").expect("option");
        let err = compute_liveness(&tape, &registry).expect_err("under-approximation");
        assert!(matches!(
            err.downcast_ref::<TapeError>(),
            Some(TapeError::RevDependUnderApproximation { result: 1, .. })
        ));

        tape.set_option("check_rev_depend", "false").expect("option");
        let liveness = compute_liveness(&tape, &registry).expect("unchecked");
        assert!(!liveness.needed_val[1]);
    }

    /// `f(a, b) = a + b` that never reports input 1.
    struct IgnoresSecondInput;

    impl OpaqueFunction<f64> for IgnoresSecondInput {
        fn name(&self) -> &str {
            "ignores_second_input"
        }

        fn forward(&self, _call_id: usize, x: &[f64], y: &mut [f64]) -> anyhow::Result<()> {
            y[0] = x[0] + x[1];
            Ok(())
        }

        fn rev_depend(&self, _call_id: usize, depend_y: &[bool], depend_x: &mut [bool]) -> anyhow::Result<()> {
            depend_x[0] = depend_y[0];
            Ok(())
        }
    }

    #[test]
    fn consistent_under_reporting_passes_the_check() {
        let mut registry = Registry::new();
        let id = registry.register_call(IgnoresSecondInput);
        let mut tape = Tape::<f64>::new(2);
        let y = tape.record_call(id, 0, 1, &[0, 1]);
        tape.set_dep(vec![y]);
        tape.set_option("check_rev_depend", "true").expect("option");

        let liveness = compute_liveness(&tape, &registry).expect("answers agree");
        assert!(!liveness.needed_val[1]);
    }
}
