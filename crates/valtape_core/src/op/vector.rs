//! Dynamic vectors: `Vec` starts one from values, `Load` and `Store` index it
//! with a value computed on the tape.
//!
//! The initial value indices of vector `which` live in
//! `Tape::vec_initial()[which]`, not in the argument vector.

use super::{EvalContext, OpEnum, OpKind};
use crate::error::TapeError;
use crate::traits::{Addr, Scalar};
use anyhow::Result;

/// Position addressed by `index` in vector `which`, or `None` when `index`
/// is not finite.
fn position<V: Scalar>(which: usize, index: V, len: usize) -> Result<Option<usize>> {
    if !index.is_finite() {
        return Ok(None);
    }
    match index.to_usize().filter(|&position| position < len) {
        Some(position) => Ok(Some(position)),
        None => Err(TapeError::VectorIndex {
            which,
            index: index.to_f64().unwrap_or(f64::NAN),
            len,
        }
        .into()),
    }
}

/// `[which]`: (re)starts vector `which` from its recorded initial values.
pub struct VecOp;

impl<V: Scalar> OpKind<V> for VecOp {
    fn op_enum(&self) -> OpEnum {
        OpEnum::Vec
    }

    fn n_before(&self) -> usize {
        1
    }

    fn fixed_n_arg(&self) -> Option<usize> {
        Some(1)
    }

    fn n_arg(&self, _arg_index: Addr, _arg_vec: &[Addr]) -> usize {
        1
    }

    fn n_res(&self, _arg_index: Addr, _arg_vec: &[Addr]) -> usize {
        0
    }

    fn eval(
        &self,
        ctx: &mut EvalContext<'_, V>,
        arg_index: Addr,
        _res_index: Addr,
        val_vec: &mut [V],
    ) -> Result<()> {
        let tape = ctx.tape;
        let which = tape.arg_vec()[arg_index];
        ctx.vectors[which] = tape.vec_initial()[which]
            .iter()
            .map(|&i| val_vec[i])
            .collect();
        Ok(())
    }
}

/// `[which, index]`: reads one element. A non-finite index reads NaN.
pub struct LoadOp;

impl<V: Scalar> OpKind<V> for LoadOp {
    fn op_enum(&self) -> OpEnum {
        OpEnum::Load
    }

    fn n_before(&self) -> usize {
        1
    }

    fn fixed_n_arg(&self) -> Option<usize> {
        Some(2)
    }

    fn n_arg(&self, _arg_index: Addr, _arg_vec: &[Addr]) -> usize {
        2
    }

    fn n_res(&self, _arg_index: Addr, _arg_vec: &[Addr]) -> usize {
        1
    }

    fn eval(
        &self,
        ctx: &mut EvalContext<'_, V>,
        arg_index: Addr,
        res_index: Addr,
        val_vec: &mut [V],
    ) -> Result<()> {
        let arg_vec = ctx.tape.arg_vec();
        let which = arg_vec[arg_index];
        let index = val_vec[arg_vec[arg_index + 1]];
        let vector = &ctx.vectors[which];
        val_vec[res_index] = match position(which, index, vector.len())? {
            Some(position) => vector[position],
            None => V::nan(),
        };
        Ok(())
    }
}

/// `[which, index, value]`: writes one element. A non-finite index turns
/// the whole vector into NaN.
pub struct StoreOp;

impl<V: Scalar> OpKind<V> for StoreOp {
    fn op_enum(&self) -> OpEnum {
        OpEnum::Store
    }

    fn n_before(&self) -> usize {
        1
    }

    fn fixed_n_arg(&self) -> Option<usize> {
        Some(3)
    }

    fn n_arg(&self, _arg_index: Addr, _arg_vec: &[Addr]) -> usize {
        3
    }

    fn n_res(&self, _arg_index: Addr, _arg_vec: &[Addr]) -> usize {
        0
    }

    fn eval(
        &self,
        ctx: &mut EvalContext<'_, V>,
        arg_index: Addr,
        _res_index: Addr,
        val_vec: &mut [V],
    ) -> Result<()> {
        let arg_vec = ctx.tape.arg_vec();
        let which = arg_vec[arg_index];
        let index = val_vec[arg_vec[arg_index + 1]];
        let value = val_vec[arg_vec[arg_index + 2]];
        let vector = &mut ctx.vectors[which];
        match position(which, index, vector.len())? {
            Some(position) => vector[position] = value,
            None => vector.fill(V::nan()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::position;
    use crate::error::TapeError;

    #[test]
    fn position_truncates_and_checks_bounds() {
        assert_eq!(position(0, 2.7_f64, 3).expect("in range"), Some(2));
        assert_eq!(position(0, f64::NAN, 3).expect("nan index"), None);
        assert_eq!(position(0, f64::INFINITY, 3).expect("inf index"), None);

        let err = position(1, 3.0_f64, 3).expect_err("past the end");
        assert_eq!(
            err.downcast_ref::<TapeError>(),
            Some(&TapeError::VectorIndex {
                which: 1,
                index: 3.0,
                len: 3
            })
        );
        assert!(position(0, -2.0_f64, 3).is_err());
    }
}
