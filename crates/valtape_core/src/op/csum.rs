use super::{EvalContext, OpEnum, OpKind};
use crate::traits::{Addr, Scalar};
use anyhow::Result;

/// `[n_add, n_sub, add.., sub.., n_arg]`: sum of the `add` values minus the
/// sum of the `sub` values. An empty sum is zero.
pub struct CsumOp;

impl CsumOp {
    /// The `(add, sub)` operand lists of the usage at `arg_index`.
    pub fn operands(arg_index: Addr, arg_vec: &[Addr]) -> (&[Addr], &[Addr]) {
        let n_add = arg_vec[arg_index];
        let n_sub = arg_vec[arg_index + 1];
        let start = arg_index + 2;
        (
            &arg_vec[start..start + n_add],
            &arg_vec[start + n_add..start + n_add + n_sub],
        )
    }
}

impl<V: Scalar> OpKind<V> for CsumOp {
    fn op_enum(&self) -> OpEnum {
        OpEnum::Csum
    }

    fn n_before(&self) -> usize {
        2
    }

    fn n_after(&self) -> usize {
        1
    }

    fn fixed_n_arg(&self) -> Option<usize> {
        None
    }

    fn n_arg(&self, arg_index: Addr, arg_vec: &[Addr]) -> usize {
        3 + arg_vec[arg_index] + arg_vec[arg_index + 1]
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
        let (add, sub) = CsumOp::operands(arg_index, ctx.tape.arg_vec());
        let mut sum = V::zero();
        for &i in add {
            sum = sum + val_vec[i];
        }
        for &i in sub {
            sum = sum - val_vec[i];
        }
        val_vec[res_index] = sum;
        Ok(())
    }
}
