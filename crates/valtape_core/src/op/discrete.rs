use super::{EvalContext, OpEnum, OpKind};
use crate::traits::{Addr, Scalar};
use anyhow::Result;

/// `[discrete_id, x]`: piecewise-constant function of one value, looked up
/// in the registry's discrete table.
pub struct DisOp;

impl<V: Scalar> OpKind<V> for DisOp {
    fn op_enum(&self) -> OpEnum {
        OpEnum::Dis
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
        let function = ctx.registry.discrete(arg_vec[arg_index])?;
        val_vec[res_index] = function.eval(val_vec[arg_vec[arg_index + 1]]);
        Ok(())
    }
}
