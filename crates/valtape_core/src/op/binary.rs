use super::{EvalContext, OpEnum, OpKind};
use crate::traits::{Addr, Scalar};
use anyhow::Result;

/// `[left, right]`: arithmetic on two values.
pub struct BinaryOp(pub OpEnum);

pub(crate) fn apply<V: Scalar>(op: OpEnum, left: V, right: V) -> V {
    match op {
        OpEnum::Add => left + right,
        OpEnum::Sub => left - right,
        OpEnum::Mul => left * right,
        OpEnum::Div => left / right,
        OpEnum::Pow => left.powf(right),
        other => unreachable!("{} is not a binary operator", other.name()),
    }
}

impl<V: Scalar> OpKind<V> for BinaryOp {
    fn op_enum(&self) -> OpEnum {
        self.0
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
        let left = val_vec[arg_vec[arg_index]];
        let right = val_vec[arg_vec[arg_index + 1]];
        val_vec[res_index] = apply(self.0, left, right);
        Ok(())
    }
}
