use super::{EvalContext, OpEnum, OpKind};
use crate::tape::Tape;
use crate::traits::{Addr, Scalar};
use anyhow::Result;
use std::io::{self, Write};

/// `[con_index]`: copies one entry of the constant vector.
pub struct ConOp;

impl<V: Scalar> OpKind<V> for ConOp {
    fn op_enum(&self) -> OpEnum {
        OpEnum::Con
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
        1
    }

    fn eval(
        &self,
        ctx: &mut EvalContext<'_, V>,
        arg_index: Addr,
        res_index: Addr,
        val_vec: &mut [V],
    ) -> Result<()> {
        let tape = ctx.tape;
        val_vec[res_index] = tape.con_vec()[tape.arg_vec()[arg_index]];
        Ok(())
    }

    fn print_op(
        &self,
        out: &mut dyn Write,
        tape: &Tape<V>,
        arg_index: Addr,
        res_index: Addr,
        _val_vec: &[V],
    ) -> io::Result<()> {
        let value = tape.con_vec()[tape.arg_vec()[arg_index]];
        writeln!(out, "{res_index:>5}  {:<8}{value}", "con")
    }
}
