use super::{write_usage, CompareOp, EvalContext, OpEnum, OpKind};
use crate::tape::Tape;
use crate::traits::{Addr, Scalar};
use anyhow::Result;
use std::io::{self, Write};

fn compare_op(code: Addr) -> CompareOp {
    debug_assert!(CompareOp::from_code(code).is_some(), "bad comparison code {code}");
    CompareOp::from_code(code).unwrap_or(CompareOp::No)
}

/// `[cmp, left, right]`: counts a failure when `cmp(left, right)` is false.
/// Produces no result.
pub struct CompOp;

impl<V: Scalar> OpKind<V> for CompOp {
    fn op_enum(&self) -> OpEnum {
        OpEnum::Comp
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
        let cmp = compare_op(arg_vec[arg_index]);
        let left = val_vec[arg_vec[arg_index + 1]];
        let right = val_vec[arg_vec[arg_index + 2]];
        if !cmp.holds(left, right) {
            ctx.compare_false += 1;
        }
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
        let arg_vec = tape.arg_vec();
        let name = format!("comp_{}", compare_op(arg_vec[arg_index]).name());
        write_usage::<V>(out, &name, &[], &arg_vec[arg_index + 1..arg_index + 3], res_index, &[])
    }
}

/// `[cmp, left, right, if_true, if_false]`: selects `if_true` when
/// `cmp(left, right)` holds.
pub struct CexpOp;

impl<V: Scalar> OpKind<V> for CexpOp {
    fn op_enum(&self) -> OpEnum {
        OpEnum::Cexp
    }

    fn n_before(&self) -> usize {
        1
    }

    fn fixed_n_arg(&self) -> Option<usize> {
        Some(5)
    }

    fn n_arg(&self, _arg_index: Addr, _arg_vec: &[Addr]) -> usize {
        5
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
        let cmp = compare_op(arg_vec[arg_index]);
        let left = val_vec[arg_vec[arg_index + 1]];
        let right = val_vec[arg_vec[arg_index + 2]];
        let chosen = if cmp.holds(left, right) { 3 } else { 4 };
        val_vec[res_index] = val_vec[arg_vec[arg_index + chosen]];
        Ok(())
    }

    fn print_op(
        &self,
        out: &mut dyn Write,
        tape: &Tape<V>,
        arg_index: Addr,
        res_index: Addr,
        val_vec: &[V],
    ) -> io::Result<()> {
        let arg_vec = tape.arg_vec();
        let name = format!("cexp_{}", compare_op(arg_vec[arg_index]).name());
        write_usage(
            out,
            &name,
            &[],
            &arg_vec[arg_index + 1..arg_index + 5],
            res_index,
            &val_vec[res_index..res_index + 1],
        )
    }
}
