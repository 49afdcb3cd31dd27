use super::{EvalContext, OpEnum, OpKind};
use crate::traits::{Addr, Scalar};
use anyhow::Result;
use std::fmt::Display;
use std::io::{self, Write};

fn join<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Writes one trace line: result index, kind name, header, value arguments
/// and the computed results.
pub(crate) fn write_usage<V: Scalar>(
    out: &mut dyn Write,
    name: &str,
    header: &[Addr],
    args: &[Addr],
    res_index: Addr,
    results: &[V],
) -> io::Result<()> {
    if results.is_empty() {
        write!(out, "{:>5}  ", "-")?;
    } else {
        write!(out, "{res_index:>5}  ")?;
    }
    write!(out, "{name:<8}")?;
    if !header.is_empty() {
        write!(out, "[{}] ", join(header))?;
    }
    write!(out, "{}", join(args))?;
    if !results.is_empty() {
        write!(out, " = {}", join(results))?;
    }
    writeln!(out)
}

/// `[before, after, flag, value]`: when `flag > 0` writes
/// `str_vec[before]`, the value and `str_vec[after]` to the context sink.
pub struct PriOp;

impl<V: Scalar> OpKind<V> for PriOp {
    fn op_enum(&self) -> OpEnum {
        OpEnum::Pri
    }

    fn n_before(&self) -> usize {
        2
    }

    fn fixed_n_arg(&self) -> Option<usize> {
        Some(4)
    }

    fn n_arg(&self, _arg_index: Addr, _arg_vec: &[Addr]) -> usize {
        4
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
        let arg_vec = tape.arg_vec();
        let flag = val_vec[arg_vec[arg_index + 2]];
        if flag > V::zero() {
            let before = &tape.str_vec()[arg_vec[arg_index]];
            let after = &tape.str_vec()[arg_vec[arg_index + 1]];
            let value = val_vec[arg_vec[arg_index + 3]];
            write!(ctx.out, "{before}{value}{after}")?;
        }
        Ok(())
    }
}
