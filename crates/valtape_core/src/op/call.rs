use super::{write_usage, EvalContext, OpEnum, OpKind};
use crate::registry::OpaqueFamily;
use crate::tape::Tape;
use crate::traits::{Addr, Scalar};
use anyhow::Result;
use std::io::{self, Write};

/// Decoded header of a `Call` or `Map` usage, laid out as
/// `[n_arg, n_res, function_id, call_id, x.., n_arg]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallHeader {
    pub n_arg: usize,
    pub n_res: usize,
    pub function_id: usize,
    pub call_id: usize,
}

impl CallHeader {
    pub const N_BEFORE: usize = 4;
    pub const N_AFTER: usize = 1;

    pub fn read(arg_index: Addr, arg_vec: &[Addr]) -> Self {
        Self {
            n_arg: arg_vec[arg_index],
            n_res: arg_vec[arg_index + 1],
            function_id: arg_vec[arg_index + 2],
            call_id: arg_vec[arg_index + 3],
        }
    }

    pub fn n_x(&self) -> usize {
        self.n_arg - Self::N_BEFORE - Self::N_AFTER
    }

    /// Value indices of the function inputs.
    pub fn x<'v>(&self, arg_index: Addr, arg_vec: &'v [Addr]) -> &'v [Addr] {
        let start = arg_index + Self::N_BEFORE;
        &arg_vec[start..start + self.n_x()]
    }
}

/// Usage of a registered opaque function.
pub struct CallOp(pub OpaqueFamily);

impl<V: Scalar> OpKind<V> for CallOp {
    fn op_enum(&self) -> OpEnum {
        self.0.op_enum()
    }

    fn n_before(&self) -> usize {
        CallHeader::N_BEFORE
    }

    fn n_after(&self) -> usize {
        CallHeader::N_AFTER
    }

    fn fixed_n_arg(&self) -> Option<usize> {
        None
    }

    fn n_arg(&self, arg_index: Addr, arg_vec: &[Addr]) -> usize {
        arg_vec[arg_index]
    }

    fn n_res(&self, arg_index: Addr, arg_vec: &[Addr]) -> usize {
        arg_vec[arg_index + 1]
    }

    fn eval(
        &self,
        ctx: &mut EvalContext<'_, V>,
        arg_index: Addr,
        res_index: Addr,
        val_vec: &mut [V],
    ) -> Result<()> {
        let arg_vec = ctx.tape.arg_vec();
        let header = CallHeader::read(arg_index, arg_vec);
        let x: Vec<V> = header
            .x(arg_index, arg_vec)
            .iter()
            .map(|&i| val_vec[i])
            .collect();
        let y = &mut val_vec[res_index..res_index + header.n_res];
        y.fill(V::nan());
        ctx.registry
            .forward(self.0, header.function_id, header.call_id, &x, y)
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
        let header = CallHeader::read(arg_index, arg_vec);
        write_usage(
            out,
            &format!("{}_{}", self.0, header.function_id),
            &[header.call_id],
            header.x(arg_index, arg_vec),
            res_index,
            &val_vec[res_index..res_index + header.n_res],
        )
    }
}
