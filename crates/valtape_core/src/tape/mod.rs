//! The tape: one arena of parallel arrays describing a straight-line program.
//!
//! Values `0..n_ind` are the independents. Value `n_ind` is the result of a
//! constant zero that every tape records first; passes point arguments they
//! no longer need at it. Every later usage appends its results after that,
//! so a usage only ever reads values with smaller indices.

mod record;

use crate::error::TapeError;
use crate::op::{op_kind, EvalContext, OpEnum, OpKind};
use crate::options::OptimizeOptions;
use crate::registry::Registry;
use crate::traits::{Addr, Scalar};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tape<V: Scalar> {
    n_ind: usize,
    n_val: usize,
    arg_vec: Vec<Addr>,
    con_vec: Vec<V>,
    str_vec: Vec<String>,
    dep_vec: Vec<Addr>,
    dep_set: bool,
    op_enum_vec: Vec<OpEnum>,
    vec_initial: Vec<Vec<Addr>>,
    options: OptimizeOptions,
}

/// Size summary of a tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapeStats {
    pub n_ind: usize,
    pub n_val: usize,
    pub n_op: usize,
    pub n_arg: usize,
    pub n_con: usize,
    pub n_str: usize,
    pub n_vec: usize,
    pub n_dep: usize,
}

/// Location of one usage inside the tape arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpInfo {
    pub i_op: usize,
    pub op_enum: OpEnum,
    pub arg_index: Addr,
    pub res_index: Addr,
    pub n_arg: usize,
    pub n_res: usize,
}

impl OpInfo {
    pub fn kind<V: Scalar>(&self) -> &'static dyn OpKind<V> {
        op_kind(self.op_enum)
    }

    /// The full argument slice of this usage, header included.
    pub fn args<'v>(&self, arg_vec: &'v [Addr]) -> &'v [Addr] {
        &arg_vec[self.arg_index..self.arg_index + self.n_arg]
    }

    pub fn results(&self) -> std::ops::Range<Addr> {
        self.res_index..self.res_index + self.n_res
    }
}

/// Walks the usages in either direction, recovering argument and result
/// offsets from the kinds alone.
pub struct OpIter<'t, V: Scalar> {
    tape: &'t Tape<V>,
    front_op: usize,
    front_arg: Addr,
    front_res: Addr,
    back_op: usize,
    back_arg: Addr,
    back_res: Addr,
}

impl<'t, V: Scalar> Iterator for OpIter<'t, V> {
    type Item = OpInfo;

    fn next(&mut self) -> Option<OpInfo> {
        if self.front_op == self.back_op {
            return None;
        }
        let op_enum = self.tape.op_enum_vec[self.front_op];
        let kind = op_kind::<V>(op_enum);
        let arg_vec = &self.tape.arg_vec;
        let info = OpInfo {
            i_op: self.front_op,
            op_enum,
            arg_index: self.front_arg,
            res_index: self.front_res,
            n_arg: kind.n_arg(self.front_arg, arg_vec),
            n_res: kind.n_res(self.front_arg, arg_vec),
        };
        self.front_op += 1;
        self.front_arg += info.n_arg;
        self.front_res += info.n_res;
        Some(info)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back_op - self.front_op;
        (remaining, Some(remaining))
    }
}

impl<'t, V: Scalar> DoubleEndedIterator for OpIter<'t, V> {
    fn next_back(&mut self) -> Option<OpInfo> {
        if self.front_op == self.back_op {
            return None;
        }
        let i_op = self.back_op - 1;
        let op_enum = self.tape.op_enum_vec[i_op];
        let kind = op_kind::<V>(op_enum);
        let arg_vec = &self.tape.arg_vec;
        let n_arg = match kind.fixed_n_arg() {
            Some(n_arg) => n_arg,
            None => arg_vec[self.back_arg - 1],
        };
        let arg_index = self.back_arg - n_arg;
        let n_res = kind.n_res(arg_index, arg_vec);
        let info = OpInfo {
            i_op,
            op_enum,
            arg_index,
            res_index: self.back_res - n_res,
            n_arg,
            n_res,
        };
        self.back_op = i_op;
        self.back_arg = arg_index;
        self.back_res = info.res_index;
        Some(info)
    }
}

impl<'t, V: Scalar> ExactSizeIterator for OpIter<'t, V> {}

impl<V: Scalar> Tape<V> {
    pub fn n_ind(&self) -> usize {
        self.n_ind
    }

    pub fn n_val(&self) -> usize {
        self.n_val
    }

    pub fn n_op(&self) -> usize {
        self.op_enum_vec.len()
    }

    /// Index of the value that is always zero.
    pub fn zero_index(&self) -> Addr {
        self.n_ind
    }

    pub fn arg_vec(&self) -> &[Addr] {
        &self.arg_vec
    }

    pub fn con_vec(&self) -> &[V] {
        &self.con_vec
    }

    pub fn str_vec(&self) -> &[String] {
        &self.str_vec
    }

    pub fn dep_vec(&self) -> &[Addr] {
        &self.dep_vec
    }

    /// Whether `set_dep` has been called, even with no dependents.
    pub fn dep_is_set(&self) -> bool {
        self.dep_set
    }

    pub fn op_enum_vec(&self) -> &[OpEnum] {
        &self.op_enum_vec
    }

    pub fn vec_initial(&self) -> &[Vec<Addr>] {
        &self.vec_initial
    }

    pub fn options(&self) -> &OptimizeOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut OptimizeOptions {
        &mut self.options
    }

    pub fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
        self.options.set(name, value)
    }

    /// Rewrites every value argument, vector initial value and dependent
    /// through `map`. Header and trailer slots are left alone.
    pub(crate) fn redirect_args(&mut self, mut map: impl FnMut(Addr) -> Addr) {
        let infos: Vec<OpInfo> = self.op_iter().collect();
        for info in infos {
            let kind = info.kind::<V>();
            let start = info.arg_index + kind.n_before();
            let end = info.arg_index + info.n_arg - kind.n_after();
            for slot in &mut self.arg_vec[start..end] {
                *slot = map(*slot);
            }
        }
        for slot in self.vec_initial.iter_mut().flatten() {
            *slot = map(*slot);
        }
        for slot in &mut self.dep_vec {
            *slot = map(*slot);
        }
    }

    pub fn swap(&mut self, other: &mut Tape<V>) {
        std::mem::swap(self, other);
    }

    pub fn op_iter(&self) -> OpIter<'_, V> {
        OpIter {
            tape: self,
            front_op: 0,
            front_arg: 0,
            front_res: self.n_ind,
            back_op: self.op_enum_vec.len(),
            back_arg: self.arg_vec.len(),
            back_res: self.n_val,
        }
    }

    pub fn stats(&self) -> TapeStats {
        TapeStats {
            n_ind: self.n_ind,
            n_val: self.n_val,
            n_op: self.n_op(),
            n_arg: self.arg_vec.len(),
            n_con: self.con_vec.len(),
            n_str: self.str_vec.len(),
            n_vec: self.vec_initial.len(),
            n_dep: self.dep_vec.len(),
        }
    }

    /// Evaluates every usage in order. `val_vec` has length `n_val` and its
    /// first `n_ind` entries hold the independents. Returns the number of
    /// comparisons that did not hold.
    ///
    /// With `trace` set, one line per usage goes to standard output, as do
    /// print usages regardless of `trace`.
    pub fn eval(&self, registry: &Registry<V>, trace: bool, val_vec: &mut [V]) -> Result<usize> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.eval_to(registry, trace, val_vec, &mut lock)
    }

    /// `eval`, writing trace and print output to `out`.
    pub fn eval_to(
        &self,
        registry: &Registry<V>,
        trace: bool,
        val_vec: &mut [V],
        out: &mut dyn Write,
    ) -> Result<usize> {
        if val_vec.len() != self.n_val {
            return Err(TapeError::ValueLength {
                expected: self.n_val,
                actual: val_vec.len(),
            }
            .into());
        }
        let mut ctx = EvalContext::new(self, registry, out);
        if trace {
            writeln!(ctx.out, "independent vector")?;
            for (i, value) in val_vec[..self.n_ind].iter().enumerate() {
                writeln!(ctx.out, "{i:>5}  {value}")?;
            }
        }
        for info in self.op_iter() {
            let kind = info.kind::<V>();
            kind.eval(&mut ctx, info.arg_index, info.res_index, val_vec)?;
            if trace {
                kind.print_op(&mut *ctx.out, self, info.arg_index, info.res_index, val_vec)?;
            }
        }
        if trace {
            writeln!(ctx.out, "dependent vector")?;
            for (k, &index) in self.dep_vec.iter().enumerate() {
                writeln!(ctx.out, "{k:>5}  v{index} = {}", val_vec[index])?;
            }
        }
        Ok(ctx.compare_false)
    }

    /// Evaluates at `x` and returns the dependent values.
    pub fn forward(&self, registry: &Registry<V>, x: &[V]) -> Result<Vec<V>> {
        if x.len() != self.n_ind {
            return Err(TapeError::ValueLength {
                expected: self.n_ind,
                actual: x.len(),
            }
            .into());
        }
        let mut val_vec = vec![V::nan(); self.n_val];
        val_vec[..self.n_ind].copy_from_slice(x);
        self.eval(registry, false, &mut val_vec)?;
        Ok(self.dep_vec.iter().map(|&i| val_vec[i]).collect())
    }
}
