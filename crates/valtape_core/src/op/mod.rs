//! Operator kinds.
//!
//! Every usage on a tape is one byte-sized tag (`OpEnum`) plus a contiguous
//! slice of the argument vector. The tag selects a shared, stateless
//! `OpKind` object that knows how to read that slice: how many arguments and
//! results the usage has, how to evaluate it and how to print it. The
//! arena, the evaluator and the passes are written once against this trait.
//!
//! An argument slice is laid out as
//! `[header (n_before) | value indices | trailer (n_after)]`.
//! Only the middle part refers to the value vector.

mod binary;
mod call;
mod compare;
mod con;
mod csum;
mod discrete;
mod print;
mod unary;
mod vector;

pub use binary::BinaryOp;
pub use call::{CallHeader, CallOp};
pub use compare::{CexpOp, CompOp};
pub use con::ConOp;
pub use csum::CsumOp;
pub use discrete::DisOp;
pub use print::PriOp;
pub use unary::UnaryOp;
pub use vector::{LoadOp, StoreOp, VecOp};

pub(crate) use print::write_usage;

use crate::registry::{OpaqueFamily, Registry};
use crate::tape::Tape;
use crate::traits::{Addr, Scalar};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Tag identifying the kind of one operator usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpEnum {
    Con,
    Neg,
    Abs,
    Sign,
    Sqrt,
    Exp,
    Expm1,
    Log,
    Log1p,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Dis,
    Comp,
    Cexp,
    Csum,
    Vec,
    Load,
    Store,
    Pri,
    Call,
    Map,
}

impl OpEnum {
    pub const ALL: [OpEnum; 33] = [
        OpEnum::Con,
        OpEnum::Neg,
        OpEnum::Abs,
        OpEnum::Sign,
        OpEnum::Sqrt,
        OpEnum::Exp,
        OpEnum::Expm1,
        OpEnum::Log,
        OpEnum::Log1p,
        OpEnum::Sin,
        OpEnum::Cos,
        OpEnum::Tan,
        OpEnum::Asin,
        OpEnum::Acos,
        OpEnum::Atan,
        OpEnum::Sinh,
        OpEnum::Cosh,
        OpEnum::Tanh,
        OpEnum::Add,
        OpEnum::Sub,
        OpEnum::Mul,
        OpEnum::Div,
        OpEnum::Pow,
        OpEnum::Dis,
        OpEnum::Comp,
        OpEnum::Cexp,
        OpEnum::Csum,
        OpEnum::Vec,
        OpEnum::Load,
        OpEnum::Store,
        OpEnum::Pri,
        OpEnum::Call,
        OpEnum::Map,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OpEnum::Con => "con",
            OpEnum::Neg => "neg",
            OpEnum::Abs => "abs",
            OpEnum::Sign => "sign",
            OpEnum::Sqrt => "sqrt",
            OpEnum::Exp => "exp",
            OpEnum::Expm1 => "expm1",
            OpEnum::Log => "log",
            OpEnum::Log1p => "log1p",
            OpEnum::Sin => "sin",
            OpEnum::Cos => "cos",
            OpEnum::Tan => "tan",
            OpEnum::Asin => "asin",
            OpEnum::Acos => "acos",
            OpEnum::Atan => "atan",
            OpEnum::Sinh => "sinh",
            OpEnum::Cosh => "cosh",
            OpEnum::Tanh => "tanh",
            OpEnum::Add => "add",
            OpEnum::Sub => "sub",
            OpEnum::Mul => "mul",
            OpEnum::Div => "div",
            OpEnum::Pow => "pow",
            OpEnum::Dis => "dis",
            OpEnum::Comp => "comp",
            OpEnum::Cexp => "cexp",
            OpEnum::Csum => "csum",
            OpEnum::Vec => "vec",
            OpEnum::Load => "load",
            OpEnum::Store => "store",
            OpEnum::Pri => "pri",
            OpEnum::Call => "call",
            OpEnum::Map => "map",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn is_unary(self) -> bool {
        matches!(
            self,
            OpEnum::Neg
                | OpEnum::Abs
                | OpEnum::Sign
                | OpEnum::Sqrt
                | OpEnum::Exp
                | OpEnum::Expm1
                | OpEnum::Log
                | OpEnum::Log1p
                | OpEnum::Sin
                | OpEnum::Cos
                | OpEnum::Tan
                | OpEnum::Asin
                | OpEnum::Acos
                | OpEnum::Atan
                | OpEnum::Sinh
                | OpEnum::Cosh
                | OpEnum::Tanh
        )
    }

    pub fn is_binary(self) -> bool {
        matches!(
            self,
            OpEnum::Add | OpEnum::Sub | OpEnum::Mul | OpEnum::Div | OpEnum::Pow
        )
    }

    /// Binary kinds whose operands may be swapped.
    pub fn is_commutative(self) -> bool {
        matches!(self, OpEnum::Add | OpEnum::Mul)
    }

    pub fn opaque_family(self) -> Option<OpaqueFamily> {
        match self {
            OpEnum::Call => Some(OpaqueFamily::Call),
            OpEnum::Map => Some(OpaqueFamily::Map),
            _ => None,
        }
    }
}

/// Comparison stored in the header of `Comp` and `Cexp` usages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    /// Never fails; a disabled comparison.
    No,
}

impl CompareOp {
    pub fn holds<V: Scalar>(self, left: V, right: V) -> bool {
        match self {
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
            CompareOp::Lt => left < right,
            CompareOp::Le => left <= right,
            CompareOp::No => true,
        }
    }

    pub fn code(self) -> Addr {
        match self {
            CompareOp::Eq => 0,
            CompareOp::Ne => 1,
            CompareOp::Lt => 2,
            CompareOp::Le => 3,
            CompareOp::No => 4,
        }
    }

    pub fn from_code(code: Addr) -> Option<Self> {
        match code {
            0 => Some(CompareOp::Eq),
            1 => Some(CompareOp::Ne),
            2 => Some(CompareOp::Lt),
            3 => Some(CompareOp::Le),
            4 => Some(CompareOp::No),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
            CompareOp::No => "no",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            CompareOp::Eq,
            CompareOp::Ne,
            CompareOp::Lt,
            CompareOp::Le,
            CompareOp::No,
        ]
        .into_iter()
        .find(|cmp| cmp.name() == name)
    }
}

/// State shared by the usages of one evaluation.
pub struct EvalContext<'a, V: Scalar> {
    pub tape: &'a Tape<V>,
    pub registry: &'a Registry<V>,
    /// Comparisons whose outcome differs from the one recorded.
    pub compare_false: usize,
    /// Current contents of the dynamic vectors, indexed by `which_vector`.
    pub vectors: Vec<Vec<V>>,
    /// Sink for print usages.
    pub out: &'a mut dyn Write,
}

impl<'a, V: Scalar> EvalContext<'a, V> {
    pub fn new(tape: &'a Tape<V>, registry: &'a Registry<V>, out: &'a mut dyn Write) -> Self {
        Self {
            tape,
            registry,
            compare_false: 0,
            vectors: vec![Vec::new(); tape.vec_initial().len()],
            out,
        }
    }
}

/// The questions every operator kind answers.
pub trait OpKind<V: Scalar> {
    fn op_enum(&self) -> OpEnum;

    /// Leading header slots that are not value indices.
    fn n_before(&self) -> usize {
        0
    }

    /// Trailing slots that are not value indices.
    fn n_after(&self) -> usize {
        0
    }

    /// `Some(n)` when every usage has `n` arguments. Variadic kinds return
    /// `None` and store their argument count in their last slot.
    fn fixed_n_arg(&self) -> Option<usize>;

    fn n_arg(&self, arg_index: Addr, arg_vec: &[Addr]) -> usize;

    fn n_res(&self, arg_index: Addr, arg_vec: &[Addr]) -> usize;

    /// Reads operands from `val_vec` and writes `n_res` results starting at
    /// `res_index`. Never reads `val_vec` at or after `res_index`.
    fn eval(
        &self,
        ctx: &mut EvalContext<'_, V>,
        arg_index: Addr,
        res_index: Addr,
        val_vec: &mut [V],
    ) -> Result<()>;

    /// One trace line describing this usage and its results.
    fn print_op(
        &self,
        out: &mut dyn Write,
        tape: &Tape<V>,
        arg_index: Addr,
        res_index: Addr,
        val_vec: &[V],
    ) -> io::Result<()> {
        let arg_vec = tape.arg_vec();
        let n_arg = self.n_arg(arg_index, arg_vec);
        let n_res = self.n_res(arg_index, arg_vec);
        let value_start = arg_index + self.n_before();
        let value_end = arg_index + n_arg - self.n_after();
        write_usage(
            out,
            self.op_enum().name(),
            &arg_vec[arg_index..value_start],
            &arg_vec[value_start..value_end],
            res_index,
            &val_vec[res_index..res_index + n_res],
        )
    }

    /// Value indices read by the usage at `arg_index`.
    fn value_args<'v>(&self, arg_index: Addr, arg_vec: &'v [Addr]) -> &'v [Addr] {
        let n_arg = self.n_arg(arg_index, arg_vec);
        &arg_vec[arg_index + self.n_before()..arg_index + n_arg - self.n_after()]
    }
}

/// The shared instance for `op`.
pub fn op_kind<V: Scalar>(op: OpEnum) -> &'static dyn OpKind<V> {
    match op {
        OpEnum::Con => &ConOp,
        OpEnum::Neg => &UnaryOp(OpEnum::Neg),
        OpEnum::Abs => &UnaryOp(OpEnum::Abs),
        OpEnum::Sign => &UnaryOp(OpEnum::Sign),
        OpEnum::Sqrt => &UnaryOp(OpEnum::Sqrt),
        OpEnum::Exp => &UnaryOp(OpEnum::Exp),
        OpEnum::Expm1 => &UnaryOp(OpEnum::Expm1),
        OpEnum::Log => &UnaryOp(OpEnum::Log),
        OpEnum::Log1p => &UnaryOp(OpEnum::Log1p),
        OpEnum::Sin => &UnaryOp(OpEnum::Sin),
        OpEnum::Cos => &UnaryOp(OpEnum::Cos),
        OpEnum::Tan => &UnaryOp(OpEnum::Tan),
        OpEnum::Asin => &UnaryOp(OpEnum::Asin),
        OpEnum::Acos => &UnaryOp(OpEnum::Acos),
        OpEnum::Atan => &UnaryOp(OpEnum::Atan),
        OpEnum::Sinh => &UnaryOp(OpEnum::Sinh),
        OpEnum::Cosh => &UnaryOp(OpEnum::Cosh),
        OpEnum::Tanh => &UnaryOp(OpEnum::Tanh),
        OpEnum::Add => &BinaryOp(OpEnum::Add),
        OpEnum::Sub => &BinaryOp(OpEnum::Sub),
        OpEnum::Mul => &BinaryOp(OpEnum::Mul),
        OpEnum::Div => &BinaryOp(OpEnum::Div),
        OpEnum::Pow => &BinaryOp(OpEnum::Pow),
        OpEnum::Dis => &DisOp,
        OpEnum::Comp => &CompOp,
        OpEnum::Cexp => &CexpOp,
        OpEnum::Csum => &CsumOp,
        OpEnum::Vec => &VecOp,
        OpEnum::Load => &LoadOp,
        OpEnum::Store => &StoreOp,
        OpEnum::Pri => &PriOp,
        OpEnum::Call => &CallOp(OpaqueFamily::Call),
        OpEnum::Map => &CallOp(OpaqueFamily::Map),
    }
}

#[cfg(test)]
mod tests {
    use super::{op_kind, CompareOp, OpEnum};

    #[test]
    fn names_round_trip() {
        for op in OpEnum::ALL {
            assert_eq!(OpEnum::from_name(op.name()), Some(op));
        }
        assert_eq!(OpEnum::from_name("fma"), None);
    }

    #[test]
    fn kind_table_matches_tags() {
        for op in OpEnum::ALL {
            assert_eq!(op_kind::<f64>(op).op_enum(), op);
        }
    }

    #[test]
    fn fixed_arity_kinds_report_it() {
        let arg_vec = [0, 1];
        for op in OpEnum::ALL {
            let kind = op_kind::<f64>(op);
            if let Some(n) = kind.fixed_n_arg() {
                assert_eq!(kind.n_arg(0, &arg_vec), n, "{}", op.name());
            } else {
                assert_eq!(kind.n_after(), 1, "{} stores its count last", op.name());
            }
        }
    }

    #[test]
    fn compare_codes_and_semantics() {
        for cmp in [
            CompareOp::Eq,
            CompareOp::Ne,
            CompareOp::Lt,
            CompareOp::Le,
            CompareOp::No,
        ] {
            assert_eq!(CompareOp::from_code(cmp.code()), Some(cmp));
            assert_eq!(CompareOp::from_name(cmp.name()), Some(cmp));
        }
        assert!(CompareOp::Lt.holds(1.0, 2.0));
        assert!(!CompareOp::Lt.holds(2.0, 2.0));
        assert!(CompareOp::Le.holds(2.0, 2.0));
        assert!(CompareOp::Ne.holds(1.0, 2.0));
        assert!(!CompareOp::Eq.holds(f64::NAN, f64::NAN));
        assert!(CompareOp::No.holds(f64::NAN, 0.0));
        assert_eq!(CompareOp::from_code(9), None);
    }
}
