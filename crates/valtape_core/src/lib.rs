//! The `valtape_core` crate records numeric programs as flat value-graph tapes,
//! replays them, and rewrites them into smaller equivalent tapes.
//!
//! Key components:
//! - **Tape**: an arena of parallel integer arrays. Every operator usage is a
//!   one-byte tag plus a slice of the argument vector, so a tape is plain,
//!   relocatable data.
//! - **Operator kinds**: one stateless `OpKind` object per tag answers how
//!   many arguments and results a usage has, how to evaluate it and how to
//!   print it.
//! - **Registry**: user functions with their own forward evaluation and
//!   dependency answer, plus piecewise-constant discrete functions, referred
//!   to from tapes by id.
//! - **Passes**: dead code elimination, renumbering, constant folding and
//!   summation. Each one returns a new tape and leaves its input untouched.
pub mod error;
pub mod op;
pub mod options;
pub mod registry;
pub mod tape;
pub mod traits;

mod dead_code;
mod fold_con;
mod liveness;
mod optimize;
mod record_new;
mod renumber;
mod summation;

#[cfg(test)]
mod test_support;

pub use error::TapeError;
pub use op::{CompareOp, OpEnum};
pub use options::OptimizeOptions;
pub use registry::{DiscreteFunction, OpaqueFamily, OpaqueFunction, Registry};
pub use tape::{OpInfo, Tape, TapeStats};
pub use traits::{Addr, Scalar};
