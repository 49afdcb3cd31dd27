//! Merging structurally identical usages.
//!
//! Two usages are identical when they have the same kind, the same header
//! and read the same (already merged) values. Every usage stays on the tape;
//! readers of a duplicate are redirected to the first copy, which leaves the
//! duplicate for dead code elimination to remove.

use crate::op::OpEnum;
use crate::tape::Tape;
use crate::traits::{constant_bits, Addr, Scalar};
use anyhow::Result;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct UsageKey {
    op_enum: OpEnum,
    header: Vec<Addr>,
    values: Vec<Addr>,
    con_bits: u64,
}

impl<V: Scalar> Tape<V> {
    /// Returns a tape whose arguments point at the first of every group of
    /// identical usages.
    ///
    /// The two operands of `Add` and `Mul` are compared as unordered. Every
    /// other operand list, `Csum` included, must match in recorded order:
    /// reordering three or more addends can change the rounded sum.
    /// Constants are compared by bit pattern, so a recorded `0.0` merges into
    /// the reserved zero. Loads and usages without results are never merged.
    pub fn renumber(&self) -> Result<Tape<V>> {
        let arg_vec = self.arg_vec();
        let mut equal: Vec<Addr> = (0..self.n_val()).collect();
        let mut first_usage: HashMap<UsageKey, Addr> = HashMap::new();
        let mut n_merged = 0;

        for info in self.op_iter() {
            if info.n_res == 0 || info.op_enum == OpEnum::Load {
                continue;
            }
            let kind = info.kind::<V>();
            let args = info.args(arg_vec);
            let mut values: Vec<Addr> = kind
                .value_args(info.arg_index, arg_vec)
                .iter()
                .map(|&i| equal[i])
                .collect();
            let key = match info.op_enum {
                OpEnum::Con => UsageKey {
                    op_enum: OpEnum::Con,
                    header: Vec::new(),
                    values,
                    con_bits: constant_bits(self.con_vec()[args[0]]),
                },
                op => {
                    if op.is_commutative() {
                        values.sort_unstable();
                    }
                    UsageKey {
                        op_enum: op,
                        header: args[..kind.n_before()].to_vec(),
                        values,
                        con_bits: 0,
                    }
                }
            };
            match first_usage.entry(key) {
                Entry::Occupied(entry) => {
                    let first = *entry.get();
                    for k in 0..info.n_res {
                        equal[info.res_index + k] = first + k;
                    }
                    n_merged += 1;
                }
                Entry::Vacant(entry) => {
                    entry.insert(info.res_index);
                }
            }
        }

        let mut new = self.clone();
        new.redirect_args(|i| equal[i]);
        log::debug!("renumber: {n_merged} of {} usages are duplicates", self.n_op());
        Ok(new)
    }
}
