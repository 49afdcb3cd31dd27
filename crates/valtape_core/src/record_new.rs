//! Rebuilding a tape usage by usage.
//!
//! Every transforming pass decides one `Action` per usage of the old tape and
//! hands the list to `record_new`, which records a fresh tape and carries an
//! old-index to new-index table along. Arguments are always translated
//! through that table, so the new tape is topologically ordered as long as
//! each action only refers to values that precede the usage.

use crate::op::{CallHeader, OpEnum};
use crate::registry::OpaqueFamily;
use crate::tape::{OpInfo, Tape};
use crate::traits::{Addr, Scalar};

const UNMAPPED: Addr = Addr::MAX;

/// What to record for one usage of the old tape.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Action<V> {
    /// Record nothing; the results must not be read by anything kept.
    Drop,
    /// Re-record with translated arguments.
    Copy,
    /// Opaque usage whose inputs with a false flag are rebound to the zero
    /// value.
    Rebind(Vec<bool>),
    /// Record one constant per result instead.
    Constant(Vec<V>),
    /// Re-record, then replace the results that have a value by constants.
    FoldResults(Vec<Option<V>>),
    /// The result equals an earlier value of the old tape.
    Alias(Addr),
    /// Record a cumulative sum over earlier values of the old tape.
    Csum { add: Vec<Addr>, sub: Vec<Addr> },
}

fn lookup(new_index: &[Addr], old: Addr) -> Addr {
    let index = new_index[old];
    debug_assert_ne!(index, UNMAPPED, "value {old} was dropped but is still read");
    index
}

/// Records `old` again, applying `actions[i_op]` to usage `i_op`.
///
/// Usage 0 is the zero constant of every tape and is always kept.
pub(crate) fn record_new<V: Scalar>(old: &Tape<V>, actions: &[Action<V>]) -> Tape<V> {
    debug_assert_eq!(actions.len(), old.n_op());
    let mut new = Tape::with_options(old.n_ind(), *old.options());
    let mut new_index = vec![UNMAPPED; old.n_val()];
    for (i, slot) in new_index.iter_mut().take(old.n_ind()).enumerate() {
        *slot = i;
    }
    let mut new_which = vec![UNMAPPED; old.vec_initial().len()];

    for info in old.op_iter() {
        if info.i_op == 0 {
            new_index[info.res_index] = new.zero_index();
            continue;
        }
        match &actions[info.i_op] {
            Action::Drop => {}
            Action::Alias(target) => {
                new_index[info.res_index] = lookup(&new_index, *target);
            }
            Action::Constant(values) => {
                debug_assert_eq!(values.len(), info.n_res);
                for (k, &value) in values.iter().enumerate() {
                    new_index[info.res_index + k] = new.record_con(value);
                }
            }
            Action::Csum { add, sub } => {
                let add: Vec<Addr> = add.iter().map(|&i| lookup(&new_index, i)).collect();
                let sub: Vec<Addr> = sub.iter().map(|&i| lookup(&new_index, i)).collect();
                new_index[info.res_index] = new.record_csum(&add, &sub);
            }
            Action::Copy => {
                let first = copy_usage(old, &info, &mut new, &new_index, &mut new_which, None);
                for k in 0..info.n_res {
                    new_index[info.res_index + k] = first + k;
                }
            }
            Action::FoldResults(values) => {
                debug_assert_eq!(values.len(), info.n_res);
                let first = copy_usage(old, &info, &mut new, &new_index, &mut new_which, None);
                for (k, value) in values.iter().enumerate() {
                    new_index[info.res_index + k] = match value {
                        Some(value) => new.record_con(*value),
                        None => first + k,
                    };
                }
            }
            Action::Rebind(needed) => {
                let first = copy_usage(old, &info, &mut new, &new_index, &mut new_which, Some(needed.as_slice()));
                for k in 0..info.n_res {
                    new_index[info.res_index + k] = first + k;
                }
            }
        }
    }

    let dep_vec = old
        .dep_vec()
        .iter()
        .map(|&i| lookup(&new_index, i))
        .collect();
    new.set_dep(dep_vec);
    new
}

fn copy_usage<V: Scalar>(
    old: &Tape<V>,
    info: &OpInfo,
    new: &mut Tape<V>,
    new_index: &[Addr],
    new_which: &mut [usize],
    needed: Option<&[bool]>,
) -> Addr {
    let args = info.args(old.arg_vec());
    let map = |i: Addr| lookup(new_index, i);
    match info.op_enum {
        OpEnum::Con => new.record_con(old.con_vec()[args[0]]),
        OpEnum::Pri => {
            let str_vec = old.str_vec();
            new.record_pri(&str_vec[args[0]], &str_vec[args[1]], map(args[2]), map(args[3]));
            new.n_val()
        }
        OpEnum::Vec => {
            let initial: Vec<Addr> = old.vec_initial()[args[0]].iter().map(|&i| map(i)).collect();
            new_which[args[0]] = new.record_vec(&initial);
            new.n_val()
        }
        OpEnum::Load => new.record_load(new_which[args[0]], map(args[1])),
        OpEnum::Store => {
            new.record_store(new_which[args[0]], map(args[1]), map(args[2]));
            new.n_val()
        }
        OpEnum::Call => copy_opaque(OpaqueFamily::Call, old, info, new, new_index, needed),
        OpEnum::Map => copy_opaque(OpaqueFamily::Map, old, info, new, new_index, needed),
        op => {
            let kind = info.kind::<V>();
            let mut new_args = args.to_vec();
            for slot in &mut new_args[kind.n_before()..info.n_arg - kind.n_after()] {
                *slot = map(*slot);
            }
            new.push_usage(op, &new_args)
        }
    }
}

fn copy_opaque<V: Scalar>(
    family: OpaqueFamily,
    old: &Tape<V>,
    info: &OpInfo,
    new: &mut Tape<V>,
    new_index: &[Addr],
    needed: Option<&[bool]>,
) -> Addr {
    let header = CallHeader::read(info.arg_index, old.arg_vec());
    let zero = new.zero_index();
    let x: Vec<Addr> = header
        .x(info.arg_index, old.arg_vec())
        .iter()
        .enumerate()
        .map(|(k, &i)| match needed {
            Some(needed) if !needed[k] => zero,
            _ => lookup(new_index, i),
        })
        .collect();
    new.record_opaque(family, header.function_id, header.call_id, header.n_res, &x)
}
