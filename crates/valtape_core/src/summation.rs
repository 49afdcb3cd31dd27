//! Fusing chains of additions into cumulative sums.

use crate::op::{CsumOp, OpEnum};
use crate::record_new::{record_new, Action};
use crate::tape::Tape;
use crate::traits::{Addr, Scalar};
use anyhow::Result;

fn is_additive(op: OpEnum) -> bool {
    matches!(op, OpEnum::Add | OpEnum::Sub | OpEnum::Neg | OpEnum::Csum)
}

/// `(add, sub)` operands of an additive usage.
fn additive_operands(op: OpEnum, arg_index: Addr, arg_vec: &[Addr]) -> (Vec<Addr>, Vec<Addr>) {
    match op {
        OpEnum::Add => (arg_vec[arg_index..arg_index + 2].to_vec(), Vec::new()),
        OpEnum::Sub => (vec![arg_vec[arg_index]], vec![arg_vec[arg_index + 1]]),
        OpEnum::Neg => (Vec::new(), vec![arg_vec[arg_index]]),
        _ => {
            let (add, sub) = CsumOp::operands(arg_index, arg_vec);
            (add.to_vec(), sub.to_vec())
        }
    }
}

impl<V: Scalar> Tape<V> {
    /// Returns a tape in which every `Add`, `Sub`, `Neg` or `Csum` whose
    /// result is read exactly once, by another such usage, is folded into
    /// that reader. Readers that absorbed something become one `Csum`.
    ///
    /// Sums are reassociated, so results may differ in the last bits.
    pub fn summation(&self) -> Result<Tape<V>> {
        let arg_vec = self.arg_vec();
        let mut n_use = vec![0_usize; self.n_val()];
        let mut n_additive_use = vec![0_usize; self.n_val()];
        for info in self.op_iter() {
            let additive = is_additive(info.op_enum);
            for &i in info.kind::<V>().value_args(info.arg_index, arg_vec) {
                n_use[i] += 1;
                if additive {
                    n_additive_use[i] += 1;
                }
            }
        }
        for &i in self.vec_initial().iter().flatten().chain(self.dep_vec()) {
            n_use[i] += 1;
        }

        let mut terms: Vec<Option<(Vec<Addr>, Vec<Addr>)>> = vec![None; self.n_val()];
        let mut actions = Vec::with_capacity(self.n_op());
        let mut n_fused = 0;
        for info in self.op_iter() {
            if !is_additive(info.op_enum) {
                actions.push(Action::Copy);
                continue;
            }
            let (add_operands, sub_operands) = additive_operands(info.op_enum, info.arg_index, arg_vec);
            let mut add = Vec::new();
            let mut sub = Vec::new();
            let mut absorbed = false;
            for i in add_operands {
                match terms[i].take() {
                    Some((inner_add, inner_sub)) => {
                        add.extend(inner_add);
                        sub.extend(inner_sub);
                        absorbed = true;
                    }
                    None => add.push(i),
                }
            }
            for i in sub_operands {
                match terms[i].take() {
                    Some((inner_add, inner_sub)) => {
                        add.extend(inner_sub);
                        sub.extend(inner_add);
                        absorbed = true;
                    }
                    None => sub.push(i),
                }
            }

            let res = info.res_index;
            if n_use[res] == 1 && n_additive_use[res] == 1 {
                terms[res] = Some((add, sub));
                actions.push(Action::Drop);
                n_fused += 1;
            } else if absorbed {
                actions.push(Action::Csum { add, sub });
            } else {
                actions.push(Action::Copy);
            }
        }

        let new = record_new(self, &actions);
        log::debug!(
            "summation: {n_fused} usages fused, usages {} -> {}",
            self.n_op(),
            new.n_op()
        );
        Ok(new)
    }
}

#[cfg(test)]
mod tests {
    use crate::op::{CsumOp, OpEnum};
    use crate::registry::Registry;
    use crate::tape::Tape;
    use crate::test_support::{assert_equivalent, assert_well_formed};

    fn points() -> Vec<Vec<f64>> {
        vec![
            vec![1.0, 2.0, 3.0, 4.0],
            vec![-8.0, 0.5, 0.25, 16.0],
            vec![0.0, 0.0, 0.0, 0.0],
        ]
    }

    #[test]
    fn chain_becomes_one_sum() {
        let mut tape = Tape::<f64>::new(4);
        let a = tape.record_op(OpEnum::Add, &[0, 1]);
        let b = tape.record_op(OpEnum::Sub, &[a, 2]);
        let c = tape.record_op(OpEnum::Neg, &[b]);
        let d = tape.record_op(OpEnum::Add, &[c, 3]);
        tape.set_dep(vec![d]);

        let new = tape.summation().expect("summation");
        assert_well_formed(&new);
        assert_eq!(new.op_enum_vec(), [OpEnum::Con, OpEnum::Csum]);
        let last = new.op_iter().last().expect("csum usage");
        let (add, sub) = CsumOp::operands(last.arg_index, new.arg_vec());
        assert_eq!((add, sub), (&[2, 3][..], &[0, 1][..]));
        assert_equivalent(&tape, &new, &Registry::new(), &points());
    }

    #[test]
    fn shared_and_non_additive_readers_block_fusion() {
        let mut tape = Tape::<f64>::new(4);
        let shared = tape.record_op(OpEnum::Add, &[0, 1]);
        let left = tape.record_op(OpEnum::Sub, &[shared, 2]);
        let right = tape.record_op(OpEnum::Sub, &[shared, 3]);
        let product = tape.record_op(OpEnum::Mul, &[left, right]);
        let inner = tape.record_op(OpEnum::Add, &[2, 3]);
        let scaled = tape.record_op(OpEnum::Mul, &[inner, 0]);
        tape.set_dep(vec![product, scaled]);

        let new = tape.summation().expect("summation");
        assert_eq!(new, tape);
    }

    #[test]
    fn dependent_values_are_not_absorbed() {
        let mut tape = Tape::<f64>::new(4);
        let a = tape.record_op(OpEnum::Add, &[0, 1]);
        let b = tape.record_op(OpEnum::Sub, &[2, 3]);
        let c = tape.record_csum(&[a], &[b]);
        tape.set_dep(vec![c, a]);

        let new = tape.summation().expect("summation");
        assert_eq!(new.n_op(), 3);
        assert_eq!(new.op_enum_vec()[2], OpEnum::Csum);
        assert_equivalent(&tape, &new, &Registry::new(), &points());
    }
}
