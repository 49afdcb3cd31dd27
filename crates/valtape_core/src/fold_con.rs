//! Constant folding.
//!
//! A forward walk tracks which values depend on constants only. Such a
//! usage is evaluated once, with every non-constant value set to NaN, and
//! re-recorded as constants. Opaque usages report which of their results
//! are constant through `for_type`.

use crate::op::{CallHeader, CompareOp, EvalContext, OpEnum};
use crate::record_new::{record_new, Action};
use crate::registry::Registry;
use crate::tape::Tape;
use crate::traits::Scalar;
use anyhow::Result;
use std::io;

impl<V: Scalar> Tape<V> {
    /// Returns a tape in which every value computed from constants alone is
    /// itself a constant usage.
    ///
    /// A conditional select whose comparison operands are constant becomes
    /// its chosen branch. A comparison between constants that holds is
    /// dropped. The replaced usages stay on the tape until dead code
    /// elimination removes them.
    pub fn fold_con(&self, registry: &Registry<V>) -> Result<Tape<V>> {
        let arg_vec = self.arg_vec();
        let mut is_con = vec![false; self.n_val()];
        let mut val_vec = vec![V::nan(); self.n_val()];
        let mut sink = io::sink();
        let mut ctx = EvalContext::new(self, registry, &mut sink);
        let mut actions = Vec::with_capacity(self.n_op());
        let mut n_folded = 0;

        for info in self.op_iter() {
            let kind = info.kind::<V>();
            let args = info.args(arg_vec);
            let all_constant = kind
                .value_args(info.arg_index, arg_vec)
                .iter()
                .all(|&i| is_con[i]);
            let action = match info.op_enum {
                OpEnum::Con => {
                    kind.eval(&mut ctx, info.arg_index, info.res_index, &mut val_vec)?;
                    is_con[info.res_index] = true;
                    Action::Copy
                }
                OpEnum::Comp => {
                    let cmp = CompareOp::from_code(args[0]).unwrap_or(CompareOp::No);
                    if all_constant && cmp.holds(val_vec[args[1]], val_vec[args[2]]) {
                        Action::Drop
                    } else {
                        Action::Copy
                    }
                }
                OpEnum::Cexp if is_con[args[1]] && is_con[args[2]] => {
                    let cmp = CompareOp::from_code(args[0]).unwrap_or(CompareOp::No);
                    let branch = if cmp.holds(val_vec[args[1]], val_vec[args[2]]) {
                        args[3]
                    } else {
                        args[4]
                    };
                    is_con[info.res_index] = is_con[branch];
                    val_vec[info.res_index] = val_vec[branch];
                    Action::Alias(branch)
                }
                OpEnum::Pri | OpEnum::Vec | OpEnum::Load | OpEnum::Store => Action::Copy,
                OpEnum::Call | OpEnum::Map => {
                    let header = CallHeader::read(info.arg_index, arg_vec);
                    let constant_x: Vec<bool> = header
                        .x(info.arg_index, arg_vec)
                        .iter()
                        .map(|&i| is_con[i])
                        .collect();
                    let mut constant_y = vec![false; header.n_res];
                    if let Some(family) = info.op_enum.opaque_family() {
                        registry.for_type(family, header.function_id, header.call_id, &constant_x, &mut constant_y)?;
                    }
                    if constant_y.iter().any(|&constant| constant) {
                        kind.eval(&mut ctx, info.arg_index, info.res_index, &mut val_vec)?;
                        let mut values = Vec::with_capacity(header.n_res);
                        for (k, &constant) in constant_y.iter().enumerate() {
                            let i = info.res_index + k;
                            is_con[i] = constant;
                            if !constant {
                                val_vec[i] = V::nan();
                            }
                            values.push(constant.then_some(val_vec[i]));
                        }
                        if constant_y.iter().all(|&constant| constant) {
                            Action::Constant(values.into_iter().flatten().collect())
                        } else {
                            Action::FoldResults(values)
                        }
                    } else {
                        Action::Copy
                    }
                }
                _ if all_constant => {
                    kind.eval(&mut ctx, info.arg_index, info.res_index, &mut val_vec)?;
                    for i in info.results() {
                        is_con[i] = true;
                    }
                    Action::Constant(info.results().map(|i| val_vec[i]).collect())
                }
                _ => Action::Copy,
            };
            if !matches!(action, Action::Copy) && info.op_enum != OpEnum::Con {
                n_folded += 1;
            }
            actions.push(action);
        }

        let new = record_new(self, &actions);
        log::debug!(
            "fold_con: {n_folded} of {} usages folded, constants {} -> {}",
            self.n_op(),
            self.con_vec().len(),
            new.con_vec().len()
        );
        Ok(new)
    }
}

#[cfg(test)]
mod tests {
    use crate::op::{CompareOp, OpEnum};
    use crate::registry::Registry;
    use crate::tape::Tape;
    use crate::test_support::{assert_equivalent, assert_well_formed, Floor, SplitSum};

    fn points() -> Vec<Vec<f64>> {
        vec![vec![1.0, 2.0], vec![-3.5, 0.25], vec![10.0, -10.0]]
    }

    #[test]
    fn constant_subexpressions_become_constants() {
        let mut tape = Tape::<f64>::new(2);
        let two = tape.record_con(2.0);
        let three = tape.record_con(3.0);
        let six = tape.record_op(OpEnum::Mul, &[two, three]);
        let root = tape.record_op(OpEnum::Sqrt, &[six]);
        let y = tape.record_op(OpEnum::Add, &[0, root]);
        tape.set_dep(vec![y]);
        let registry = Registry::new();

        let folded = tape.fold_con(&registry).expect("fold_con");
        assert_well_formed(&folded);
        assert_equivalent(&tape, &folded, &registry, &points());

        let new = folded.dead_code(&registry).expect("dead_code");
        assert_eq!(new.op_enum_vec(), [OpEnum::Con, OpEnum::Con, OpEnum::Add]);
        assert_eq!(new.con_vec(), [0.0, 6.0_f64.sqrt()]);
    }

    #[test]
    fn select_on_constants_takes_its_branch() {
        let mut tape = Tape::<f64>::new(2);
        let one = tape.record_con(1.0);
        let two = tape.record_con(2.0);
        let low = tape.record_cexp(CompareOp::Lt, one, two, 0, 1);
        let high = tape.record_cexp(CompareOp::Lt, two, one, 0, 1);
        let varying = tape.record_cexp(CompareOp::Lt, 0, two, one, two);
        tape.set_dep(vec![low, high, varying]);
        let registry = Registry::new();

        let new = tape
            .fold_con(&registry)
            .and_then(|folded| folded.dead_code(&registry))
            .expect("fold_con");
        assert_eq!(&new.dep_vec()[..2], [0, 1]);
        assert_eq!(
            new.op_enum_vec().iter().filter(|&&op| op == OpEnum::Cexp).count(),
            1
        );
        assert_equivalent(&tape, &new, &registry, &points());
    }

    #[test]
    fn comparisons_on_constants() {
        let mut tape = Tape::<f64>::new(1);
        let one = tape.record_con(1.0);
        let two = tape.record_con(2.0);
        tape.record_comp(CompareOp::Lt, one, two);
        tape.record_comp(CompareOp::Eq, one, two);
        tape.record_comp(CompareOp::Lt, 0, two);
        let registry = Registry::new();

        let new = tape.fold_con(&registry).expect("fold_con");
        let n_comp = |tape: &Tape<f64>| {
            tape.op_enum_vec()
                .iter()
                .filter(|&&op| op == OpEnum::Comp)
                .count()
        };
        assert_eq!(n_comp(&tape), 3);
        assert_eq!(n_comp(&new), 2);
    }

    #[test]
    fn call_with_constant_inputs_is_folded() {
        let mut registry = Registry::new();
        let id = registry.register_call(SplitSum);
        let mut tape = Tape::<f64>::new(2);
        let three = tape.record_con(3.0);
        let four = tape.record_con(4.0);
        let all_constant = tape.record_call(id, 0, 2, &[three, four, three, four]);
        let partly_constant = tape.record_call(id, 0, 2, &[three, four, 0, 1]);
        tape.set_dep(vec![
            all_constant,
            all_constant + 1,
            partly_constant,
            partly_constant + 1,
        ]);

        let new = tape
            .fold_con(&registry)
            .and_then(|folded| folded.dead_code(&registry))
            .expect("fold_con");
        assert_well_formed(&new);
        assert_eq!(
            new.op_enum_vec().iter().filter(|&&op| op == OpEnum::Call).count(),
            1
        );
        assert_eq!(new.forward(&registry, &[2.0, 5.0]).expect("forward"), vec![7.0, 12.0, 7.0, 10.0]);
        assert_equivalent(&tape, &new, &registry, &points());
    }

    #[test]
    fn discrete_function_of_a_constant_is_folded() {
        let mut registry = Registry::new();
        let floor = registry.register_dis(Floor);
        let mut tape = Tape::<f64>::new(2);
        let c = tape.record_con(2.5);
        let folded = tape.record_dis(floor, c);
        let varying = tape.record_dis(floor, 0);
        let y = tape.record_op(OpEnum::Mul, &[folded, varying]);
        tape.set_dep(vec![y]);

        let new = tape
            .fold_con(&registry)
            .and_then(|folded| folded.dead_code(&registry))
            .expect("fold_con");
        assert_well_formed(&new);
        assert_eq!(new.con_vec(), [0.0, 2.0]);
        assert_eq!(
            new.op_enum_vec().iter().filter(|&&op| op == OpEnum::Dis).count(),
            1
        );
        assert_equivalent(&tape, &new, &registry, &points());
    }

    #[test]
    fn folding_twice_is_stable() {
        let mut tape = Tape::<f64>::new(1);
        let half = tape.record_con(0.5);
        let e = tape.record_op(OpEnum::Exp, &[half]);
        let y = tape.record_op(OpEnum::Mul, &[e, 0]);
        tape.set_dep(vec![y]);
        let registry = Registry::new();

        let once = tape
            .fold_con(&registry)
            .and_then(|folded| folded.dead_code(&registry))
            .expect("first fold");
        let twice = once
            .fold_con(&registry)
            .and_then(|folded| folded.dead_code(&registry))
            .expect("second fold");
        assert_eq!(once, twice);
        assert_equivalent(&tape, &twice, &registry, &[vec![2.0], vec![-1.0]]);
    }
}
