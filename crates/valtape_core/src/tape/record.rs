//! Appending usages to a tape.
//!
//! Every `record_*` method returns the index of the (first) result it
//! creates. Arguments must be indices of values that already exist.

use super::Tape;
use crate::op::{op_kind, CompareOp, OpEnum};
use crate::options::OptimizeOptions;
use crate::registry::OpaqueFamily;
use crate::traits::{Addr, Scalar};

impl<V: Scalar> Tape<V> {
    /// A tape with `n_ind` independents and the constant zero at `n_ind`.
    pub fn new(n_ind: usize) -> Self {
        Self::with_options(n_ind, OptimizeOptions::default())
    }

    pub fn with_options(n_ind: usize, options: OptimizeOptions) -> Self {
        let mut tape = Self {
            n_ind,
            n_val: n_ind,
            arg_vec: Vec::new(),
            con_vec: Vec::new(),
            str_vec: vec![String::new()],
            dep_vec: Vec::new(),
            dep_set: false,
            op_enum_vec: Vec::new(),
            vec_initial: Vec::new(),
            options,
        };
        tape.record_con(V::zero());
        tape
    }

    /// Discards everything recorded so far and starts over with `n_ind`
    /// independents. Options are kept.
    pub fn set_ind(&mut self, n_ind: usize) {
        *self = Self::with_options(n_ind, self.options);
    }

    /// Appends one usage whose full argument slice is `args`.
    pub(crate) fn push_usage(&mut self, op: OpEnum, args: &[Addr]) -> Addr {
        let kind = op_kind::<V>(op);
        let arg_index = self.arg_vec.len();
        self.arg_vec.extend_from_slice(args);
        debug_assert_eq!(kind.n_arg(arg_index, &self.arg_vec), args.len());
        debug_assert!(
            kind.value_args(arg_index, &self.arg_vec)
                .iter()
                .all(|&i| i < self.n_val),
            "{} reads a value that does not exist yet",
            op.name()
        );
        let res_index = self.n_val;
        self.n_val += kind.n_res(arg_index, &self.arg_vec);
        self.op_enum_vec.push(op);
        res_index
    }

    pub fn record_con(&mut self, value: V) -> Addr {
        let con_index = self.con_vec.len();
        self.con_vec.push(value);
        self.push_usage(OpEnum::Con, &[con_index])
    }

    /// Records a unary or binary usage.
    pub fn record_op(&mut self, op: OpEnum, args: &[Addr]) -> Addr {
        debug_assert!(
            (op.is_unary() && args.len() == 1) || (op.is_binary() && args.len() == 2),
            "record_op does not record {} with {} argument(s)",
            op.name(),
            args.len()
        );
        self.push_usage(op, args)
    }

    /// Records discrete function `discrete_id` of the registry applied to `x`.
    pub fn record_dis(&mut self, discrete_id: usize, x: Addr) -> Addr {
        self.push_usage(OpEnum::Dis, &[discrete_id, x])
    }

    pub fn record_comp(&mut self, cmp: CompareOp, left: Addr, right: Addr) {
        self.push_usage(OpEnum::Comp, &[cmp.code(), left, right]);
    }

    pub fn record_cexp(
        &mut self,
        cmp: CompareOp,
        left: Addr,
        right: Addr,
        if_true: Addr,
        if_false: Addr,
    ) -> Addr {
        self.push_usage(OpEnum::Cexp, &[cmp.code(), left, right, if_true, if_false])
    }

    pub fn record_csum(&mut self, add: &[Addr], sub: &[Addr]) -> Addr {
        let n_arg = 3 + add.len() + sub.len();
        let mut args = Vec::with_capacity(n_arg);
        args.push(add.len());
        args.push(sub.len());
        args.extend_from_slice(add);
        args.extend_from_slice(sub);
        args.push(n_arg);
        self.push_usage(OpEnum::Csum, &args)
    }

    /// Records a usage of registered function `function_id` of `family`
    /// with inputs `x` and `n_res` results.
    pub fn record_opaque(
        &mut self,
        family: OpaqueFamily,
        function_id: usize,
        call_id: usize,
        n_res: usize,
        x: &[Addr],
    ) -> Addr {
        let n_arg = 5 + x.len();
        let mut args = Vec::with_capacity(n_arg);
        args.extend_from_slice(&[n_arg, n_res, function_id, call_id]);
        args.extend_from_slice(x);
        args.push(n_arg);
        self.push_usage(family.op_enum(), &args)
    }

    pub fn record_call(&mut self, function_id: usize, call_id: usize, n_res: usize, x: &[Addr]) -> Addr {
        self.record_opaque(OpaqueFamily::Call, function_id, call_id, n_res, x)
    }

    pub fn record_map(&mut self, map_id: usize, call_id: usize, n_res: usize, x: &[Addr]) -> Addr {
        self.record_opaque(OpaqueFamily::Map, map_id, call_id, n_res, x)
    }

    /// Index of `text` in the string vector, adding it when new.
    pub(crate) fn intern(&mut self, text: &str) -> Addr {
        match self.str_vec.iter().position(|entry| entry == text) {
            Some(index) => index,
            None => {
                self.str_vec.push(text.to_string());
                self.str_vec.len() - 1
            }
        }
    }

    /// Prints `before`, the value and `after` whenever `flag` is positive.
    pub fn record_pri(&mut self, before: &str, after: &str, flag: Addr, value: Addr) {
        let before = self.intern(before);
        let after = self.intern(after);
        self.push_usage(OpEnum::Pri, &[before, after, flag, value]);
    }

    /// Starts a new dynamic vector from existing values and returns its
    /// `which_vector` index.
    pub fn record_vec(&mut self, initial: &[Addr]) -> usize {
        debug_assert!(initial.iter().all(|&i| i < self.n_val));
        let which = self.vec_initial.len();
        self.vec_initial.push(initial.to_vec());
        self.push_usage(OpEnum::Vec, &[which]);
        which
    }

    pub fn record_load(&mut self, which: usize, index: Addr) -> Addr {
        debug_assert!(which < self.vec_initial.len());
        self.push_usage(OpEnum::Load, &[which, index])
    }

    pub fn record_store(&mut self, which: usize, index: Addr, value: Addr) {
        debug_assert!(which < self.vec_initial.len());
        self.push_usage(OpEnum::Store, &[which, index, value]);
    }

    /// Sets which values are the tape outputs. Called once, after the last
    /// usage is recorded.
    pub fn set_dep(&mut self, dep_vec: Vec<Addr>) {
        debug_assert!(!self.dep_set, "dependent values already set");
        debug_assert!(dep_vec.iter().all(|&i| i < self.n_val));
        self.dep_vec = dep_vec;
        self.dep_set = true;
    }
}

#[cfg(test)]
mod tests {
    use crate::op::OpEnum;
    use crate::registry::OpaqueFamily;
    use crate::tape::Tape;

    #[test]
    fn new_tape_starts_with_zero() {
        let tape = Tape::<f64>::new(3);
        assert_eq!(tape.n_val(), 4);
        assert_eq!(tape.zero_index(), 3);
        assert_eq!(tape.op_enum_vec(), [OpEnum::Con]);
        assert_eq!(tape.con_vec(), [0.0]);
        assert_eq!(tape.str_vec(), [""]);
    }

    #[test]
    fn set_ind_starts_over() {
        let mut tape = Tape::<f64>::new(1);
        tape.set_option("keep_print", "false").expect("option");
        let two = tape.record_con(2.0);
        let y = tape.record_op(OpEnum::Mul, &[0, two]);
        tape.set_dep(vec![y]);

        tape.set_ind(2);
        assert_eq!(tape.n_ind(), 2);
        assert_eq!(tape.n_op(), 1);
        assert_eq!(tape.con_vec(), [0.0]);
        assert!(tape.dep_vec().is_empty());
        assert!(!tape.dep_is_set());
        assert!(!tape.options().keep_print);
    }

    #[test]
    #[should_panic(expected = "dependent values already set")]
    #[cfg(debug_assertions)]
    fn empty_dependents_count_as_set() {
        let mut tape = Tape::<f64>::new(1);
        tape.set_dep(Vec::new());
        assert!(tape.dep_is_set());
        tape.set_dep(vec![0]);
    }

    #[test]
    fn variadic_usages_end_with_their_count() {
        let mut tape = Tape::<f64>::new(2);
        let sum = tape.record_csum(&[0], &[1]);
        assert_eq!(&tape.arg_vec()[1..], [1, 1, 0, 1, 5]);
        let first = tape.record_map(0, 7, 2, &[0, sum]);
        assert_eq!(first, sum + 1);
        assert_eq!(tape.n_val(), first + 2);
        assert_eq!(&tape.arg_vec()[6..], [7, 2, 0, 7, 0, sum, 7]);
        assert_eq!(
            OpaqueFamily::Map.op_enum(),
            tape.op_enum_vec()[tape.n_op() - 1]
        );
    }

    #[test]
    fn results_are_numbered_in_order() {
        let mut tape = Tape::<f64>::new(1);
        let a = tape.record_op(OpEnum::Exp, &[0]);
        let b = tape.record_op(OpEnum::Add, &[0, a]);
        tape.record_comp(crate::op::CompareOp::Lt, a, b);
        let c = tape.record_op(OpEnum::Neg, &[b]);
        assert_eq!((a, b, c), (2, 3, 4));
        assert_eq!(tape.n_val(), 5);
    }
}
