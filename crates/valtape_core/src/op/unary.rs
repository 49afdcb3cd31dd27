use super::{EvalContext, OpEnum, OpKind};
use crate::traits::{Addr, Scalar};
use anyhow::Result;

/// `[x]`: elementary function of one value.
pub struct UnaryOp(pub OpEnum);

pub(crate) fn apply<V: Scalar>(op: OpEnum, x: V) -> V {
    match op {
        OpEnum::Neg => -x,
        OpEnum::Abs => x.abs(),
        OpEnum::Sign => {
            if x > V::zero() {
                V::one()
            } else if x < V::zero() {
                -V::one()
            } else if x.is_nan() {
                x
            } else {
                V::zero()
            }
        }
        OpEnum::Sqrt => x.sqrt(),
        OpEnum::Exp => x.exp(),
        OpEnum::Expm1 => x.exp_m1(),
        OpEnum::Log => x.ln(),
        OpEnum::Log1p => x.ln_1p(),
        OpEnum::Sin => x.sin(),
        OpEnum::Cos => x.cos(),
        OpEnum::Tan => x.tan(),
        OpEnum::Asin => x.asin(),
        OpEnum::Acos => x.acos(),
        OpEnum::Atan => x.atan(),
        OpEnum::Sinh => x.sinh(),
        OpEnum::Cosh => x.cosh(),
        OpEnum::Tanh => x.tanh(),
        other => unreachable!("{} is not a unary operator", other.name()),
    }
}

impl<V: Scalar> OpKind<V> for UnaryOp {
    fn op_enum(&self) -> OpEnum {
        self.0
    }

    fn fixed_n_arg(&self) -> Option<usize> {
        Some(1)
    }

    fn n_arg(&self, _arg_index: Addr, _arg_vec: &[Addr]) -> usize {
        1
    }

    fn n_res(&self, _arg_index: Addr, _arg_vec: &[Addr]) -> usize {
        1
    }

    fn eval(
        &self,
        ctx: &mut EvalContext<'_, V>,
        arg_index: Addr,
        res_index: Addr,
        val_vec: &mut [V],
    ) -> Result<()> {
        let x = val_vec[ctx.tape.arg_vec()[arg_index]];
        val_vec[res_index] = apply(self.0, x);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::apply;
    use crate::op::OpEnum;

    #[test]
    fn sign_has_three_outcomes() {
        assert_eq!(apply(OpEnum::Sign, -3.5_f64), -1.0);
        assert_eq!(apply(OpEnum::Sign, 0.0_f64), 0.0);
        assert_eq!(apply(OpEnum::Sign, 2.0_f64), 1.0);
        assert!(apply(OpEnum::Sign, f64::NAN).is_nan());
    }

    #[test]
    fn elementary_functions() {
        let x = 0.5_f64;
        assert_eq!(apply(OpEnum::Neg, x), -0.5);
        assert_eq!(apply(OpEnum::Abs, -x), 0.5);
        assert!((apply(OpEnum::Expm1, x) - (x.exp() - 1.0)).abs() < 1e-15);
        assert!((apply(OpEnum::Log1p, x) - (1.0 + x).ln()).abs() < 1e-15);
        assert!((apply(OpEnum::Atan, x) - x.atan()).abs() < 1e-15);
        assert!(apply(OpEnum::Log, -1.0_f64).is_nan());
    }
}
