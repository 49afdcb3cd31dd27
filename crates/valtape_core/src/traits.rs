use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// A trait for types that can be stored in a tape's value vector.
/// Must support floating-point arithmetic and printing.
pub trait Scalar: Float + FromPrimitive + Debug + Display + 'static {}

impl<T: Float + FromPrimitive + Debug + Display + 'static> Scalar for T {}

/// Index into the value vector, the argument vector or one of the
/// tape's side tables. Every entry of the argument vector is an `Addr`.
pub type Addr = usize;

/// Bit pattern used to compare and hash constants.
/// Two constants are identical only if their bit patterns agree, so `-0.0`
/// and `0.0` stay distinct.
pub(crate) fn constant_bits<V: Scalar>(value: V) -> u64 {
    value.to_f64().map(f64::to_bits).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::constant_bits;

    #[test]
    fn constant_bits_separates_signed_zero() {
        assert_ne!(constant_bits(0.0_f64), constant_bits(-0.0_f64));
        assert_eq!(constant_bits(4.0_f64), constant_bits(4.0_f64));
    }
}
