use nalgebra::RealField;
use num_traits::ToPrimitive;

/// Scalar type of knots, control values and samples (f32 or f64)
pub trait FloatingPoint: RealField + ToPrimitive + Copy {}

impl FloatingPoint for f32 {}
impl FloatingPoint for f64 {}

/// Returns `value`, or one when `value` is numerically zero.
/// Used wherever a normalization would otherwise divide by a degenerate range.
pub fn non_zero_or_one<T: FloatingPoint>(value: T) -> T {
    if value.abs() <= T::default_epsilon() {
        T::one()
    } else {
        value
    }
}
