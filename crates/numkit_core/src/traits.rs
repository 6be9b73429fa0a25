use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for numeric element types the sorting engine and the data
/// generators operate on. Must support ordering, debug printing, and
/// conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A real function of one real variable.
///
/// Every root and extremum finder is generic over this trait, so compiled
/// formulas and plain closures can be searched the same way.
pub trait ScalarFunction {
    /// Evaluates the function at `x`.
    ///
    /// Implementations used with the finders are expected to saturate
    /// non-finite results (see [`crate::equation_engine::SATURATED`]).
    fn value(&self, x: f64) -> f64;

    /// Evaluates without any saturation, exposing NaN and infinities.
    /// Defaults to [`ScalarFunction::value`].
    fn raw_value(&self, x: f64) -> f64 {
        self.value(x)
    }
}

impl<F: Fn(f64) -> f64> ScalarFunction for F {
    fn value(&self, x: f64) -> f64 {
        self(x)
    }
}
