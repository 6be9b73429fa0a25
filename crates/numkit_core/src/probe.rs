//! Cheap sampling checks run before the iterative searches.

use crate::equation_engine::is_saturated;
use crate::traits::ScalarFunction;

/// Number of sub-intervals sampled by [`is_defined_on_interval`].
const DEFINITION_SAMPLES: usize = 10;
/// Share of samples that must be finite for the function to count as defined.
const DEFINITION_RATIO: f64 = 0.7;
const CONSTANT_TOLERANCE: f64 = 1e-15;

/// Samples `f` at 11 equally spaced points of `[a, b]` and reports whether at
/// least 70% of them give a usable value.
pub fn is_defined_on_interval<F: ScalarFunction + ?Sized>(f: &F, a: f64, b: f64) -> bool {
    let step = (b - a) / DEFINITION_SAMPLES as f64;
    let valid = (0..=DEFINITION_SAMPLES)
        .map(|i| f.value(a + i as f64 * step))
        .filter(|v| !is_saturated(*v))
        .count();
    valid as f64 >= DEFINITION_SAMPLES as f64 * DEFINITION_RATIO
}

/// Compares `f` at the ends, the midpoint and the quarter points.
pub fn is_constant_on_interval<F: ScalarFunction + ?Sized>(f: &F, a: f64, b: f64) -> bool {
    let points = [
        a,
        (a + b) / 2.0,
        b,
        a + (b - a) / 4.0,
        a + 3.0 * (b - a) / 4.0,
    ];
    let first = f.value(points[0]);
    points
        .iter()
        .all(|&x| (f.value(x) - first).abs() <= CONSTANT_TOLERANCE)
}

/// `f(a) * f(b) < 0`.
pub fn has_sign_change<F: ScalarFunction + ?Sized>(f: &F, a: f64, b: f64) -> bool {
    f.value(a) * f.value(b) < 0.0
}

/// Uniform scan over `points + 1` nodes of `[a, b]`, returning the node with
/// the smallest usable value. Falls back to `a` when nothing beats `f(a)`.
pub fn best_scan_point<F: ScalarFunction + ?Sized>(f: &F, a: f64, b: f64, points: usize) -> f64 {
    let points = points.max(1);
    let step = (b - a) / points as f64;
    let mut best_x = a;
    let mut best_value = f.value(a);

    for i in 0..=points {
        let x = a + i as f64 * step;
        let value = f.value(x);
        if value < best_value && !is_saturated(value) {
            best_x = x;
            best_value = value;
        }
    }

    best_x
}
