//! Newton's method for minimizing a function of one variable on a box `[a, b]`.
//!
//! Derivatives come from central finite differences. The iteration is
//! clamped to the box, recognizes minima sitting on either edge, and falls
//! back to a candidate search whenever it fails to land on a minimum, so a
//! point is always returned.

use crate::equation_engine::is_saturated;
use crate::error::{check_interval, MathError, Result};
use crate::probe::best_scan_point;
use crate::traits::ScalarFunction;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Distance to an edge under which a point counts as lying on it.
const BOUNDARY_TOLERANCE: f64 = 1e-10;
/// Below this `|f''|` the Newton step is replaced by a gradient step.
const CURVATURE_FLOOR: f64 = 1e-10;
/// Stand-in for a derivative that could not be estimated.
const NEUTRAL_DERIVATIVE: f64 = 1.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewtonSettings {
    pub epsilon: f64,
    pub max_iterations: usize,
    /// Step of the first-derivative difference quotient.
    pub first_step: f64,
    /// Step of the second-derivative difference quotient.
    pub second_step: f64,
    /// Gradient-descent rate used when the curvature is too flat.
    pub learning_rate: f64,
    /// Largest Newton step allowed in one iteration.
    pub max_step: f64,
    /// Nodes minus one of the fallback scan.
    pub scan_points: usize,
    /// Record a [`NewtonStep`] per iteration.
    pub track_steps: bool,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            max_iterations: 100,
            first_step: 1e-6,
            second_step: 1e-4,
            learning_rate: 0.1,
            max_step: 1.0,
            scan_points: 50,
            track_steps: false,
        }
    }
}

/// Snapshot of one iteration, for step-by-step display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewtonStep {
    pub index: usize,
    pub x: f64,
    pub value: f64,
    pub first_derivative: f64,
    pub second_derivative: f64,
}

/// What kind of point the search ended on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointClass {
    /// `|f'| < epsilon` and `f'' > 0`.
    InteriorMinimum,
    /// On `a` with `f' > 0`: the function grows into the box.
    LeftBoundaryMinimum,
    /// On `b` with `f' < 0`.
    RightBoundaryMinimum,
    NotMinimum,
}

impl PointClass {
    pub fn is_minimum(self) -> bool {
        self != PointClass::NotMinimum
    }
}

/// Why the Newton iteration itself stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// An iterate was classified as a minimum.
    Minimum,
    /// The step fell below epsilon.
    SmallStep,
    /// `max_iterations` ran out.
    IterationLimit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewtonResult {
    pub point: f64,
    pub value: f64,
    pub iterations: usize,
    pub first_derivative: f64,
    pub second_derivative: f64,
    /// False only when the iteration limit was hit.
    pub converged: bool,
    pub is_minimum: bool,
    pub termination: Termination,
    pub classification: PointClass,
    /// The returned point comes from the candidate search.
    pub fallback: bool,
    pub steps: Vec<NewtonStep>,
}

impl NewtonResult {
    pub fn message(&self) -> String {
        ConvergenceMessage(self).to_string()
    }
}

struct ConvergenceMessage<'a>(&'a NewtonResult);

impl fmt::Display for ConvergenceMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.0;
        let text = match (result.fallback, result.termination, result.classification) {
            (false, Termination::SmallStep, PointClass::LeftBoundaryMinimum) => {
                "converged to a minimum on the left boundary"
            }
            (false, Termination::SmallStep, PointClass::RightBoundaryMinimum) => {
                "converged to a minimum on the right boundary"
            }
            (false, Termination::SmallStep, _) => "converged to a minimum",
            (false, _, PointClass::LeftBoundaryMinimum) => "minimum found on the left boundary",
            (false, _, PointClass::RightBoundaryMinimum) => "minimum found on the right boundary",
            (false, _, _) => "local minimum found",
            (true, _, PointClass::LeftBoundaryMinimum) => "global minimum on the left boundary",
            (true, _, PointClass::RightBoundaryMinimum) => "global minimum on the right boundary",
            (true, _, PointClass::InteriorMinimum) => "local minimum found by grid search",
            (true, _, PointClass::NotMinimum) => "best point found (possible minimum)",
        };
        f.write_str(text)?;
        if result.fallback {
            match result.termination {
                Termination::SmallStep => {
                    f.write_str("; Newton converged to a point that is not a minimum")?
                }
                Termination::IterationLimit => f.write_str("; Newton did not converge")?,
                Termination::Minimum => {}
            }
        }
        Ok(())
    }
}

/// Central difference `(f(x+h) - f(x-h)) / 2h`. NaN when either sample is
/// saturated.
pub fn first_derivative<F: ScalarFunction + ?Sized>(f: &F, x: f64, h: f64) -> f64 {
    let plus = f.value(x + h);
    let minus = f.value(x - h);
    if is_saturated(plus) || is_saturated(minus) {
        return f64::NAN;
    }
    (plus - minus) / (2.0 * h)
}

/// Central difference `(f(x+h) - 2f(x) + f(x-h)) / h^2`. NaN when any
/// sample is saturated.
pub fn second_derivative<F: ScalarFunction + ?Sized>(f: &F, x: f64, h: f64) -> f64 {
    let center = f.value(x);
    let plus = f.value(x + h);
    let minus = f.value(x - h);
    if is_saturated(center) || is_saturated(plus) || is_saturated(minus) {
        return f64::NAN;
    }
    (plus - 2.0 * center + minus) / (h * h)
}

struct Minimizer<'f, F: ?Sized> {
    f: &'f F,
    a: f64,
    b: f64,
    settings: NewtonSettings,
}

impl<F: ScalarFunction + ?Sized> Minimizer<'_, F> {
    fn derivatives(&self, x: f64) -> (f64, f64) {
        let d1 = neutral(first_derivative(self.f, x, self.settings.first_step), x);
        let d2 = neutral(second_derivative(self.f, x, self.settings.second_step), x);
        (d1, d2)
    }

    fn classify(&self, x: f64, d1: f64, d2: f64) -> PointClass {
        if (x - self.a).abs() < BOUNDARY_TOLERANCE && d1 > 0.0 {
            PointClass::LeftBoundaryMinimum
        } else if (x - self.b).abs() < BOUNDARY_TOLERANCE && d1 < 0.0 {
            PointClass::RightBoundaryMinimum
        } else if d1.abs() < self.settings.epsilon && d2 > 0.0 {
            PointClass::InteriorMinimum
        } else {
            PointClass::NotMinimum
        }
    }

    fn clamp(&self, x: f64) -> f64 {
        x.max(self.a).min(self.b)
    }

    fn next_point(&self, x: f64, d1: f64, d2: f64) -> f64 {
        let candidate = if d2.abs() > CURVATURE_FLOOR {
            let step = -d1 / d2;
            x + step.clamp(-self.settings.max_step, self.settings.max_step)
        } else {
            x - self.settings.learning_rate * d1
        };
        self.clamp(candidate)
    }

    /// Best of `{a, b, last, scan}` by function value.
    fn fallback_point(&self, last: f64) -> f64 {
        let scan = best_scan_point(self.f, self.a, self.b, self.settings.scan_points);
        let mut best = self.a;
        let mut best_value = self.f.value(self.a);
        for x in [self.b, last, scan] {
            let value = self.f.value(x);
            if value < best_value {
                best = x;
                best_value = value;
            }
        }
        best
    }
}

fn neutral(derivative: f64, x: f64) -> f64 {
    if derivative.is_finite() {
        derivative
    } else {
        debug!("derivative at x = {x} is not finite, substituting {NEUTRAL_DERIVATIVE}");
        NEUTRAL_DERIVATIVE
    }
}

/// Minimizes `f` on `[a, b]` starting from `x0` (clamped into the box).
///
/// Each iteration classifies the current point and stops on a minimum;
/// otherwise it takes a Newton step `-f'/f''` limited to `max_step`, or a
/// gradient step when `|f''|` is tiny. A step shorter than `epsilon` ends the
/// iteration and re-classifies the new point. When the iteration does not
/// end on a minimum the best of `a`, `b`, the last iterate and a uniform scan
/// is returned instead, classified the same way.
pub fn minimize<F: ScalarFunction + ?Sized>(
    f: &F,
    x0: f64,
    a: f64,
    b: f64,
    settings: &NewtonSettings,
) -> Result<NewtonResult> {
    check_interval(a, b, settings.epsilon)?;
    if !x0.is_finite() {
        return Err(MathError::argument("starting point must be finite"));
    }
    if !(settings.first_step > 0.0 && settings.second_step > 0.0) {
        return Err(MathError::argument("difference steps must be positive"));
    }
    if !(settings.max_step.is_finite() && settings.max_step > 0.0) {
        return Err(MathError::argument(format!(
            "max_step must be finite and positive, got {}",
            settings.max_step
        )));
    }
    if !(settings.learning_rate.is_finite() && settings.learning_rate > 0.0) {
        return Err(MathError::argument(format!(
            "learning_rate must be finite and positive, got {}",
            settings.learning_rate
        )));
    }

    let minimizer = Minimizer {
        f,
        a,
        b,
        settings: *settings,
    };

    let mut steps = Vec::new();
    let mut x = minimizer.clamp(x0);
    let mut iterations = 0;
    let mut termination = Termination::IterationLimit;
    let mut classification = PointClass::NotMinimum;

    for index in 0..settings.max_iterations {
        iterations = index + 1;

        let value = f.value(x);
        let (d1, d2) = minimizer.derivatives(x);

        if settings.track_steps {
            steps.push(NewtonStep {
                index,
                x,
                value,
                first_derivative: d1,
                second_derivative: d2,
            });
        }

        classification = minimizer.classify(x, d1, d2);
        if classification.is_minimum() {
            termination = Termination::Minimum;
            break;
        }

        let next = minimizer.next_point(x, d1, d2);
        if (next - x).abs() < settings.epsilon {
            x = next;
            let (d1, d2) = minimizer.derivatives(x);
            classification = minimizer.classify(x, d1, d2);
            termination = Termination::SmallStep;
            break;
        }
        x = next;
    }

    let fallback = !classification.is_minimum();
    if fallback {
        warn!(
            "Newton iteration ended on a non-minimum ({:?} after {} iterations), running candidate search",
            termination, iterations
        );
        x = minimizer.fallback_point(x);
        let (d1, d2) = minimizer.derivatives(x);
        classification = minimizer.classify(x, d1, d2);
    }

    let (first_derivative, second_derivative) = minimizer.derivatives(x);
    let result = NewtonResult {
        point: x,
        value: f.value(x),
        iterations,
        first_derivative,
        second_derivative,
        converged: termination != Termination::IterationLimit,
        is_minimum: classification.is_minimum(),
        termination,
        classification,
        fallback,
        steps,
    };
    debug!(
        "Newton minimization on [{a}, {b}] from {x0}: {} at x = {}",
        result.message(),
        result.point
    );
    Ok(result)
}

/// Suggests a starting point: the lowest node of a uniform scan.
pub fn suggest_start<F: ScalarFunction + ?Sized>(f: &F, a: f64, b: f64, points: usize) -> f64 {
    best_scan_point(f, a, b, points)
}
