//! Bisection (dichotomy) root finding.
//!
//! Two entry points share one bracketing kernel:
//! - [`find_root`]: a single root on a bracket with a sign change. Exceeding
//!   the step cap is an error.
//! - [`find_roots`] / [`scan_roots`]: every root on an interval, found by
//!   splitting it into equal segments and bisecting each bracketing segment.
//!   Exceeding the step cap only truncates that segment's search.

use crate::equation_engine::is_saturated;
use crate::error::{check_interval, MathError, Result};
use crate::traits::ScalarFunction;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Endpoint values at or below this magnitude count as zero when deciding
/// whether both ends share a sign.
const SIGN_ZERO: f64 = 1e-15;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BisectionSettings {
    pub epsilon: f64,
    /// Scanning stops once this many roots are collected.
    pub max_roots: usize,
    /// Number of equal segments the interval is split into.
    pub segments: usize,
    /// Bisection steps allowed per single-root search.
    pub max_steps: usize,
}

impl Default for BisectionSettings {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            max_roots: 10,
            segments: 100,
            max_steps: 1000,
        }
    }
}

impl BisectionSettings {
    pub fn with_epsilon(epsilon: f64) -> Self {
        Self {
            epsilon,
            ..Self::default()
        }
    }
}

/// Result of a single-root search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleRoot {
    pub root: f64,
    pub value: f64,
    pub iterations: usize,
    /// Bracket at termination.
    pub bracket: (f64, f64),
}

/// Roots collected by a segment scan, in scan order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootSet {
    pub roots: Vec<f64>,
    /// Bisection steps summed over all segments.
    pub iterations: usize,
    /// Segments skipped because the function is undefined there.
    pub invalid_segments: usize,
    /// Segments whose bisection hit the step cap before converging.
    pub truncated_segments: usize,
}

impl RootSet {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    fn insert_if_new(&mut self, root: f64, epsilon: f64) -> bool {
        if self.roots.iter().any(|r| (r - root).abs() < epsilon) {
            return false;
        }
        self.roots.push(root);
        true
    }
}

/// Outcome of [`find_roots`].
///
/// `NoSignChange` is not an error: the inputs are valid, but the interval
/// ends share a sign so no root can be bracketed from them. It is distinct
/// from `Roots` with an empty set, which means the full scan found nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RootSearch {
    Roots(RootSet),
    NoSignChange { fa: f64, fb: f64 },
}

impl RootSearch {
    pub fn roots(&self) -> &[f64] {
        match self {
            RootSearch::Roots(set) => &set.roots,
            RootSearch::NoSignChange { .. } => &[],
        }
    }
}

/// True when `f(a)` and `f(b)` are both clearly non-zero with the same sign.
pub fn has_same_sign_on_ends<F: ScalarFunction + ?Sized>(f: &F, a: f64, b: f64) -> bool {
    let fa = f.value(a);
    let fb = f.value(b);
    if fa.is_nan() || fb.is_nan() {
        return false;
    }
    fa.signum() == fb.signum() && fa.abs() > SIGN_ZERO && fb.abs() > SIGN_ZERO
}

struct Bisected {
    root: f64,
    iterations: usize,
    bracket: (f64, f64),
    converged: bool,
}

/// Bisects `[lo, hi]`, which must carry a sign change. Stops at the first
/// midpoint with `|f(m)| < epsilon`, or once the bracket has shrunk to two
/// adjacent floats (a root too steep for `|f|` to ever reach `epsilon`).
/// After `max_steps` steps returns the midpoint of the remaining bracket
/// with `converged == false`.
fn bisect<F: ScalarFunction + ?Sized>(
    f: &F,
    mut lo: f64,
    mut hi: f64,
    mut f_lo: f64,
    epsilon: f64,
    max_steps: usize,
) -> Bisected {
    let mut iterations = 0;
    while iterations < max_steps {
        let mid = (lo + hi) / 2.0;
        let f_mid = f.value(mid);
        iterations += 1;

        if f_mid.abs() < epsilon || mid <= lo || mid >= hi {
            return Bisected {
                root: mid,
                iterations,
                bracket: (lo, hi),
                converged: true,
            };
        }

        if f_lo * f_mid < 0.0 {
            hi = mid;
        } else {
            lo = mid;
            f_lo = f_mid;
        }
    }

    Bisected {
        root: (lo + hi) / 2.0,
        iterations,
        bracket: (lo, hi),
        converged: false,
    }
}

/// Finds one root of `f` on `[a, b]`.
///
/// Requires `f(a) * f(b) < 0`. Fails with [`MathError::IterationLimit`] when
/// the 1000-step cap is exceeded before the bracket is exhausted.
pub fn find_root<F: ScalarFunction + ?Sized>(
    f: &F,
    a: f64,
    b: f64,
    epsilon: f64,
) -> Result<SingleRoot> {
    check_interval(a, b, epsilon)?;
    let limit = BisectionSettings::default().max_steps;

    let fa = f.value(a);
    let fb = f.value(b);
    if !(fa * fb < 0.0) {
        return Err(MathError::argument(format!(
            "f(a) and f(b) must have opposite signs (f({a}) = {fa}, f({b}) = {fb})"
        )));
    }

    let outcome = bisect(f, a, b, fa, epsilon, limit);
    if !outcome.converged {
        return Err(MathError::IterationLimit { limit });
    }
    debug!(
        "bisection converged to {} after {} steps",
        outcome.root, outcome.iterations
    );
    Ok(SingleRoot {
        root: outcome.root,
        value: f.value(outcome.root),
        iterations: outcome.iterations,
        bracket: outcome.bracket,
    })
}

/// Finds up to `settings.max_roots` roots of `f` on `[a, b]`.
///
/// Returns [`RootSearch::NoSignChange`] without scanning when both ends have
/// the same sign; otherwise the result of [`scan_roots`].
pub fn find_roots<F: ScalarFunction + ?Sized>(
    f: &F,
    a: f64,
    b: f64,
    settings: &BisectionSettings,
) -> Result<RootSearch> {
    check_interval(a, b, settings.epsilon)?;

    if has_same_sign_on_ends(f, a, b) {
        let (fa, fb) = (f.value(a), f.value(b));
        debug!("no sign change on [{a}, {b}]: f(a) = {fa}, f(b) = {fb}");
        return Ok(RootSearch::NoSignChange { fa, fb });
    }

    scan_roots(f, a, b, settings).map(RootSearch::Roots)
}

/// Segment scan without the same-sign precondition.
///
/// For each segment `[s, s + h]`:
/// - skip it when `f` is NaN or infinite at `s`, its midpoint or `s + h`;
/// - record `s` when `|f(s)| < epsilon`;
/// - bisect when the ends have opposite signs;
/// - otherwise, when both ends are within `10 * epsilon` of zero, probe the
///   midpoint (catches roots of even multiplicity).
///
/// Roots closer than `epsilon` to an earlier one are dropped.
pub fn scan_roots<F: ScalarFunction + ?Sized>(
    f: &F,
    a: f64,
    b: f64,
    settings: &BisectionSettings,
) -> Result<RootSet> {
    check_interval(a, b, settings.epsilon)?;
    if settings.segments == 0 {
        return Err(MathError::argument("segments must be at least 1"));
    }
    if settings.max_steps == 0 {
        return Err(MathError::argument("max_steps must be at least 1"));
    }

    let epsilon = settings.epsilon;
    let step = (b - a) / settings.segments as f64;
    let mut set = RootSet::default();

    for i in 0..settings.segments {
        if set.len() >= settings.max_roots {
            break;
        }

        let start = a + i as f64 * step;
        let end = start + step;

        if !is_segment_valid(f, start, end) {
            set.invalid_segments += 1;
            continue;
        }

        let f_start = f.value(start);
        let f_end = f.value(end);

        if f_start.abs() < epsilon {
            set.insert_if_new(start, epsilon);
        } else if f_start * f_end < 0.0 {
            let root = if f_end.abs() < epsilon {
                end
            } else {
                let outcome = bisect(f, start, end, f_start, epsilon, settings.max_steps);
                set.iterations += outcome.iterations;
                if !outcome.converged {
                    set.truncated_segments += 1;
                    warn!(
                        "bisection on [{start}, {end}] hit the {}-step cap, using bracket midpoint {}",
                        settings.max_steps, outcome.root
                    );
                }
                outcome.root
            };
            set.insert_if_new(root, epsilon);
        } else if f_start.abs() < 10.0 * epsilon && f_end.abs() < 10.0 * epsilon {
            let mid = (start + end) / 2.0;
            if f.value(mid).abs() < epsilon {
                set.insert_if_new(mid, epsilon);
            }
        }
    }

    debug!(
        "scan of [{a}, {b}] found {} root(s) in {} bisection steps",
        set.len(),
        set.iterations
    );
    Ok(set)
}

fn is_segment_valid<F: ScalarFunction + ?Sized>(f: &F, start: f64, end: f64) -> bool {
    let mid = (start + end) / 2.0;
    [start, mid, end]
        .iter()
        .all(|&x| !is_saturated(f.raw_value(x)))
}
