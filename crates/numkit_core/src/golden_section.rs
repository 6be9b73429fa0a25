//! Golden-section search for extrema of unimodal functions.

use crate::equation_engine::is_saturated;
use crate::error::{check_interval, Result};
use crate::traits::ScalarFunction;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// The golden ratio `(1 + sqrt(5)) / 2`.
pub const PHI: f64 = 1.6180339887498949;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtremumKind {
    Minimum,
    Maximum,
}

impl ExtremumKind {
    /// True when `candidate` is a better extremum value than `incumbent`.
    fn improves(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            ExtremumKind::Minimum => candidate < incumbent,
            ExtremumKind::Maximum => candidate > incumbent,
        }
    }

    /// True when the left part `[a, x1)` of the bracket should be dropped.
    fn drop_left(self, f1: f64, f2: f64) -> bool {
        match self {
            ExtremumKind::Minimum => f1 >= f2,
            ExtremumKind::Maximum => f1 <= f2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GoldenSectionSettings {
    pub epsilon: f64,
    /// Soft cap; reaching it returns the current bracket.
    pub max_iterations: usize,
    /// Cells used by [`find_global_extremum`].
    pub grid_cells: usize,
}

impl Default for GoldenSectionSettings {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            max_iterations: 1000,
            grid_cells: 10,
        }
    }
}

impl GoldenSectionSettings {
    pub fn with_epsilon(epsilon: f64) -> Self {
        Self {
            epsilon,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtremumResult {
    pub kind: ExtremumKind,
    /// Midpoint of the final bracket.
    pub point: f64,
    pub value: f64,
    pub iterations: usize,
    pub interval: (f64, f64),
    /// The iteration cap stopped the search before the bracket shrank to
    /// `epsilon`.
    pub capped: bool,
}

pub fn find_minimum<F: ScalarFunction + ?Sized>(
    f: &F,
    a: f64,
    b: f64,
    epsilon: f64,
) -> Result<ExtremumResult> {
    find_extremum(
        f,
        a,
        b,
        ExtremumKind::Minimum,
        &GoldenSectionSettings::with_epsilon(epsilon),
    )
}

pub fn find_maximum<F: ScalarFunction + ?Sized>(
    f: &F,
    a: f64,
    b: f64,
    epsilon: f64,
) -> Result<ExtremumResult> {
    find_extremum(
        f,
        a,
        b,
        ExtremumKind::Maximum,
        &GoldenSectionSettings::with_epsilon(epsilon),
    )
}

/// Shrinks `[a, b]` around the extremum, reusing one interior probe per
/// iteration, until `|b - a| <= epsilon` or the iteration cap.
pub fn find_extremum<F: ScalarFunction + ?Sized>(
    f: &F,
    mut a: f64,
    mut b: f64,
    kind: ExtremumKind,
    settings: &GoldenSectionSettings,
) -> Result<ExtremumResult> {
    check_interval(a, b, settings.epsilon)?;

    let mut x1 = b - (b - a) / PHI;
    let mut x2 = a + (b - a) / PHI;
    let mut f1 = f.value(x1);
    let mut f2 = f.value(x2);
    let mut iterations = 0;

    while (b - a).abs() > settings.epsilon && iterations < settings.max_iterations {
        iterations += 1;

        if kind.drop_left(f1, f2) {
            a = x1;
            x1 = x2;
            f1 = f2;
            x2 = a + (b - a) / PHI;
            f2 = f.value(x2);
        } else {
            b = x2;
            x2 = x1;
            f2 = f1;
            x1 = b - (b - a) / PHI;
            f1 = f.value(x1);
        }
    }

    let capped = (b - a).abs() > settings.epsilon;
    if capped {
        warn!(
            "golden-section search stopped at the {}-iteration cap with bracket [{a}, {b}]",
            settings.max_iterations
        );
    }

    let point = (a + b) / 2.0;
    Ok(ExtremumResult {
        kind,
        point,
        value: f.value(point),
        iterations,
        interval: (a, b),
        capped,
    })
}

/// Runs the local search on overlapping cells of `[a, b]` and keeps the best.
///
/// Cell `i` starts at `a + i*h` and spans `2h` (clipped to `b`), where
/// `h = (b - a) / grid_cells`. Cells that fail, or where the function is
/// undefined at the located point, are skipped. If every cell is skipped the
/// whole interval is searched at once.
pub fn find_global_extremum<F: ScalarFunction + ?Sized>(
    f: &F,
    a: f64,
    b: f64,
    kind: ExtremumKind,
    settings: &GoldenSectionSettings,
) -> Result<ExtremumResult> {
    check_interval(a, b, settings.epsilon)?;

    let cells = settings.grid_cells.max(1);
    let step = (b - a) / cells as f64;
    let mut best: Option<ExtremumResult> = None;

    for i in 0..cells {
        let start = a + i as f64 * step;
        let end = b.min(start + 2.0 * step);

        let local = match find_extremum(f, start, end, kind, settings) {
            Ok(local) if !is_saturated(local.value) => local,
            Ok(_) => continue,
            Err(err) => {
                debug!("skipping cell [{start}, {end}]: {err}");
                continue;
            }
        };

        let better = best
            .as_ref()
            .map_or(true, |current| kind.improves(local.value, current.value));
        if better {
            best = Some(local);
        }
    }

    match best {
        Some(result) => Ok(result),
        None => {
            warn!("every cell of [{a}, {b}] failed, searching the whole interval");
            find_extremum(f, a, b, kind, settings)
        }
    }
}
