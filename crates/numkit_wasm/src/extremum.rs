//! Golden-section and Newton exports.

use crate::{compile, js_error, serialize};
use anyhow::{bail, Context};
use numkit_core::golden_section::{self, ExtremumKind, GoldenSectionSettings};
use numkit_core::newton::{self, NewtonResult, NewtonSettings};
use serde::Serialize;
use wasm_bindgen::prelude::*;

fn parse_kind(kind: &str) -> anyhow::Result<ExtremumKind> {
    match kind {
        "min" | "minimum" => Ok(ExtremumKind::Minimum),
        "max" | "maximum" => Ok(ExtremumKind::Maximum),
        other => bail!("Unknown extremum kind '{}', expected 'min' or 'max'", other),
    }
}

/// Golden-section search. With `global` the interval is split into cells and
/// the best local result is kept.
#[wasm_bindgen]
pub fn find_extremum(
    formula: &str,
    a: f64,
    b: f64,
    epsilon: f64,
    kind: &str,
    global: bool,
) -> Result<JsValue, JsValue> {
    let kind = parse_kind(kind).map_err(js_error)?;
    let function = compile(formula).map_err(js_error)?;
    let settings = GoldenSectionSettings::with_epsilon(epsilon);

    let result = if global {
        golden_section::find_global_extremum(&function, a, b, kind, &settings)
    } else {
        golden_section::find_extremum(&function, a, b, kind, &settings)
    }
    .context("Golden-section search failed")
    .map_err(js_error)?;

    serialize(&result)
}

#[derive(Serialize)]
struct NewtonPayload {
    message: String,
    #[serde(flatten)]
    result: NewtonResult,
}

pub(crate) fn run_newton(
    formula: &str,
    x0: f64,
    a: f64,
    b: f64,
    settings: &NewtonSettings,
) -> anyhow::Result<NewtonResult> {
    let function = compile(formula)?;
    newton::minimize(&function, x0, a, b, settings).context("Newton minimization failed")
}

/// Newton minimization on `[a, b]` from `x0`. The payload carries the full
/// per-iteration trace for step-by-step display.
#[wasm_bindgen]
pub fn newton_minimize(
    formula: &str,
    x0: f64,
    a: f64,
    b: f64,
    epsilon: f64,
    max_iterations: u32,
) -> Result<JsValue, JsValue> {
    let settings = NewtonSettings {
        epsilon,
        max_iterations: max_iterations as usize,
        track_steps: true,
        ..NewtonSettings::default()
    };
    let result = run_newton(formula, x0, a, b, &settings).map_err(js_error)?;
    let payload = NewtonPayload {
        message: result.message(),
        result,
    };
    serialize(&payload)
}

/// Lowest node of a uniform scan, as a starting point for [`newton_minimize`].
#[wasm_bindgen]
pub fn suggest_newton_start(formula: &str, a: f64, b: f64) -> Result<f64, JsValue> {
    let function = compile(formula).map_err(js_error)?;
    let points = NewtonSettings::default().scan_points;
    Ok(newton::suggest_start(&function, a, b, points))
}
