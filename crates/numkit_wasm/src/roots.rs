//! Bisection exports.

use crate::{compile, js_error, serialize};
use anyhow::Context;
use numkit_core::bisection::{self, BisectionSettings, RootSearch};
use wasm_bindgen::prelude::*;

pub(crate) fn run_find_roots(
    formula: &str,
    a: f64,
    b: f64,
    settings: &BisectionSettings,
) -> anyhow::Result<RootSearch> {
    let function = compile(formula)?;
    bisection::find_roots(&function, a, b, settings)
        .with_context(|| format!("Root search on [{}, {}] failed", a, b))
}

/// Scans `[a, b]` for up to `max_roots` roots (10 when omitted). The
/// payload's `outcome` field is `roots` or `no_sign_change`.
#[wasm_bindgen]
pub fn find_roots(
    formula: &str,
    a: f64,
    b: f64,
    epsilon: f64,
    max_roots: Option<u32>,
) -> Result<JsValue, JsValue> {
    let mut settings = BisectionSettings::with_epsilon(epsilon);
    if let Some(max_roots) = max_roots {
        settings.max_roots = max_roots as usize;
    }

    let search = run_find_roots(formula, a, b, &settings).map_err(js_error)?;
    serialize(&search)
}

/// Single bracketed root; `f(a)` and `f(b)` must differ in sign.
#[wasm_bindgen]
pub fn find_root(formula: &str, a: f64, b: f64, epsilon: f64) -> Result<JsValue, JsValue> {
    let function = compile(formula).map_err(js_error)?;
    let root = bisection::find_root(&function, a, b, epsilon)
        .context("Bisection failed")
        .map_err(js_error)?;
    serialize(&root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_find_roots_reports_no_sign_change() {
        let settings = BisectionSettings::default();
        let search = run_find_roots("pow(x, 2) + 1", -1.0, 1.0, &settings).expect("search");
        assert!(matches!(search, RootSearch::NoSignChange { .. }));
    }

    #[test]
    fn run_find_roots_wraps_argument_errors() {
        let settings = BisectionSettings::default();
        let err = run_find_roots("x", 1.0, -1.0, &settings)
            .err()
            .expect("reversed interval");
        let message = format!("{:#}", err);
        assert!(message.contains("Root search on [1, -1] failed"), "{message}");
        assert!(message.contains("a must be less than b"), "{message}");
    }
}
