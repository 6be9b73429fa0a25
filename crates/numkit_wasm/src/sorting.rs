//! Sorting exports.

use crate::{js_error, serialize};
use anyhow::{bail, Context};
use fastrand::Rng;
use numkit_core::generate;
use numkit_core::sorting::{self, BogoSettings, SortAlgorithm, SortReport};
use serde::Serialize;
use std::time::Duration;
use wasm_bindgen::prelude::*;

fn parse_algorithm(name: &str, max_attempts: Option<u32>) -> anyhow::Result<SortAlgorithm> {
    Ok(match name {
        "bubble" => SortAlgorithm::Bubble,
        "insertion" => SortAlgorithm::Insertion,
        "shaker" => SortAlgorithm::Shaker,
        "quick" => SortAlgorithm::Quick,
        "bogo" => SortAlgorithm::Bogo(BogoSettings {
            max_attempts: max_attempts.map(u64::from),
        }),
        other => bail!("Unknown sorting algorithm '{}'", other),
    })
}

/// NaN compares false both ways, so it would make any order look sorted.
fn check_values(data: &[f64]) -> anyhow::Result<()> {
    if let Some(index) = data.iter().position(|v| v.is_nan()) {
        bail!("Data must not contain NaN (found at index {}).", index);
    }
    Ok(())
}

#[derive(Serialize)]
struct SortPayload {
    data: Vec<f64>,
    #[serde(flatten)]
    report: SortReport,
}

/// Sorts a copy of `data`. `seed` drives bogosort's shuffles; other
/// algorithms ignore it.
#[wasm_bindgen]
pub fn sort_values(
    algorithm: &str,
    data: Vec<f64>,
    ascending: bool,
    seed: u32,
    max_attempts: Option<u32>,
) -> Result<JsValue, JsValue> {
    let algorithm = parse_algorithm(algorithm, max_attempts).map_err(js_error)?;
    check_values(&data).map_err(js_error)?;
    let mut data = data;
    let mut rng = Rng::with_seed(u64::from(seed));
    let report = sorting::sort(algorithm, &mut data, ascending, &mut rng);
    serialize(&SortPayload { data, report })
}

/// Uniform values in `[min, max)` rounded to `decimals` places.
#[wasm_bindgen]
pub fn random_values(
    seed: u32,
    count: u32,
    min: f64,
    max: f64,
    decimals: u32,
) -> Result<Vec<f64>, JsValue> {
    let mut rng = Rng::with_seed(u64::from(seed));
    generate::random_values(&mut rng, count as usize, min, max, decimals)
        .context("Could not generate values")
        .map_err(js_error)
}

#[derive(Serialize)]
struct BogoProgress {
    done: bool,
    is_sorted: bool,
    iterations: u64,
    max_attempts: Option<u64>,
}

struct BogoState {
    data: Vec<f64>,
    ascending: bool,
    rng: Rng,
    iterations: u64,
    max_attempts: Option<u64>,
    elapsed: Duration,
    sorted: bool,
    done: bool,
}

impl BogoState {
    fn progress(&self) -> BogoProgress {
        BogoProgress {
            done: self.done,
            is_sorted: self.sorted,
            iterations: self.iterations,
            max_attempts: self.max_attempts,
        }
    }

    /// Runs at most `batch_size` shuffles, never passing the overall cap.
    fn advance(&mut self, batch_size: u64) {
        if self.done {
            return;
        }
        let remaining = self
            .max_attempts
            .map_or(batch_size, |max| batch_size.min(max - self.iterations));
        let settings = BogoSettings {
            max_attempts: Some(remaining),
        };
        let report = sorting::bogo_sort(&mut self.data, self.ascending, &settings, &mut self.rng);

        self.iterations += report.iterations;
        self.elapsed += report.elapsed;
        self.sorted = report.is_completed;
        self.done = self.sorted || self.max_attempts.is_some_and(|max| self.iterations >= max);
    }
}

/// Bogosort driven in batches so the UI thread stays responsive.
#[wasm_bindgen]
pub struct WasmBogoRunner {
    state: Option<BogoState>,
}

#[wasm_bindgen]
impl WasmBogoRunner {
    #[wasm_bindgen(constructor)]
    pub fn new(
        data: Vec<f64>,
        ascending: bool,
        seed: u32,
        max_attempts: Option<u32>,
    ) -> Result<WasmBogoRunner, JsValue> {
        console_error_panic_hook::set_once();
        check_values(&data).map_err(js_error)?;

        let sorted = sorting::is_sorted(&data, ascending);
        Ok(WasmBogoRunner {
            state: Some(BogoState {
                data,
                ascending,
                rng: Rng::with_seed(u64::from(seed)),
                iterations: 0,
                max_attempts: max_attempts.map(u64::from),
                elapsed: Duration::ZERO,
                sorted,
                done: sorted || max_attempts == Some(0),
            }),
        })
    }

    pub fn is_done(&self) -> bool {
        self.state.as_ref().map_or(true, |state| state.done)
    }

    pub fn run_steps(&mut self, batch_size: u32) -> Result<JsValue, JsValue> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;
        state.advance(u64::from(batch_size));
        serialize(&state.progress())
    }

    pub fn get_progress(&self) -> Result<JsValue, JsValue> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;
        serialize(&state.progress())
    }

    pub fn get_result(&self) -> Result<JsValue, JsValue> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| JsValue::from_str("Runner not initialized"))?;
        if !state.done {
            return Err(JsValue::from_str("Bogosort is still running."));
        }
        serialize(&SortPayload {
            data: state.data.clone(),
            report: SortReport {
                elapsed: state.elapsed,
                iterations: state.iterations,
                is_completed: state.sorted,
            },
        })
    }
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn runner_result_requires_completion() {
        let data = vec![3.0, 2.0, 1.0, 0.0, -1.0, -2.0, -3.0];
        let runner = WasmBogoRunner::new(data, true, 1, Some(1_000_000)).expect("runner");
        assert!(!runner.is_done());
        assert!(runner.get_result().is_err());
    }

    #[wasm_bindgen_test]
    fn sort_values_rejects_nan() {
        let message = sort_values("bogo", vec![3.0, f64::NAN, 1.0], true, 0, Some(10))
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.contains("NaN"));
    }

    #[wasm_bindgen_test]
    fn sort_values_rejects_unknown_algorithm() {
        let message = sort_values("merge", vec![1.0], true, 0, None)
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.contains("Unknown sorting algorithm"));
    }
}
