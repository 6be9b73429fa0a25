//! Browser bindings for `numkit_core`.
//!
//! Every export parses its inputs, calls into the core and returns a
//! serialized result record. Errors cross the boundary as strings.

use anyhow::Context;
use numkit_core::equation_engine::Function;
use numkit_core::probe;
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

mod extremum;
mod linear;
mod roots;
mod sorting;

pub use extremum::{find_extremum, newton_minimize, suggest_newton_start};
pub use linear::{determinant, random_system, solve_linear};
pub use roots::{find_root, find_roots};
pub use sorting::{random_values, sort_values, WasmBogoRunner};

pub(crate) fn js_error(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", err))
}

pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

pub(crate) fn compile(formula: &str) -> anyhow::Result<Function> {
    Function::parse(formula).with_context(|| format!("Invalid formula '{}'", formula))
}

/// A compiled formula kept alive across calls, for plotting and probing.
#[wasm_bindgen]
pub struct WasmFunction {
    function: Function,
}

#[wasm_bindgen]
impl WasmFunction {
    #[wasm_bindgen(constructor)]
    pub fn new(formula: &str) -> Result<WasmFunction, JsValue> {
        console_error_panic_hook::set_once();
        let function = compile(formula).map_err(js_error)?;
        Ok(WasmFunction { function })
    }

    pub fn source(&self) -> String {
        self.function.source().to_string()
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        self.function.evaluate(x)
    }

    /// Samples `count` evenly spaced points of `[a, b]`, interleaved as
    /// `x0, y0, x1, y1, ...`.
    pub fn sample(&self, a: f64, b: f64, count: u32) -> Vec<f64> {
        let count = count.max(2) as usize;
        let step = (b - a) / (count - 1) as f64;
        let mut out = Vec::with_capacity(count * 2);
        for i in 0..count {
            let x = a + step * i as f64;
            out.push(x);
            out.push(self.function.evaluate(x));
        }
        out
    }

    pub fn is_defined_on(&self, a: f64, b: f64) -> bool {
        probe::is_defined_on_interval(&self.function, a, b)
    }

    pub fn is_constant_on(&self, a: f64, b: f64) -> bool {
        probe::is_constant_on_interval(&self.function, a, b)
    }

    pub fn has_sign_change(&self, a: f64, b: f64) -> bool {
        probe::has_sign_change(&self.function, a, b)
    }
}
