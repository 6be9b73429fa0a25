//! Linear-system exports. Matrices cross the boundary as row-major arrays.

use crate::{js_error, serialize};
use anyhow::{bail, Context};
use fastrand::Rng;
use numkit_core::generate;
use numkit_core::linear::{self, DeterminantMethod, LinearMethod, SolveSettings};
use serde::Serialize;
use wasm_bindgen::prelude::*;

fn parse_method(name: &str) -> anyhow::Result<LinearMethod> {
    match name {
        "gauss" => Ok(LinearMethod::Gauss),
        "gauss_jordan" | "jordan" => Ok(LinearMethod::GaussJordan),
        "cramer" => Ok(LinearMethod::Cramer),
        other => bail!("Unknown method '{}'", other),
    }
}

fn parse_determinant(name: Option<String>) -> anyhow::Result<DeterminantMethod> {
    match name.as_deref() {
        None | Some("cofactor") => Ok(DeterminantMethod::Cofactor),
        Some("lu") => Ok(DeterminantMethod::Lu),
        Some(other) => bail!("Unknown determinant method '{}'", other),
    }
}

pub(crate) fn run_solve(
    method: &str,
    n: usize,
    matrix: &[f64],
    rhs: &[f64],
    settings: &SolveSettings,
) -> anyhow::Result<linear::LinearSolution> {
    let method = parse_method(method)?;
    let a = linear::matrix_from_rows(n, matrix).context("Invalid matrix")?;
    linear::solve(method, &a, rhs, settings)
        .with_context(|| format!("{} failed", method.name()))
}

/// Solves an `n x n` system. `pivot_guard` enables the degenerate-pivot
/// check for the elimination methods.
#[wasm_bindgen]
pub fn solve_linear(
    method: &str,
    n: u32,
    matrix: Vec<f64>,
    rhs: Vec<f64>,
    pivot_guard: Option<f64>,
    determinant: Option<String>,
) -> Result<JsValue, JsValue> {
    let settings = SolveSettings {
        pivot_guard,
        determinant: parse_determinant(determinant).map_err(js_error)?,
    };
    let solution = run_solve(method, n as usize, &matrix, &rhs, &settings).map_err(js_error)?;
    serialize(&solution)
}

#[wasm_bindgen]
pub fn determinant(n: u32, matrix: Vec<f64>, method: Option<String>) -> Result<f64, JsValue> {
    let method = parse_determinant(method).map_err(js_error)?;
    let a = linear::matrix_from_rows(n as usize, &matrix)
        .context("Invalid matrix")
        .map_err(js_error)?;
    Ok(linear::determinant(&a, method))
}

#[derive(Serialize)]
struct SystemPayload {
    n: usize,
    matrix: Vec<f64>,
    rhs: Vec<f64>,
}

/// Random system with entries in `[-10, 10]`, rounded to two places.
#[wasm_bindgen]
pub fn random_system(seed: u32, n: u32) -> Result<JsValue, JsValue> {
    let mut rng = Rng::with_seed(u64::from(seed));
    let system = generate::random_system(&mut rng, n as usize)
        .context("Could not generate system")
        .map_err(js_error)?;
    // nalgebra stores columns; the UI expects rows.
    let matrix = system.a.transpose().as_slice().to_vec();
    serialize(&SystemPayload {
        n: system.dimension(),
        matrix,
        rhs: system.b,
    })
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn determinant_of_identity() {
        let det = determinant(2, vec![1.0, 0.0, 0.0, 1.0], None).expect("det");
        assert_eq!(det, 1.0);
    }

    #[wasm_bindgen_test]
    fn solve_linear_rejects_short_matrix() {
        let message = solve_linear("gauss", 2, vec![1.0; 3], vec![1.0, 2.0], None, None)
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.contains("Invalid matrix"));
    }
}
