//! Dense solvers for `A * x = B` with a square `A`.
//!
//! Gaussian elimination and Gauss-Jordan divide by whatever pivot they
//! meet unless a pivot guard is configured, so a singular `A` yields
//! non-finite output rather than an error. Cramer's rule always checks the
//! determinant first.

use crate::error::{MathError, Result};
use crate::timing::{duration_ms, Stopwatch};
use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `|det(A)|` below this makes Cramer's rule fail.
pub const SINGULAR_THRESHOLD: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearMethod {
    Gauss,
    GaussJordan,
    Cramer,
}

impl LinearMethod {
    pub fn name(self) -> &'static str {
        match self {
            LinearMethod::Gauss => "Gaussian elimination",
            LinearMethod::GaussJordan => "Gauss-Jordan elimination",
            LinearMethod::Cramer => "Cramer's rule",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeterminantMethod {
    /// Recursive expansion along the first row.
    #[default]
    Cofactor,
    /// Product of the LU diagonal.
    Lu,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SolveSettings {
    /// Fail with [`MathError::DegeneratePivot`] when a pivot's magnitude is
    /// below this value. `None` divides unconditionally.
    pub pivot_guard: Option<f64>,
    /// Determinant used by Cramer's rule.
    pub determinant: DeterminantMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSolution {
    pub x: Vec<f64>,
    pub method: LinearMethod,
    #[serde(with = "duration_ms", rename = "elapsed_ms")]
    pub elapsed: Duration,
}

/// Builds an `n x n` matrix from row-major data.
pub fn matrix_from_rows(n: usize, data: &[f64]) -> Result<DMatrix<f64>> {
    if data.len() != n * n {
        return Err(MathError::argument(format!(
            "expected {} matrix entries for a {n}x{n} system, got {}",
            n * n,
            data.len()
        )));
    }
    Ok(DMatrix::from_row_slice(n, n, data))
}

fn validate(a: &DMatrix<f64>, b: &[f64]) -> Result<usize> {
    let n = a.nrows();
    if n == 0 {
        return Err(MathError::argument("system has zero dimension"));
    }
    if a.ncols() != n {
        return Err(MathError::argument(format!(
            "matrix must be square, got {}x{}",
            n,
            a.ncols()
        )));
    }
    if b.len() != n {
        return Err(MathError::argument(format!(
            "right-hand side length mismatch: expected {n}, got {}",
            b.len()
        )));
    }
    Ok(n)
}

/// `[A | B]` as an `n x (n + 1)` matrix.
fn augmented(a: &DMatrix<f64>, b: &[f64]) -> DMatrix<f64> {
    let n = a.nrows();
    let mut m = DMatrix::zeros(n, n + 1);
    m.view_mut((0, 0), (n, n)).copy_from(a);
    m.set_column(n, &DVector::from_column_slice(b));
    m
}

fn check_pivot(pivot: f64, column: usize, settings: &SolveSettings) -> Result<()> {
    match settings.pivot_guard {
        Some(tolerance) if !(pivot.abs() >= tolerance) => {
            Err(MathError::DegeneratePivot { column, pivot })
        }
        _ => Ok(()),
    }
}

/// Gaussian elimination with partial pivoting and back substitution.
pub fn gauss(a: &DMatrix<f64>, b: &[f64], settings: &SolveSettings) -> Result<Vec<f64>> {
    let n = validate(a, b)?;
    let mut m = augmented(a, b);

    for k in 0..n {
        let mut max_row = k;
        let mut max_val = m[(k, k)].abs();
        for i in k + 1..n {
            if m[(i, k)].abs() > max_val {
                max_val = m[(i, k)].abs();
                max_row = i;
            }
        }
        if max_row != k {
            m.swap_rows(k, max_row);
        }
        check_pivot(m[(k, k)], k, settings)?;

        for i in k + 1..n {
            let factor = m[(i, k)] / m[(k, k)];
            for j in k..=n {
                m[(i, j)] -= factor * m[(k, j)];
            }
        }
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = m[(i, n)];
        for j in i + 1..n {
            sum -= m[(i, j)] * x[j];
        }
        x[i] = sum / m[(i, i)];
    }
    Ok(x)
}

/// Gauss-Jordan elimination: each pivot row is normalized in place and its
/// column cleared from every other row, leaving the solution in the last
/// column. Pivots are taken from the diagonal without row exchanges.
pub fn gauss_jordan(a: &DMatrix<f64>, b: &[f64], settings: &SolveSettings) -> Result<Vec<f64>> {
    let n = validate(a, b)?;
    let mut m = augmented(a, b);

    for k in 0..n {
        let divisor = m[(k, k)];
        check_pivot(divisor, k, settings)?;
        for j in k..=n {
            m[(k, j)] /= divisor;
        }

        for i in 0..n {
            if i == k {
                continue;
            }
            let factor = m[(i, k)];
            for j in k..=n {
                m[(i, j)] -= factor * m[(k, j)];
            }
        }
    }

    Ok(m.column(n).iter().copied().collect())
}

/// Determinant by recursive cofactor expansion along the first row.
pub fn determinant_cofactor(a: &DMatrix<f64>) -> f64 {
    let n = a.nrows();
    if n == 0 {
        return 1.0;
    }
    let cols: Vec<usize> = (0..n).collect();
    cofactor_expansion(a, 0, &cols)
}

/// Determinant of the minor made of rows `row..` and the listed columns.
fn cofactor_expansion(m: &DMatrix<f64>, row: usize, cols: &[usize]) -> f64 {
    match cols.len() {
        1 => m[(row, cols[0])],
        2 => m[(row, cols[0])] * m[(row + 1, cols[1])] - m[(row, cols[1])] * m[(row + 1, cols[0])],
        len => {
            let mut minor = Vec::with_capacity(len - 1);
            let mut det = 0.0;
            for (j, &col) in cols.iter().enumerate() {
                minor.clear();
                minor.extend(cols.iter().copied().filter(|&c| c != col));
                let sign = if j % 2 == 0 { 1.0 } else { -1.0 };
                det += sign * m[(row, col)] * cofactor_expansion(m, row + 1, &minor);
            }
            det
        }
    }
}

pub fn determinant_lu(a: &DMatrix<f64>) -> f64 {
    a.clone().lu().determinant()
}

pub fn determinant(a: &DMatrix<f64>, method: DeterminantMethod) -> f64 {
    match method {
        DeterminantMethod::Cofactor => determinant_cofactor(a),
        DeterminantMethod::Lu => determinant_lu(a),
    }
}

/// Cramer's rule: `x_i = det(A_i) / det(A)` where `A_i` is `A` with column
/// `i` replaced by `B`. Fails with [`MathError::SingularMatrix`] when
/// `|det(A)| < 1e-12`.
///
/// With [`DeterminantMethod::Cofactor`] the cost grows factorially with `n`.
pub fn cramer(a: &DMatrix<f64>, b: &[f64], method: DeterminantMethod) -> Result<Vec<f64>> {
    let n = validate(a, b)?;
    let main = determinant(a, method);
    if !(main.abs() >= SINGULAR_THRESHOLD) {
        return Err(MathError::SingularMatrix { determinant: main });
    }

    let rhs = DVector::from_column_slice(b);
    let mut x = Vec::with_capacity(n);
    for i in 0..n {
        let mut replaced = a.clone();
        replaced.set_column(i, &rhs);
        x.push(determinant(&replaced, method) / main);
    }
    Ok(x)
}

/// Solves with the chosen method and measures the wall time.
pub fn solve(
    method: LinearMethod,
    a: &DMatrix<f64>,
    b: &[f64],
    settings: &SolveSettings,
) -> Result<LinearSolution> {
    let watch = Stopwatch::start();
    let x = match method {
        LinearMethod::Gauss => gauss(a, b, settings)?,
        LinearMethod::GaussJordan => gauss_jordan(a, b, settings)?,
        LinearMethod::Cramer => cramer(a, b, settings.determinant)?,
    };
    let elapsed = watch.elapsed();
    debug!(
        "{} solved a {}x{} system in {:?}",
        method.name(),
        a.nrows(),
        a.ncols(),
        elapsed
    );
    Ok(LinearSolution { x, method, elapsed })
}

/// `‖A·x − B‖₂`.
pub fn residual_norm(a: &DMatrix<f64>, x: &[f64], b: &[f64]) -> Result<f64> {
    let n = validate(a, b)?;
    if x.len() != n {
        return Err(MathError::argument(format!(
            "solution length mismatch: expected {n}, got {}",
            x.len()
        )));
    }
    let residual = a * DVector::from_column_slice(x) - DVector::from_column_slice(b);
    Ok(residual.norm())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DMatrix<f64>, Vec<f64>) {
        // Solution (2, 3, -1).
        let a = matrix_from_rows(3, &[2.0, 1.0, -1.0, -3.0, -1.0, 2.0, -2.0, 1.0, 2.0]).unwrap();
        let b = vec![8.0, -11.0, -3.0];
        (a, b)
    }

    fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < tol, "{actual:?} vs {expected:?}");
        }
    }

    #[test]
    fn all_methods_solve_sample_system() {
        let (a, b) = sample();
        let settings = SolveSettings::default();
        let expected = [2.0, 3.0, -1.0];
        assert_close(&gauss(&a, &b, &settings).unwrap(), &expected, 1e-12);
        assert_close(&gauss_jordan(&a, &b, &settings).unwrap(), &expected, 1e-12);
        assert_close(&cramer(&a, &b, DeterminantMethod::Cofactor).unwrap(), &expected, 1e-12);
        assert_close(&cramer(&a, &b, DeterminantMethod::Lu).unwrap(), &expected, 1e-12);
    }

    #[test]
    fn gauss_pivots_past_a_zero_diagonal() {
        let a = matrix_from_rows(2, &[0.0, 1.0, 1.0, 0.0]).unwrap();
        let x = gauss(&a, &[2.0, 3.0], &SolveSettings::default()).unwrap();
        assert_close(&x, &[3.0, 2.0], 1e-15);
    }

    #[test]
    fn gauss_jordan_without_guard_returns_non_finite_on_zero_pivot() {
        let a = matrix_from_rows(2, &[0.0, 1.0, 1.0, 0.0]).unwrap();
        let x = gauss_jordan(&a, &[2.0, 3.0], &SolveSettings::default()).unwrap();
        assert!(x.iter().any(|v| !v.is_finite()));
    }

    #[test]
    fn pivot_guard_reports_degenerate_column() {
        let a = matrix_from_rows(2, &[1.0, 2.0, 2.0, 4.0]).unwrap();
        let settings = SolveSettings {
            pivot_guard: Some(1e-12),
            ..SolveSettings::default()
        };
        match gauss(&a, &[1.0, 2.0], &settings) {
            Err(MathError::DegeneratePivot { column, .. }) => assert_eq!(column, 1),
            other => panic!("expected DegeneratePivot, got {other:?}"),
        }
        assert!(matches!(
            gauss_jordan(&a, &[1.0, 2.0], &settings),
            Err(MathError::DegeneratePivot { column: 1, .. })
        ));
    }

    #[test]
    fn singular_matrix_fails_cramer_but_not_gauss() {
        let a = matrix_from_rows(2, &[1.0, 2.0, 2.0, 4.0]).unwrap();
        let b = [1.0, 2.0];
        assert!(matches!(
            cramer(&a, &b, DeterminantMethod::Cofactor),
            Err(MathError::SingularMatrix { .. })
        ));
        assert!(gauss(&a, &b, &SolveSettings::default()).is_ok());
    }

    #[test]
    fn cofactor_matches_lu_determinant() {
        let a = matrix_from_rows(
            4,
            &[
                3.0, 2.0, -1.0, 4.0, 2.0, 1.0, 5.0, 7.0, 0.0, 5.0, 2.0, -6.0, -1.0, 2.0, 1.0, 0.0,
            ],
        )
        .unwrap();
        let cofactor = determinant_cofactor(&a);
        let lu = determinant_lu(&a);
        assert!((cofactor - lu).abs() < 1e-9, "{cofactor} vs {lu}");
        assert_eq!(determinant_cofactor(&matrix_from_rows(1, &[5.0]).unwrap()), 5.0);
        assert_eq!(
            determinant_cofactor(&matrix_from_rows(2, &[1.0, 2.0, 3.0, 4.0]).unwrap()),
            -2.0
        );
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        let (a, _) = sample();
        assert!(gauss(&a, &[1.0, 2.0], &SolveSettings::default()).is_err());
        assert!(matrix_from_rows(3, &[1.0; 8]).is_err());
        let rect = DMatrix::from_row_slice(2, 3, &[1.0; 6]);
        assert!(cramer(&rect, &[1.0, 2.0], DeterminantMethod::Lu).is_err());
        let empty = DMatrix::<f64>::zeros(0, 0);
        assert!(gauss_jordan(&empty, &[], &SolveSettings::default()).is_err());
    }

    #[test]
    fn solve_dispatches_and_reports_method() {
        let (a, b) = sample();
        let solution = solve(LinearMethod::GaussJordan, &a, &b, &SolveSettings::default()).unwrap();
        assert_eq!(solution.method, LinearMethod::GaussJordan);
        assert!(residual_norm(&a, &solution.x, &b).unwrap() < 1e-12);
    }
}
