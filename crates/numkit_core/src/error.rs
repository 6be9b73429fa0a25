//! Error taxonomy shared by every numerical routine in the crate.
//!
//! Only hard failures live here. Outcomes a caller is expected to branch on
//! (no sign change on a bracket, an iteration cap reached on a soft path) are
//! reported through the result records of the individual modules instead.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MathError {
    /// Malformed formula, unknown function name or wrong arity.
    #[error("parse error at position {position}: {message}")]
    Parse { message: String, position: usize },

    /// Invalid numeric preconditions such as `a >= b` or `epsilon <= 0`.
    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("matrix is singular (|det| = {determinant:e}); Cramer's rule is not applicable")]
    SingularMatrix { determinant: f64 },

    #[error("pivot in column {column} is degenerate ({pivot:e})")]
    DegeneratePivot { column: usize, pivot: f64 },

    #[error("maximum number of iterations ({limit}) exceeded")]
    IterationLimit { limit: usize },
}

impl MathError {
    pub(crate) fn argument(message: impl Into<String>) -> Self {
        MathError::Argument(message.into())
    }

    pub(crate) fn parse(message: impl Into<String>, position: usize) -> Self {
        MathError::Parse {
            message: message.into(),
            position,
        }
    }
}

pub type Result<T> = std::result::Result<T, MathError>;

/// Shared precondition for every interval search.
pub(crate) fn check_interval(a: f64, b: f64, epsilon: f64) -> Result<()> {
    if !a.is_finite() || !b.is_finite() {
        return Err(MathError::argument("interval bounds must be finite"));
    }
    if a >= b {
        return Err(MathError::argument(format!(
            "interval [{a}, {b}] is invalid: a must be less than b"
        )));
    }
    if !(epsilon > 0.0) {
        return Err(MathError::argument(format!(
            "epsilon must be positive, got {epsilon}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_interval_rejects_reversed_bounds() {
        let err = check_interval(2.0, 1.0, 1e-3).unwrap_err();
        assert!(format!("{err}").contains("a must be less than b"));
    }

    #[test]
    fn check_interval_rejects_non_positive_and_nan_epsilon() {
        assert!(check_interval(0.0, 1.0, 0.0).is_err());
        assert!(check_interval(0.0, 1.0, -1.0).is_err());
        assert!(check_interval(0.0, 1.0, f64::NAN).is_err());
        assert!(check_interval(0.0, 1.0, 1e-9).is_ok());
    }

    #[test]
    fn check_interval_rejects_infinite_bounds() {
        assert!(check_interval(f64::NEG_INFINITY, 1.0, 1e-3).is_err());
    }

    #[test]
    fn singular_matrix_message_mentions_cramer() {
        let err = MathError::SingularMatrix { determinant: 0.0 };
        assert!(format!("{err}").contains("Cramer"));
    }
}
