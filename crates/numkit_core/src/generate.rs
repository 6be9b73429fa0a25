//! Seeded random inputs for the sorting and linear-system front ends.

use crate::error::{MathError, Result};
use fastrand::Rng;
use nalgebra::DMatrix;

/// Entries of [`random_system`] are drawn from `[-RANGE, RANGE]`.
const RANGE: f64 = 10.0;

/// A square system `a * x = b`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSystem {
    pub a: DMatrix<f64>,
    pub b: Vec<f64>,
}

impl LinearSystem {
    pub fn dimension(&self) -> usize {
        self.b.len()
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

fn uniform(rng: &mut Rng, min: f64, max: f64) -> f64 {
    min + rng.f64() * (max - min)
}

/// `count` values uniform in `[min, max)`, each rounded to `decimals`
/// places.
pub fn random_values(
    rng: &mut Rng,
    count: usize,
    min: f64,
    max: f64,
    decimals: u32,
) -> Result<Vec<f64>> {
    if count == 0 {
        return Err(MathError::argument("count must be positive"));
    }
    if !min.is_finite() || !max.is_finite() {
        return Err(MathError::argument("value range must be finite"));
    }
    if min >= max {
        return Err(MathError::argument(format!(
            "minimum ({min}) must be less than maximum ({max})"
        )));
    }
    if decimals > 15 {
        return Err(MathError::argument(format!(
            "at most 15 decimal places are supported, got {decimals}"
        )));
    }

    Ok((0..count)
        .map(|_| round_to(uniform(rng, min, max), decimals))
        .collect())
}

fn check_dimension(n: usize) -> Result<()> {
    if n == 0 {
        return Err(MathError::argument("system has zero dimension"));
    }
    Ok(())
}

/// Matrix and right-hand side with entries uniform in `[-10, 10]`, rounded to
/// two places. Nothing prevents the matrix from being singular.
pub fn random_system(rng: &mut Rng, n: usize) -> Result<LinearSystem> {
    check_dimension(n)?;
    let a = DMatrix::from_fn(n, n, |_, _| round_to(uniform(rng, -RANGE, RANGE), 2));
    let b = (0..n)
        .map(|_| round_to(uniform(rng, -RANGE, RANGE), 2))
        .collect();
    Ok(LinearSystem { a, b })
}

/// A strictly diagonally dominant system, which every solver handles
/// without pivoting trouble.
pub fn diagonally_dominant_system(rng: &mut Rng, n: usize) -> Result<LinearSystem> {
    check_dimension(n)?;
    let mut a = DMatrix::from_fn(n, n, |_, _| uniform(rng, -1.0, 1.0));
    for i in 0..n {
        let off_diagonal: f64 = (0..n).filter(|&j| j != i).map(|j| a[(i, j)].abs()).sum();
        let sign = if rng.bool() { 1.0 } else { -1.0 };
        a[(i, i)] = sign * (off_diagonal + 1.0 + rng.f64());
    }
    let b = (0..n).map(|_| uniform(rng, -RANGE, RANGE)).collect();
    Ok(LinearSystem { a, b })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_stay_in_range_and_rounded() {
        let mut rng = Rng::with_seed(42);
        let values = random_values(&mut rng, 200, -5.0, 5.0, 3).unwrap();
        assert_eq!(values.len(), 200);
        for v in values {
            assert!((-5.0..=5.0).contains(&v), "{v}");
            assert!(((v * 1000.0).round() - v * 1000.0).abs() < 1e-6, "{v}");
        }
    }

    #[test]
    fn same_seed_same_values() {
        let first = random_values(&mut Rng::with_seed(5), 10, 0.0, 1.0, 3).unwrap();
        let second = random_values(&mut Rng::with_seed(5), 10, 0.0, 1.0, 3).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_bad_arguments() {
        let mut rng = Rng::with_seed(0);
        assert!(random_values(&mut rng, 0, 0.0, 1.0, 3).is_err());
        assert!(random_values(&mut rng, 5, 1.0, 1.0, 3).is_err());
        assert!(random_values(&mut rng, 5, 2.0, 1.0, 3).is_err());
        assert!(random_system(&mut rng, 0).is_err());
    }

    #[test]
    fn random_system_entries_in_range() {
        let mut rng = Rng::with_seed(11);
        let system = random_system(&mut rng, 4).unwrap();
        assert_eq!(system.dimension(), 4);
        assert_eq!(system.a.shape(), (4, 4));
        assert!(system.a.iter().chain(system.b.iter()).all(|v| v.abs() <= RANGE));
    }

    #[test]
    fn dominant_system_is_dominant() {
        let mut rng = Rng::with_seed(8);
        let system = diagonally_dominant_system(&mut rng, 6).unwrap();
        for i in 0..6 {
            let off: f64 = (0..6).filter(|&j| j != i).map(|j| system.a[(i, j)].abs()).sum();
            assert!(system.a[(i, i)].abs() > off + 1.0 - 1e-12);
        }
    }
}
