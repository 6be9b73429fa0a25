//! The `numkit_core` crate is the numerical engine behind the Numkit toolkit.
//! It is a pure library: callers supply formulas, intervals, matrices and
//! arrays, and get plain result records back.
//!
//! Key components:
//! - **Equation Engine**: Parses `f(x)` formulas into bytecode for a small stack VM.
//! - **Root and extremum finders**: Bisection with multi-root segmentation, golden-section search.
//! - **Newton**: Bounded Newton minimization with a fallback candidate scan.
//! - **Linear**: Gaussian elimination, Gauss-Jordan and Cramer's rule on `nalgebra` matrices.
//! - **Sorting**: Five instrumented in-place sorts.
pub mod bisection;
pub mod equation_engine;
pub mod error;
pub mod generate;
pub mod golden_section;
pub mod linear;
pub mod newton;
pub mod probe;
pub mod sorting;
pub mod timing;
pub mod traits;

pub use equation_engine::Function;
pub use error::{MathError, Result};
pub use traits::{Scalar, ScalarFunction};
