//! Trend + seasonal-harmonic regression.
//!
//! The model for an observation at 1-based series position `t` and
//! fractional-year time `τ` is
//!
//! ```text
//! y ≈ a + b·t + Σ_{j=1..k} (c_j·cos(2πjτ) + d_j·sin(2πjτ))
//! ```
//!
//! Since `τ` advances by `1 / frequency` per position this is the same as
//! using `2πj·t / frequency`, up to a phase absorbed by the coefficients.

mod design;
mod fit;
mod ols;

pub use design::{design_matrix, design_row, RegressionData};
pub use fit::HarmonicFit;
pub use ols::{ols, recursive_residuals, OlsSolution, RecursiveLeastSquares, RecursiveResiduals};
