use common::{BreakError, Result};
use nalgebra::{DMatrix, DVector};

/// Singular values below this are treated as zero by the SVD solve.
const SVD_EPS: f64 = 1e-10;
/// Smallest accepted ratio of extreme singular values of `X'X`.
const CONDITION_LIMIT: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct OlsSolution {
    pub coefficients: DVector<f64>,
    pub residuals: DVector<f64>,
    pub rss: f64,
}

/// Ordinary least squares via SVD.
///
/// Rank-deficient designs get the minimum-norm solution instead of an error.
pub fn ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<OlsSolution> {
    if x.nrows() != y.len() {
        return Err(BreakError::InvalidInput(format!(
            "design has {} rows but response has {} values",
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() < x.ncols() {
        return Err(BreakError::ModelError(format!(
            "{} observations cannot determine {} coefficients",
            x.nrows(),
            x.ncols()
        )));
    }

    let svd = x.clone().svd(true, true);
    let coefficients = svd
        .solve(y, SVD_EPS)
        .map_err(|e| BreakError::ModelError(e.to_string()))?;
    let residuals = y - x * &coefficients;
    let rss = residuals.norm_squared();

    Ok(OlsSolution {
        coefficients,
        residuals,
        rss,
    })
}

/// Least squares updated one observation at a time.
///
/// Keeps `(X'X)⁻¹`, the coefficients and the running residual sum of
/// squares. Each update costs O(p²).
#[derive(Debug, Clone)]
pub struct RecursiveLeastSquares {
    inverse_gram: DMatrix<f64>,
    beta: DVector<f64>,
    rss: f64,
    n_obs: usize,
}

impl RecursiveLeastSquares {
    /// Start from an exact fit of the given rows.
    ///
    /// Returns `None` when `X'X` is singular or badly conditioned.
    pub fn initialize(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<Self> {
        Self::initialize_with_limit(x, y, CONDITION_LIMIT)
    }

    /// Like [`initialize`](Self::initialize), rejecting seeds whose `X'X`
    /// singular-value ratio falls below `min_ratio`.
    ///
    /// The seed is solved by SVD and `(X'X)⁻¹` is formed as `V Σ⁻² V'`, so
    /// the Gram matrix itself is never inverted.
    pub fn initialize_with_limit(
        x: &DMatrix<f64>,
        y: &DVector<f64>,
        min_ratio: f64,
    ) -> Option<Self> {
        if x.nrows() < x.ncols() || x.nrows() != y.len() || x.ncols() == 0 {
            return None;
        }
        let svd = x.clone().svd(true, true);
        let v_t = svd.v_t.as_ref()?;
        let u = svd.u.as_ref()?;
        let sv = &svd.singular_values;
        let max = sv.max();
        let min = sv.min();
        if !(max > 0.0) || (min / max).powi(2) < min_ratio {
            return None;
        }

        let inv_sq = DVector::from_iterator(sv.len(), sv.iter().map(|s| 1.0 / (s * s)));
        let inverse_gram = v_t.transpose() * DMatrix::from_diagonal(&inv_sq) * v_t;
        let inv = DVector::from_iterator(sv.len(), sv.iter().map(|s| 1.0 / s));
        let beta = v_t.transpose() * inv.component_mul(&(u.transpose() * y));
        let rss = (y - x * &beta).norm_squared();
        Some(Self {
            inverse_gram,
            beta,
            rss,
            n_obs: x.nrows(),
        })
    }

    /// Add one observation and return its standardized recursive residual
    /// `(y - x'β) / sqrt(1 + x'(X'X)⁻¹x)`.
    pub fn update(&mut self, row: &DVector<f64>, y: f64) -> f64 {
        let px = &self.inverse_gram * row;
        let f = 1.0 + row.dot(&px);
        let e = y - row.dot(&self.beta);
        let gain = &px / f;
        self.beta += &gain * e;
        self.inverse_gram -= &gain * px.transpose();
        self.rss += e * e / f;
        self.n_obs += 1;
        e / f.sqrt()
    }

    pub fn rss(&self) -> f64 {
        self.rss
    }

    pub fn coefficients(&self) -> &DVector<f64> {
        &self.beta
    }

    pub fn n_obs(&self) -> usize {
        self.n_obs
    }
}

/// Recursive residuals of a regression.
#[derive(Debug, Clone)]
pub struct RecursiveResiduals {
    /// Row of the first residual; earlier rows seeded the initial fit.
    pub start: usize,
    pub values: Vec<f64>,
}

/// Standardized one-step-ahead prediction errors, row by row.
///
/// The initial fit uses the first `p` rows, or more when those are
/// collinear.
pub fn recursive_residuals(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<RecursiveResiduals> {
    let n = x.nrows();
    let p = x.ncols();
    if n <= p {
        return Err(BreakError::InsufficientData(format!(
            "recursive residuals need more than {p} observations, got {n}"
        )));
    }

    let mut start = p;
    let mut rls = loop {
        if start >= n {
            return Err(BreakError::ModelError(
                "design matrix never reaches full rank".into(),
            ));
        }
        let seed_x = x.rows(0, start).into_owned();
        let seed_y = y.rows(0, start).into_owned();
        if let Some(rls) = RecursiveLeastSquares::initialize(&seed_x, &seed_y) {
            break rls;
        }
        start += 1;
    };

    let values = (start..n)
        .map(|r| rls.update(&x.row(r).transpose(), y[r]))
        .collect();

    Ok(RecursiveResiduals { start, values })
}
