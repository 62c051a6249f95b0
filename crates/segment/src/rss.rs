use harmonic::{ols, RecursiveLeastSquares};
use nalgebra::{DMatrix, DVector};

/// Smallest accepted `X'X` singular-value ratio for a row seed; worse seeds
/// are grown one observation at a time.
const SEED_CONDITION_LIMIT: f64 = 1e-8;

/// Residual sums of squares of every admissible segment `i..=j`.
///
/// Row `i` is seeded by an SVD fit of its first `min_segment` rows and then
/// extended by recursive least squares, so building the table costs
/// O(n² p²).
#[derive(Debug, Clone)]
pub struct RssTable {
    n: usize,
    min_segment: usize,
    rows: Vec<Vec<f64>>,
}

impl RssTable {
    pub fn new(x: &DMatrix<f64>, y: &DVector<f64>, min_segment: usize) -> Self {
        let n = x.nrows();
        let p = x.ncols();
        let min_segment = min_segment.max(p.max(1));
        let x = rescale_columns(x);
        let rows = (0..n)
            .map(|i| {
                if i + min_segment > n {
                    return Vec::new();
                }
                segment_rss_from(&x, y, i, min_segment)
            })
            .collect();
        Self {
            n,
            min_segment,
            rows,
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn min_segment(&self) -> usize {
        self.min_segment
    }

    /// RSS of observations `i..=j`; infinite when the segment is too short.
    pub fn rss(&self, i: usize, j: usize) -> f64 {
        if j >= self.n || j + 1 < i + self.min_segment {
            return f64::INFINITY;
        }
        self.rows[i][j + 1 - i - self.min_segment]
    }
}

/// Centre non-constant columns when an intercept is present and scale every
/// column to unit maximum. The column space, and so every RSS, is unchanged.
fn rescale_columns(x: &DMatrix<f64>) -> DMatrix<f64> {
    let is_constant = |c: usize| {
        let col = x.column(c);
        col.iter().all(|v| *v == col[0])
    };
    let has_intercept =
        x.nrows() > 0 && (0..x.ncols()).any(|c| is_constant(c) && x[(0, c)] != 0.0);

    let mut out = x.clone();
    for c in 0..out.ncols() {
        if has_intercept && !is_constant(c) {
            let mean = out.column(c).mean();
            out.column_mut(c).add_scalar_mut(-mean);
        }
        let scale = out.column(c).amax();
        if scale > 0.0 {
            out.column_mut(c).scale_mut(1.0 / scale);
        }
    }
    out
}

/// RSS of `i..=j` for every `j` with at least `h` observations.
fn segment_rss_from(x: &DMatrix<f64>, y: &DVector<f64>, i: usize, h: usize) -> Vec<f64> {
    let n = x.nrows();
    let mut out = Vec::with_capacity(n - i - h + 1);

    // Grow the seed until it is well conditioned; shorter prefixes use SVD.
    let mut len = h;
    let mut rls = loop {
        let seed_x = x.rows(i, len).into_owned();
        let seed_y = y.rows(i, len).into_owned();
        let seed = RecursiveLeastSquares::initialize_with_limit(&seed_x, &seed_y, SEED_CONDITION_LIMIT);
        if seed.is_some() {
            break seed;
        }
        out.push(ols(&seed_x, &seed_y).map(|s| s.rss).unwrap_or(f64::INFINITY));
        if i + len == n {
            break None;
        }
        len += 1;
    };

    if let Some(r) = rls.as_mut() {
        out.push(r.rss().max(0.0));
        for j in i + len..n {
            r.update(&x.row(j).transpose(), y[j]);
            out.push(r.rss().max(0.0));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use common::ModelTerms;
    use harmonic::{design_matrix, RegressionData};
    use std::f64::consts::PI;

    fn line_design(n: usize) -> DMatrix<f64> {
        DMatrix::from_fn(n, 2, |r, c| if c == 0 { 1.0 } else { r as f64 })
    }

    #[test]
    fn test_matches_direct_ols() {
        let n = 24;
        let x = line_design(n);
        let y = DVector::from_fn(n, |r, _| ((r * 5) % 7) as f64 * 0.1 + 0.02 * r as f64);
        let table = RssTable::new(&x, &y, 4);

        for (i, j) in [(0, 3), (0, 23), (5, 17), (20, 23)] {
            let len = j + 1 - i;
            let direct = ols(&x.rows(i, len).into_owned(), &y.rows(i, len).into_owned())
                .unwrap()
                .rss;
            assert_relative_eq!(table.rss(i, j), direct, epsilon = 1e-9);
        }
    }

    fn harmonic_design(years: usize, terms: ModelTerms) -> (DMatrix<f64>, DVector<f64>) {
        let n = years * 23;
        let data = RegressionData {
            positions: (0..n).collect(),
            times: (0..n).map(|i| 2001.0 + i as f64 / 23.0).collect(),
            values: (0..n)
                .map(|i| {
                    let tau = i as f64 / 23.0;
                    // Deterministic pseudo-noise, roughly symmetric around zero.
                    let e = ((i * 7919 + 13) % 101) as f64 / 101.0 - 0.5;
                    0.5 + 0.15 * (2.0 * PI * tau).cos() + 0.05 * e
                })
                .collect(),
        };
        (design_matrix(&terms, &data), data.response())
    }

    fn assert_matches_ols(x: &DMatrix<f64>, y: &DVector<f64>, table: &RssTable, pairs: &[(usize, usize)]) {
        for &(i, j) in pairs {
            let len = j + 1 - i;
            let direct = ols(&x.rows(i, len).into_owned(), &y.rows(i, len).into_owned())
                .unwrap()
                .rss;
            assert_relative_eq!(table.rss(i, j), direct, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_order_three_matches_direct_ols() {
        let (x, y) = harmonic_design(8, ModelTerms::new(3, true));
        let table = RssTable::new(&x, &y, 27);
        assert_matches_ols(&x, &y, &table, &[(0, 26), (0, 135), (0, 183), (136, 183), (50, 120)]);
    }

    #[test]
    fn test_order_three_long_series_matches_direct_ols() {
        let (x, y) = harmonic_design(20, ModelTerms::new(3, true));
        let table = RssTable::new(&x, &y, 69);
        assert_matches_ols(&x, &y, &table, &[(0, 459), (0, 390), (391, 459), (100, 300)]);
    }

    #[test]
    fn test_rescale_keeps_column_space() {
        let (x, y) = harmonic_design(2, ModelTerms::new(2, true));
        let scaled = rescale_columns(&x);
        assert_relative_eq!(ols(&scaled, &y).unwrap().rss, ols(&x, &y).unwrap().rss, max_relative = 1e-9);
        for c in 0..scaled.ncols() {
            assert!(scaled.column(c).amax() <= 1.0 + 1e-12);
        }
    }

    #[test]
    fn test_short_segments_are_infinite() {
        let x = line_design(10);
        let y = DVector::from_element(10, 1.0);
        let table = RssTable::new(&x, &y, 3);
        assert!(table.rss(0, 1).is_infinite());
        assert!(table.rss(8, 9).is_infinite());
        assert!(table.rss(7, 10).is_infinite());
        assert!(table.rss(7, 9).is_finite());
    }

    #[test]
    fn test_collinear_start_falls_back() {
        // First rows share the same regressors; the seed cannot be inverted.
        let x = DMatrix::from_fn(8, 2, |r, c| if c == 0 { 1.0 } else { r.saturating_sub(3) as f64 });
        let y = DVector::from_fn(8, |r, _| r as f64);
        let table = RssTable::new(&x, &y, 3);
        assert!(table.rss(0, 2).is_finite());
        assert!(table.rss(0, 7).is_finite());
    }
}
