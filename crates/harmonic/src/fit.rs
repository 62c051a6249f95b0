use common::{BreakError, ModelTerms, Result};
use nalgebra::DVector;
use tracing::debug;

use crate::design::{design_matrix, design_row, RegressionData};
use crate::ols::ols;

/// Coefficients of a trend + harmonic model, frozen after fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonicFit {
    pub terms: ModelTerms,
    pub coefficients: Vec<f64>,
    pub rss: f64,
    /// Residual standard error `sqrt(rss / (n - p))`; zero for exact fits.
    pub sigma: f64,
    pub n_obs: usize,
}

impl HarmonicFit {
    /// Least-squares fit on the given observations.
    ///
    /// Needs at least as many observations as coefficients; callers that
    /// want a degrees-of-freedom margin check `ModelTerms::min_observations`.
    pub fn fit(terms: ModelTerms, data: &RegressionData) -> Result<Self> {
        let p = terms.parameter_count();
        if data.len() < p {
            return Err(BreakError::InsufficientData(format!(
                "{} observations cannot fit {} coefficients",
                data.len(),
                p
            )));
        }

        let x = design_matrix(&terms, data);
        let solution = ols(&x, &data.response())?;
        let n = data.len();
        let sigma = if n > p {
            (solution.rss / (n - p) as f64).sqrt()
        } else {
            0.0
        };

        debug!(
            n_obs = n,
            params = p,
            rss = solution.rss,
            sigma = sigma,
            "Harmonic model fitted"
        );

        Ok(Self {
            terms,
            coefficients: solution.coefficients.iter().copied().collect(),
            rss: solution.rss,
            sigma,
            n_obs: n,
        })
    }

    /// Model value at a series position and fractional-year time.
    pub fn predict(&self, position: usize, time: f64) -> f64 {
        let row = DVector::from_vec(design_row(&self.terms, position, time));
        row.dot(&DVector::from_column_slice(&self.coefficients))
    }

    pub fn predict_data(&self, data: &RegressionData) -> Vec<f64> {
        data.positions
            .iter()
            .zip(&data.times)
            .map(|(pos, t)| self.predict(*pos, *t))
            .collect()
    }

    /// Observed minus predicted for every observation in `data`.
    pub fn residuals(&self, data: &RegressionData) -> Vec<f64> {
        self.predict_data(data)
            .iter()
            .zip(&data.values)
            .map(|(pred, obs)| obs - pred)
            .collect()
    }

    /// Seasonal amplitude of each harmonic, `sqrt(c_j² + d_j²)`.
    pub fn amplitudes(&self) -> Vec<f64> {
        let offset = 1 + usize::from(self.terms.trend);
        self.coefficients[offset..]
            .chunks(2)
            .map(|cs| cs[0].hypot(cs[1]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use common::RegularSeries;
    use std::f64::consts::PI;

    fn seasonal_series(years: usize, missing_every: Option<usize>) -> RegularSeries {
        let freq = 23;
        let values = (0..years * freq)
            .map(|i| {
                if missing_every.is_some_and(|m| i % m == 0) {
                    return f64::NAN;
                }
                let tau = 2005.0 + i as f64 / freq as f64;
                0.4 + 0.001 * (i + 1) as f64 + 0.2 * (2.0 * PI * tau).cos()
                    - 0.05 * (2.0 * PI * tau).sin()
            })
            .collect();
        RegularSeries {
            start_year: 2005,
            start_slot: 0,
            frequency: freq,
            step_days: 16,
            values,
        }
    }

    #[test]
    fn test_fit_recovers_coefficients() {
        let series = seasonal_series(4, None);
        let data = RegressionData::from_series(&series, 0..series.len());
        let fit = HarmonicFit::fit(ModelTerms::new(1, true), &data).unwrap();

        assert_relative_eq!(fit.coefficients[0], 0.4, epsilon = 1e-8);
        assert_relative_eq!(fit.coefficients[1], 0.001, epsilon = 1e-10);
        assert_relative_eq!(fit.coefficients[2], 0.2, epsilon = 1e-8);
        assert_relative_eq!(fit.coefficients[3], -0.05, epsilon = 1e-8);
        assert!(fit.sigma < 1e-8);
        assert_eq!(fit.n_obs, 92);
    }

    #[test]
    fn test_fit_ignores_missing() {
        let series = seasonal_series(4, Some(5));
        let data = RegressionData::from_series(&series, 0..series.len());
        let fit = HarmonicFit::fit(ModelTerms::new(2, true), &data).unwrap();

        assert_eq!(fit.n_obs, data.len());
        assert!(fit.n_obs < 92);
        // Second harmonic is absent from the signal.
        let amps = fit.amplitudes();
        assert_eq!(amps.len(), 2);
        assert_relative_eq!(amps[0], 0.2_f64.hypot(0.05), epsilon = 1e-8);
        assert!(amps[1] < 1e-8);
    }

    #[test]
    fn test_predict_extrapolates() {
        let series = seasonal_series(5, None);
        let history = RegressionData::from_series(&series, 0..69);
        let fit = HarmonicFit::fit(ModelTerms::new(1, true), &history).unwrap();

        let future = RegressionData::from_series(&series, 69..series.len());
        for r in fit.residuals(&future) {
            assert!(r.abs() < 1e-8);
        }
    }

    #[test]
    fn test_too_few_observations() {
        let series = seasonal_series(1, None);
        let data = RegressionData::from_series(&series, 0..3);
        let err = HarmonicFit::fit(ModelTerms::new(1, true), &data).unwrap_err();
        assert!(matches!(err, BreakError::InsufficientData(_)));
    }

    #[test]
    fn test_constant_series_without_trend() {
        let series = RegularSeries {
            start_year: 2001,
            start_slot: 0,
            frequency: 23,
            step_days: 16,
            values: vec![0.5; 46],
        };
        let data = RegressionData::from_series(&series, 0..46);
        let fit = HarmonicFit::fit(ModelTerms::new(3, false), &data).unwrap();
        assert_relative_eq!(fit.predict(50, 2003.2), 0.5, epsilon = 1e-9);
    }
}
