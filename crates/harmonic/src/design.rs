use std::f64::consts::PI;
use std::ops::Range;

use common::{ModelTerms, RegularSeries};
use nalgebra::{DMatrix, DVector};

/// Non-missing observations of a series window, ready for regression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegressionData {
    /// Positions in the source series.
    pub positions: Vec<usize>,
    /// Fractional-year times.
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

impl RegressionData {
    /// Collect the non-missing observations of `series[range]`.
    pub fn from_series(series: &RegularSeries, range: Range<usize>) -> Self {
        let end = range.end.min(series.len());
        let mut data = RegressionData::default();
        for pos in range.start.min(end)..end {
            let v = series.values[pos];
            if v.is_nan() {
                continue;
            }
            data.positions.push(pos);
            data.times.push(series.time_at(pos));
            data.values.push(v);
        }
        data
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Observations `range` of this data set (indices into the compacted rows).
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self {
            positions: self.positions[range.clone()].to_vec(),
            times: self.times[range.clone()].to_vec(),
            values: self.values[range].to_vec(),
        }
    }

    /// Reverse the observation order, keeping each row's regressors intact.
    pub fn reversed(&self) -> Self {
        Self {
            positions: self.positions.iter().rev().copied().collect(),
            times: self.times.iter().rev().copied().collect(),
            values: self.values.iter().rev().copied().collect(),
        }
    }

    pub fn response(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.values)
    }
}

/// Regressor row: `[1, t?, cos 2πτ, sin 2πτ, cos 4πτ, sin 4πτ, ...]`.
pub fn design_row(terms: &ModelTerms, position: usize, time: f64) -> Vec<f64> {
    let mut row = Vec::with_capacity(terms.parameter_count());
    row.push(1.0);
    if terms.trend {
        row.push((position + 1) as f64);
    }
    for j in 1..=terms.harmonic_order {
        let angle = 2.0 * PI * j as f64 * time;
        row.push(angle.cos());
        row.push(angle.sin());
    }
    row
}

pub fn design_matrix(terms: &ModelTerms, data: &RegressionData) -> DMatrix<f64> {
    let p = terms.parameter_count();
    let mut flat = Vec::with_capacity(data.len() * p);
    for (pos, time) in data.positions.iter().zip(&data.times) {
        flat.extend(design_row(terms, *pos, *time));
    }
    DMatrix::from_row_slice(data.len(), p, &flat)
}
