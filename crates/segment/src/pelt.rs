use common::{stats, Result};
use harmonic::ols;
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::rss::RssTable;
use crate::{min_segment_size, SegmentationStrategy};

/// Pruned exact linear time search (Killick, Fearnhead & Eckley, 2012).
///
/// Segment cost is RSS / σ̂², with σ̂ estimated robustly from the first
/// differences of the single-segment residuals, so a penalty of
/// `(p + 1) ln n` per segment matches BIC.
#[derive(Debug, Clone)]
pub struct Pelt {
    min_segment_fraction: f64,
    penalty: Option<f64>,
}

impl Pelt {
    pub fn new(min_segment_fraction: f64) -> Self {
        Self {
            min_segment_fraction,
            penalty: None,
        }
    }

    /// Fixed penalty per additional segment, in units of σ̂².
    pub fn with_penalty(mut self, penalty: f64) -> Self {
        self.penalty = Some(penalty);
        self
    }
}

impl Default for Pelt {
    fn default() -> Self {
        Self::new(0.15)
    }
}

impl SegmentationStrategy for Pelt {
    fn name(&self) -> &str {
        "pelt"
    }

    fn locate(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<Vec<usize>> {
        let n = x.nrows();
        let p = x.ncols();
        let h = min_segment_size(n, p, self.min_segment_fraction);
        if n < 2 * h {
            return Ok(Vec::new());
        }

        let variance = noise_variance(x, y)?;
        let penalty = self
            .penalty
            .unwrap_or_else(|| (p + 1) as f64 * (n as f64).ln());
        let table = RssTable::new(x, y, h);

        // best[t]: optimal cost of rows 0..t; prev[t]: start row of its last segment.
        let mut best = vec![f64::INFINITY; n + 1];
        let mut prev = vec![0usize; n + 1];
        best[0] = -penalty;
        let mut candidates = vec![0usize];

        for t in h..=n {
            let mut min_cost = f64::INFINITY;
            let mut arg = 0;
            let costs: Vec<(usize, f64)> = candidates
                .iter()
                .filter(|&&s| t - s >= h)
                .map(|&s| (s, best[s] + table.rss(s, t - 1) / variance))
                .collect();
            for &(s, c) in &costs {
                if c + penalty < min_cost {
                    min_cost = c + penalty;
                    arg = s;
                }
            }
            best[t] = min_cost;
            prev[t] = arg;

            // Drop starts that can never beat the current optimum.
            candidates.retain(|&s| {
                costs
                    .iter()
                    .find(|(cs, _)| *cs == s)
                    .map_or(true, |(_, c)| *c <= min_cost)
            });
            if best[t].is_finite() {
                candidates.push(t);
            }
        }

        let mut ends = Vec::new();
        let mut t = n;
        while t > 0 {
            let s = prev[t];
            if s > 0 {
                ends.push(s - 1);
            }
            t = s;
        }
        ends.reverse();
        debug!(
            breaks = ends.len(),
            penalty = penalty,
            sigma = variance.sqrt(),
            "PELT search finished"
        );
        Ok(ends)
    }
}

/// Noise variance from the MAD of differenced single-fit residuals.
fn noise_variance(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<f64> {
    let residuals = ols(x, y)?.residuals;
    let diffs: Vec<f64> = residuals
        .as_slice()
        .windows(2)
        .map(|w| w[1] - w[0])
        .collect();
    let centre = stats::median(&diffs).unwrap_or(0.0);
    let deviations: Vec<f64> = diffs.iter().map(|d| (d - centre).abs()).collect();
    let mad = stats::median(&deviations).unwrap_or(0.0);
    let sigma = mad / (0.6745 * std::f64::consts::SQRT_2);
    let scale = stats::mean(&y.iter().map(|v| v.abs()).collect::<Vec<_>>()).max(1.0);
    Ok((sigma * sigma).max(1e-18 * scale * scale))
}
