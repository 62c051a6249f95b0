//! Search a whole series for an unknown number of breaks in the
//! trend + harmonic regression.
//!
//! The search algorithm is pluggable through [`SegmentationStrategy`];
//! [`detect_breaks`] handles missing values, per-segment fits and break
//! magnitudes.

mod bai_perron;
mod pelt;
mod rss;

pub use bai_perron::BaiPerron;
pub use pelt::Pelt;
pub use rss::RssTable;

use common::{
    BreakError, BreakPoint, ModelTerms, RegularSeries, Result, SegmentConfig, SegmentStrategyKind,
};
use harmonic::{design_matrix, HarmonicFit, RegressionData};
use nalgebra::{DMatrix, DVector};
use tracing::{debug, info};

/// Partitions a regression into segments with separate coefficients.
pub trait SegmentationStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// End row (inclusive) of every segment except the last, ascending.
    fn locate(&self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<Vec<usize>>;
}

/// One fitted segment of the series.
#[derive(Debug, Clone)]
pub struct SegmentFit {
    /// First and last series positions covered.
    pub start_index: usize,
    pub end_index: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub fit: HarmonicFit,
}

/// A break between two segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentBreak {
    /// First observation of the new segment.
    pub breakpoint: BreakPoint,
    /// New fit minus old fit, evaluated at the break.
    pub magnitude: f64,
}

#[derive(Debug, Clone)]
pub struct Segmentation {
    pub breakpoints: Vec<SegmentBreak>,
    pub segments: Vec<SegmentFit>,
    pub rss: f64,
    /// BIC of the chosen partition.
    pub criterion: f64,
    pub strategy: String,
}

impl Segmentation {
    pub fn break_count(&self) -> usize {
        self.breakpoints.len()
    }
}

/// Build the configured strategy.
///
/// Fails with `ConfigError` for settings the strategy cannot honour.
pub fn from_config(config: &SegmentConfig) -> Result<Box<dyn SegmentationStrategy>> {
    config.validate()?;
    Ok(match config.strategy {
        SegmentStrategyKind::BaiPerron => Box::new(BaiPerron::from_config(config)),
        SegmentStrategyKind::Pelt => Box::new(Pelt::new(config.min_segment_fraction)),
    })
}

/// Minimum segment length `max(p + 1, ⌊fraction · n⌋)`.
pub fn min_segment_size(n: usize, p: usize, fraction: f64) -> usize {
    ((fraction * n as f64).floor() as usize).max(p + 1)
}

/// Gaussian BIC of a partition into `breaks + 1` segments with a common
/// variance: `n (ln 2π + ln(rss / n) + 1) + (p + 1)(breaks + 1) ln n`.
pub fn bic(rss: f64, n: usize, p: usize, breaks: usize) -> f64 {
    let n_f = n as f64;
    let rss = rss.max(f64::MIN_POSITIVE);
    n_f * ((2.0 * std::f64::consts::PI).ln() + (rss / n_f).ln() + 1.0)
        + ((p + 1) * (breaks + 1)) as f64 * n_f.ln()
}

/// Search `series` for breaks with `strategy`.
///
/// Missing values are dropped before any fitting. Fails with
/// `InsufficientData` when fewer than `2·p` observations remain.
pub fn detect_breaks(
    series: &RegularSeries,
    terms: &ModelTerms,
    strategy: &dyn SegmentationStrategy,
) -> Result<Segmentation> {
    let data = RegressionData::from_series(series, 0..series.len());
    let p = terms.parameter_count();
    if data.len() < terms.min_observations() {
        return Err(BreakError::InsufficientData(format!(
            "multi-break search needs {} observations, got {}",
            terms.min_observations(),
            data.len()
        )));
    }

    let x = design_matrix(terms, &data);
    let y = data.response();
    let ends = strategy.locate(&x, &y)?;
    check_ends(&ends, data.len())?;

    let mut bounds = Vec::with_capacity(ends.len() + 2);
    bounds.push(0);
    bounds.extend(ends.iter().map(|e| e + 1));
    bounds.push(data.len());

    let mut segments = Vec::with_capacity(bounds.len() - 1);
    for w in bounds.windows(2) {
        let part = data.slice(w[0]..w[1]);
        let fit = HarmonicFit::fit(*terms, &part)?;
        segments.push(SegmentFit {
            start_index: part.positions[0],
            end_index: part.positions[part.len() - 1],
            start_time: part.times[0],
            end_time: part.times[part.len() - 1],
            fit,
        });
    }

    let breakpoints: Vec<SegmentBreak> = segments
        .windows(2)
        .map(|pair| {
            let index = pair[1].start_index;
            let time = pair[1].start_time;
            SegmentBreak {
                breakpoint: BreakPoint { index, time },
                magnitude: pair[1].fit.predict(index, time) - pair[0].fit.predict(index, time),
            }
        })
        .collect();

    let rss: f64 = segments.iter().map(|s| s.fit.rss).sum();
    let criterion = bic(rss, data.len(), p, breakpoints.len());

    for b in &breakpoints {
        debug!(
            index = b.breakpoint.index,
            time = format!("{:.3}", b.breakpoint.time),
            magnitude = format!("{:.4}", b.magnitude),
            "Segment break"
        );
    }
    info!(
        strategy = strategy.name(),
        observations = data.len(),
        breaks = breakpoints.len(),
        bic = format!("{:.2}", criterion),
        "Multi-break search complete"
    );

    Ok(Segmentation {
        breakpoints,
        segments,
        rss,
        criterion,
        strategy: strategy.name().to_string(),
    })
}

fn check_ends(ends: &[usize], n: usize) -> Result<()> {
    let ascending = ends.windows(2).all(|w| w[0] < w[1]);
    let in_range = ends.last().map_or(true, |&e| e + 1 < n);
    if ascending && in_range {
        Ok(())
    } else {
        Err(BreakError::ModelError(format!(
            "segmentation returned invalid segment ends {ends:?} for {n} observations"
        )))
    }
}
