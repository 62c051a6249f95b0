//! Break monitoring against a frozen harmonic fit.
//!
//! The series is split at the monitoring start. A trend + harmonic model is
//! fitted on the (optionally trimmed) history, then the OLS-CUSUM of the
//! monitoring residuals is compared against a Chu–Stinchcombe–White
//! boundary. The first crossing is the break.

mod boundary;
mod history;

pub use boundary::CusumBoundary;
pub use history::{roc_critical_value, stable_history_start};

use common::{
    stats, BreakError, BreakPoint, BreakResult, HistoryMode, ModelTerms, MonitorConfig,
    RegularSeries, Result,
};
use harmonic::{HarmonicFit, RegressionData};
use tracing::debug;

/// Everything the monitor computed for one series.
#[derive(Debug, Clone)]
pub struct MonitorOutcome {
    pub result: BreakResult,
    /// Time of the first history observation used for fitting.
    pub history_start: f64,
    /// Monitoring start as requested.
    pub history_end: f64,
    pub history_observations: usize,
    pub monitoring_observations: usize,
    pub fit: HarmonicFit,
    /// Residual scale used to normalise the process (floored).
    pub sigma: f64,
    /// Positions of the monitored observations.
    pub positions: Vec<usize>,
    /// CUSUM process, one value per monitored observation.
    pub process: Vec<f64>,
    /// Boundary at each monitored observation.
    pub boundary: Vec<f64>,
    pub critical_value: f64,
}

impl MonitorOutcome {
    pub fn has_break(&self) -> bool {
        self.result.has_break()
    }
}

/// Monitor `series` for a structural break from fractional year `start` on.
///
/// Fails with `InsufficientHistory` when fewer than `2·p` non-missing
/// observations remain for the fit. A monitoring window without observations
/// is not an error: it yields no break and no magnitude.
pub fn monitor(series: &RegularSeries, start: f64, config: &MonitorConfig) -> Result<MonitorOutcome> {
    config.validate()?;
    let terms = config.terms();
    let split = series.position_at_or_after(start);

    let history = select_history(series, split, &terms, config)?;
    let required = terms.min_observations();
    if history.len() < required {
        return Err(BreakError::InsufficientHistory {
            required,
            available: history.len(),
        });
    }

    let fit = HarmonicFit::fit(terms, &history)?;
    let sigma = floored_sigma(fit.sigma, &history.values);
    let boundary = match config.critical_value {
        Some(c) => CusumBoundary::new(c)?,
        None => CusumBoundary::from_level(config.level)?,
    };

    let monitoring = RegressionData::from_series(series, split..series.len());
    let deviations = fit.residuals(&monitoring);

    let n = history.len() as f64;
    let scale = sigma * n.sqrt();
    let mut process = Vec::with_capacity(deviations.len());
    let mut bounds = Vec::with_capacity(deviations.len());
    let mut first_crossing = None;
    let mut cusum = 0.0;
    for (j, e) in deviations.iter().enumerate() {
        cusum += e;
        let q = cusum / scale;
        let b = boundary.value((n + (j + 1) as f64) / n);
        if first_crossing.is_none() && q.abs() > b {
            first_crossing = Some(j);
        }
        process.push(q);
        bounds.push(b);
    }

    let result = match first_crossing {
        Some(j) => {
            let index = monitoring.positions[j];
            BreakResult {
                breakpoint: Some(BreakPoint {
                    index,
                    time: series.time_at(index),
                }),
                magnitude: stats::median(&deviations[j..]),
            }
        }
        None => BreakResult::no_break(stats::median(&deviations)),
    };

    if let Some(bp) = result.breakpoint {
        debug!(
            index = bp.index,
            time = format!("{:.3}", bp.time),
            magnitude = ?result.magnitude,
            "Break detected"
        );
    } else {
        debug!(
            monitored = monitoring.len(),
            magnitude = ?result.magnitude,
            "No break in monitoring period"
        );
    }

    Ok(MonitorOutcome {
        result,
        history_start: history
            .times
            .first()
            .copied()
            .unwrap_or_else(|| series.start_time()),
        history_end: start,
        history_observations: history.len(),
        monitoring_observations: monitoring.len(),
        fit,
        sigma,
        positions: monitoring.positions,
        process,
        boundary: bounds,
        critical_value: boundary.critical_value(),
    })
}

fn select_history(
    series: &RegularSeries,
    split: usize,
    terms: &ModelTerms,
    config: &MonitorConfig,
) -> Result<RegressionData> {
    let history = match config.history {
        HistoryMode::All => RegressionData::from_series(series, 0..split),
        HistoryMode::Fixed { start } => {
            let from = series.position_at_or_after(start).min(split);
            RegressionData::from_series(series, from..split)
        }
        HistoryMode::Roc { level } => {
            let full = RegressionData::from_series(series, 0..split);
            // Too short for a reverse CUSUM; the size check downstream reports it.
            if full.len() < terms.min_observations() {
                full
            } else {
                let from = stable_history_start(terms, &full, level)?;
                full.slice(from..full.len())
            }
        }
    };
    debug!(
        mode = ?config.history,
        observations = history.len(),
        split = split,
        "History selected"
    );
    Ok(history)
}

/// Keep the CUSUM scale positive for exact fits.
fn floored_sigma(sigma: f64, history: &[f64]) -> f64 {
    let level = history.iter().map(|v| v.abs()).sum::<f64>() / history.len().max(1) as f64;
    sigma.max(1e-9 * level.max(1.0))
}
