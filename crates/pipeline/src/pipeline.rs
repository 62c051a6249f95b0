use std::time::Instant;

use chrono::NaiveDate;
use common::{AppConfig, BreakResult, RegularSeries, Result};
use monitor::{monitor, MonitorOutcome};
use regularize::regularize;
use segment::{detect_breaks, Segmentation};
use tracing::{info, warn};

/// Full result of analysing one pixel.
#[derive(Debug, Clone)]
pub struct PixelAnalysis {
    pub series: RegularSeries,
    pub monitor: MonitorOutcome,
    /// Present when the multi-break search is enabled and succeeded.
    pub segmentation: Option<Segmentation>,
    /// Why the multi-break search failed; the monitor result still stands.
    pub segmentation_error: Option<String>,
    pub processing_time_secs: f64,
}

impl PixelAnalysis {
    pub fn result(&self) -> BreakResult {
        self.monitor.result
    }
}

/// Analyse one pixel's irregular observations.
///
/// Pipeline: regularize → monitor from `start` → (multi-break search).
/// A failed multi-break search is recorded in the analysis rather than
/// failing the pixel.
pub fn analyze_pixel(
    dates: &[NaiveDate],
    values: &[f64],
    start: f64,
    config: &AppConfig,
) -> Result<PixelAnalysis> {
    let timer = Instant::now();
    config.validate()?;

    let series = regularize(dates, values, config.regularize.cycles_per_year)?;
    let outcome = monitor(&series, start, &config.monitor)?;

    let (segmentation, segmentation_error) = if config.segment.enabled {
        match search_breaks(&series, config) {
            Ok(seg) => (Some(seg), None),
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "Multi-break search failed");
                (None, Some(e.to_string()))
            }
        }
    } else {
        (None, None)
    };

    let processing_time = timer.elapsed().as_secs_f64();
    info!(
        observations = values.len(),
        slots = series.len(),
        history = outcome.history_observations,
        monitored = outcome.monitoring_observations,
        has_break = outcome.has_break(),
        segment_breaks = segmentation.as_ref().map(|s| s.break_count()),
        time = format!("{:.3}s", processing_time),
        "Pixel analysis complete"
    );

    Ok(PixelAnalysis {
        series,
        monitor: outcome,
        segmentation,
        segmentation_error,
        processing_time_secs: processing_time,
    })
}

fn search_breaks(series: &RegularSeries, config: &AppConfig) -> Result<Segmentation> {
    let strategy = segment::from_config(&config.segment)?;
    detect_breaks(series, &config.monitor.terms(), strategy.as_ref())
}
