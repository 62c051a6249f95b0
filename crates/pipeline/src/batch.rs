use std::collections::BTreeMap;
use std::time::Instant;

use common::{AppConfig, BreakError, BreakResult, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::pipeline::analyze_pixel;
use crate::stack::PixelStack;

/// What happened to one pixel of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PixelOutcome {
    Analyzed {
        pixel: usize,
        result: BreakResult,
        /// Breaks found by the multi-break search, when it ran.
        segment_breaks: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        segment_error: Option<String>,
    },
    Failed {
        pixel: usize,
        kind: String,
        reason: String,
    },
}

impl PixelOutcome {
    pub fn pixel(&self) -> usize {
        match self {
            PixelOutcome::Analyzed { pixel, .. } | PixelOutcome::Failed { pixel, .. } => *pixel,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, PixelOutcome::Failed { .. })
    }
}

/// Break time and magnitude rasters.
///
/// Break time is `NaN` where no break was found. Magnitude covers every
/// analysed pixel and is `NaN` only for failed pixels or empty monitoring
/// windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakGrid {
    pub nrows: usize,
    pub ncols: usize,
    pub break_time: Vec<f64>,
    pub magnitude: Vec<f64>,
}

impl BreakGrid {
    fn empty(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            break_time: vec![f64::NAN; nrows * ncols],
            magnitude: vec![f64::NAN; nrows * ncols],
        }
    }

    /// `(break time, magnitude)` at a cell.
    pub fn at(&self, row: usize, col: usize) -> Option<(f64, f64)> {
        if row >= self.nrows || col >= self.ncols {
            return None;
        }
        let i = row * self.ncols + col;
        Some((self.break_time[i], self.magnitude[i]))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub grid: BreakGrid,
    /// One entry per pixel, in pixel order.
    pub outcomes: Vec<PixelOutcome>,
    pub with_break: usize,
    pub without_break: usize,
    pub failed: usize,
    pub failures_by_kind: BTreeMap<String, usize>,
    pub processing_time_secs: f64,
}

impl BatchReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Analyse every pixel of `stack` in parallel.
///
/// A pixel that fails is recorded with its reason; the batch carries on.
/// Only configuration problems abort the run.
pub fn run_batch(stack: &PixelStack, start: f64, config: &AppConfig) -> Result<BatchReport> {
    let timer = Instant::now();
    config.validate()?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.batch.max_workers)
        .build()
        .map_err(|e| BreakError::ConfigError(format!("cannot build worker pool: {e}")))?;

    info!(
        pixels = stack.len(),
        dates = stack.dates.len(),
        workers = config.batch.max_workers,
        "Starting batch"
    );

    let outcomes: Vec<PixelOutcome> = pool.install(|| {
        stack
            .pixels
            .par_iter()
            .enumerate()
            .map(|(pixel, values)| match analyze_pixel(&stack.dates, values, start, config) {
                Ok(analysis) => PixelOutcome::Analyzed {
                    pixel,
                    result: analysis.result(),
                    segment_breaks: analysis.segmentation.as_ref().map(|s| s.break_count()),
                    segment_error: analysis.segmentation_error,
                },
                Err(e) => {
                    warn!(pixel = pixel, kind = e.kind(), error = %e, "Pixel failed");
                    PixelOutcome::Failed {
                        pixel,
                        kind: e.kind().to_string(),
                        reason: e.to_string(),
                    }
                }
            })
            .collect()
    });

    let mut grid = BreakGrid::empty(stack.nrows, stack.ncols);
    let (mut with_break, mut without_break, mut failed) = (0, 0, 0);
    let mut failures_by_kind = BTreeMap::new();
    for outcome in &outcomes {
        match outcome {
            PixelOutcome::Analyzed { pixel, result, .. } => {
                grid.magnitude[*pixel] = result.magnitude.unwrap_or(f64::NAN);
                match result.breakpoint {
                    Some(bp) => {
                        with_break += 1;
                        grid.break_time[*pixel] = bp.time;
                    }
                    None => without_break += 1,
                }
            }
            PixelOutcome::Failed { kind, .. } => {
                failed += 1;
                *failures_by_kind.entry(kind.clone()).or_insert(0) += 1;
            }
        }
    }

    let processing_time = timer.elapsed().as_secs_f64();
    info!(
        with_break = with_break,
        without_break = without_break,
        failed = failed,
        time = format!("{:.2}s", processing_time),
        "Batch complete"
    );

    Ok(BatchReport {
        grid,
        outcomes,
        with_break,
        without_break,
        failed,
        failures_by_kind,
        processing_time_secs: processing_time,
    })
}
