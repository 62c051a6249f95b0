use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Evenly spaced series indexed by fractional year.
///
/// Position `i` sits at `start_year + (start_slot + i) / frequency`.
/// Missing slots hold `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegularSeries {
    /// Calendar year of the first slot.
    pub start_year: i32,
    /// Slot of the first value within `start_year` (0-based).
    pub start_slot: usize,
    /// Number of slots per year.
    pub frequency: usize,
    /// Canonical gap between slots in days.
    pub step_days: u32,
    pub values: Vec<f64>,
}

impl RegularSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn start_time(&self) -> f64 {
        self.time_at(0)
    }

    pub fn end_time(&self) -> f64 {
        self.time_at(self.len().saturating_sub(1))
    }

    /// Fractional-year time of position `i`.
    pub fn time_at(&self, i: usize) -> f64 {
        self.start_year as f64 + (self.start_slot + i) as f64 / self.frequency as f64
    }

    pub fn times(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.time_at(i)).collect()
    }

    /// First position whose time is not earlier than `time`.
    ///
    /// Returns `len()` when `time` lies after the last slot.
    pub fn position_at_or_after(&self, time: f64) -> usize {
        let offset = (time - self.start_time()) * self.frequency as f64;
        if offset <= 0.0 {
            return 0;
        }
        // Tolerate float noise around exact slot boundaries.
        let pos = (offset - 1e-6).ceil().max(0.0) as usize;
        pos.min(self.len())
    }

    /// Fractional-year time a date maps to on this series' slot grid.
    pub fn date_to_time(&self, date: NaiveDate) -> f64 {
        let slot = slot_of_day(date.ordinal(), self.step_days, self.frequency);
        date.year() as f64 + slot as f64 / self.frequency as f64
    }

    /// Number of non-missing values.
    pub fn observed_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }
}

/// Slot within a year for a 1-based day-of-year.
pub fn slot_of_day(day_of_year: u32, step_days: u32, frequency: usize) -> usize {
    let slot = ((day_of_year.saturating_sub(1)) as f64 / step_days.max(1) as f64).round() as usize;
    slot.min(frequency.saturating_sub(1))
}

/// Regression terms: intercept, optional linear trend and `harmonic_order`
/// sine/cosine pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTerms {
    pub harmonic_order: usize,
    pub trend: bool,
}

impl ModelTerms {
    pub fn new(harmonic_order: usize, trend: bool) -> Self {
        Self {
            harmonic_order,
            trend,
        }
    }

    /// Number of regression coefficients.
    pub fn parameter_count(&self) -> usize {
        1 + usize::from(self.trend) + 2 * self.harmonic_order
    }

    /// Fewest non-missing observations a fit may use.
    pub fn min_observations(&self) -> usize {
        2 * self.parameter_count()
    }
}

impl Default for ModelTerms {
    fn default() -> Self {
        Self {
            harmonic_order: 1,
            trend: true,
        }
    }
}

/// A detected break: series position and its fractional-year time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakPoint {
    pub index: usize,
    pub time: f64,
}

/// Outcome of monitoring one series.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BreakResult {
    /// `None` when no break was detected.
    pub breakpoint: Option<BreakPoint>,
    /// Signed deviation summary; `None` when nothing could be measured.
    pub magnitude: Option<f64>,
}

impl BreakResult {
    pub fn no_break(magnitude: Option<f64>) -> Self {
        Self {
            breakpoint: None,
            magnitude,
        }
    }

    pub fn has_break(&self) -> bool {
        self.breakpoint.is_some()
    }
}
