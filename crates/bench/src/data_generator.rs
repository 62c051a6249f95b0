use chrono::NaiveDate;
use std::f64::consts::PI;

/// A synthetic pixel with a known break (or none) for scoring detectors.
#[derive(Debug, Clone)]
pub struct BreakFixture {
    pub name: String,
    /// Composite acquisition dates; need not be evenly spaced.
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
    /// Start of the monitoring period as a fractional year.
    pub monitor_start: f64,
    pub expected: ExpectedBreak,
}

/// Ground truth: when the disturbance starts and how large it is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpectedBreak {
    pub time: Option<f64>,
    pub magnitude: Option<f64>,
}

impl ExpectedBreak {
    fn none() -> Self {
        Self {
            time: None,
            magnitude: None,
        }
    }

    fn at(time: f64, magnitude: f64) -> Self {
        Self {
            time: Some(time),
            magnitude: Some(magnitude),
        }
    }
}

const FIRST_YEAR: i32 = 2001;
const LAST_YEAR: i32 = 2008;
const MONITOR_START: f64 = 2008.0;
/// Disturbance onset, ten composites into the monitoring year.
const BREAK_SLOT: u32 = 10;

/// Generate all standard break fixtures.
pub fn generate_all_fixtures() -> Vec<BreakFixture> {
    vec![
        stable_seasonal(),
        abrupt_drop(),
        step_up(),
        gappy_drop(),
        noisy_drop(),
        trend_only(),
    ]
}

/// 16-day composite dates (day-of-year 1, 17, ..., 353) for every year.
fn composite_dates() -> Vec<NaiveDate> {
    (FIRST_YEAR..=LAST_YEAR)
        .flat_map(|y| (0..23u32).filter_map(move |k| NaiveDate::from_yo_opt(y, 1 + 16 * k)))
        .collect()
}

fn fractional_year(date: &NaiveDate) -> f64 {
    use chrono::Datelike;
    date.year() as f64 + ((date.ordinal() - 1) / 16) as f64 / 23.0
}

/// Deterministic pseudo-random: simple LCG-based noise in [-amplitude, amplitude].
fn noise(seed: u64, n: usize, amplitude: f64) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let frac = ((state >> 11) as f64) / ((1u64 << 53) as f64);
            (frac * 2.0 - 1.0) * amplitude
        })
        .collect()
}

/// Seasonal vegetation curve with a level that may change at `break_time`.
fn ndvi(dates: &[NaiveDate], base: f64, shift: f64, break_time: Option<f64>, eps: &[f64]) -> Vec<f64> {
    dates
        .iter()
        .zip(eps)
        .map(|(d, e)| {
            let tau = fractional_year(d);
            let level = match break_time {
                Some(t) if tau >= t - 1e-9 => base + shift,
                _ => base,
            };
            level + 0.15 * (2.0 * PI * tau).cos() + 0.05 * (2.0 * PI * tau).sin() + e
        })
        .collect()
}

fn break_time() -> f64 {
    MONITOR_START + BREAK_SLOT as f64 / 23.0
}

pub fn stable_seasonal() -> BreakFixture {
    let dates = composite_dates();
    let eps = noise(7, dates.len(), 0.02);
    BreakFixture {
        name: "stable_seasonal".into(),
        values: ndvi(&dates, 0.5, 0.0, None, &eps),
        dates,
        monitor_start: MONITOR_START,
        expected: ExpectedBreak::none(),
    }
}

pub fn abrupt_drop() -> BreakFixture {
    let dates = composite_dates();
    let eps = noise(11, dates.len(), 0.02);
    BreakFixture {
        name: "abrupt_drop".into(),
        values: ndvi(&dates, 0.6, -0.35, Some(break_time()), &eps),
        dates,
        monitor_start: MONITOR_START,
        expected: ExpectedBreak::at(break_time(), -0.35),
    }
}

pub fn step_up() -> BreakFixture {
    let dates = composite_dates();
    let eps = noise(13, dates.len(), 0.02);
    BreakFixture {
        name: "step_up".into(),
        values: ndvi(&dates, 0.3, 0.25, Some(break_time()), &eps),
        dates,
        monitor_start: MONITOR_START,
        expected: ExpectedBreak::at(break_time(), 0.25),
    }
}

/// Abrupt drop where a third of composites are absent and some are cloudy.
pub fn gappy_drop() -> BreakFixture {
    let all = composite_dates();
    let keep = noise(17, all.len(), 1.0);
    let cloud = noise(19, all.len(), 1.0);
    let dates: Vec<NaiveDate> = all
        .iter()
        .zip(&keep)
        .enumerate()
        // Keep the first two composites of each year so every year has a gap.
        .filter(|(i, (_, k))| i % 23 < 2 || **k > -0.33)
        .map(|(_, (d, _))| *d)
        .collect();
    let eps = noise(23, dates.len(), 0.02);
    let mut values = ndvi(&dates, 0.6, -0.35, Some(break_time()), &eps);
    for (v, c) in values.iter_mut().zip(&cloud) {
        if *c > 0.8 {
            *v = f64::NAN;
        }
    }
    BreakFixture {
        name: "gappy_drop".into(),
        dates,
        values,
        monitor_start: MONITOR_START,
        expected: ExpectedBreak::at(break_time(), -0.35),
    }
}

pub fn noisy_drop() -> BreakFixture {
    let dates = composite_dates();
    let eps = noise(29, dates.len(), 0.08);
    BreakFixture {
        name: "noisy_drop".into(),
        values: ndvi(&dates, 0.6, -0.3, Some(break_time()), &eps),
        dates,
        monitor_start: MONITOR_START,
        expected: ExpectedBreak::at(break_time(), -0.3),
    }
}

/// Steady greening that continues through the monitoring period.
pub fn trend_only() -> BreakFixture {
    let dates = composite_dates();
    let eps = noise(31, dates.len(), 0.02);
    let values = ndvi(&dates, 0.4, 0.0, None, &eps)
        .into_iter()
        .zip(&dates)
        .map(|(v, d)| v + 0.02 * (fractional_year(d) - FIRST_YEAR as f64))
        .collect();
    BreakFixture {
        name: "trend_only".into(),
        dates,
        values,
        monitor_start: MONITOR_START,
        expected: ExpectedBreak::none(),
    }
}
