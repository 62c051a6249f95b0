use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use common::{slot_of_day, BreakError, RegularSeries, Result};
use tracing::{debug, info, warn};

/// Regularize irregular composite observations onto a per-year slot grid.
///
/// Algorithm:
/// 1. Group dates by calendar year and take consecutive day-of-year gaps
///    within each year. The smallest gap over the whole input is the
///    canonical step. Years holding a single observation contribute no gap.
/// 2. Slots per year default to `ceil(365 / step)` (23 for a 16-day product).
/// 3. Each date lands in slot `round((doy - 1) / step)` of its year.
/// 4. Observations sharing a slot are averaged; empty slots stay `NaN`.
pub fn regularize(
    dates: &[NaiveDate],
    values: &[f64],
    cycles_per_year: Option<usize>,
) -> Result<RegularSeries> {
    if dates.len() != values.len() {
        return Err(BreakError::InvalidInput(
            "dates and values must have the same length".into(),
        ));
    }
    if dates.is_empty() {
        return Err(BreakError::InsufficientData(
            "cannot regularize an empty series".into(),
        ));
    }
    if cycles_per_year == Some(0) {
        return Err(BreakError::InvalidInput(
            "cycles_per_year must be positive".into(),
        ));
    }

    let mut observations: Vec<(NaiveDate, f64)> =
        dates.iter().copied().zip(values.iter().copied()).collect();
    observations.sort_by_key(|(date, _)| *date);

    let step_days = canonical_step(&observations)?;
    let frequency = cycles_per_year.unwrap_or_else(|| (365.0 / step_days as f64).ceil() as usize);

    debug!(
        step_days = step_days,
        frequency = frequency,
        observations = observations.len(),
        "Inferred sampling interval"
    );

    // Absolute slot → (sum, count) of the non-missing values landing there.
    let mut slots: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for (date, value) in &observations {
        let slot = slot_of_day(date.ordinal(), step_days, frequency);
        let key = date.year() as i64 * frequency as i64 + slot as i64;
        let entry = slots.entry(key).or_insert((0.0, 0));
        if !value.is_nan() {
            entry.0 += value;
            entry.1 += 1;
        }
    }

    let (first, last) = match (slots.keys().next(), slots.keys().next_back()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => {
            return Err(BreakError::InsufficientData(
                "no observation mapped to a slot".into(),
            ))
        }
    };

    let len = (last - first + 1) as usize;
    let mut out = vec![f64::NAN; len];
    for (key, (sum, count)) in &slots {
        if *count > 0 {
            out[(key - first) as usize] = sum / *count as f64;
        }
    }

    let merged = observations.len() - slots.len();
    if merged > 0 {
        debug!(merged = merged, "Averaged observations sharing a slot");
    }

    let series = RegularSeries {
        start_year: first.div_euclid(frequency as i64) as i32,
        start_slot: first.rem_euclid(frequency as i64) as usize,
        frequency,
        step_days,
        values: out,
    };

    info!(
        start = format!("{:.3}", series.start_time()),
        end = format!("{:.3}", series.end_time()),
        slots = series.len(),
        missing = series.len() - series.observed_count(),
        "Regularization complete"
    );

    Ok(series)
}

/// Regularize a date → value map (dates are unique by construction).
pub fn regularize_map(
    data: &BTreeMap<NaiveDate, f64>,
    cycles_per_year: Option<usize>,
) -> Result<RegularSeries> {
    let (dates, values): (Vec<NaiveDate>, Vec<f64>) = data.iter().map(|(d, v)| (*d, *v)).unzip();
    regularize(&dates, &values, cycles_per_year)
}

/// Smallest positive within-year day-of-year gap over the sorted input.
fn canonical_step(sorted: &[(NaiveDate, f64)]) -> Result<u32> {
    let mut by_year: BTreeMap<i32, BTreeSet<u32>> = BTreeMap::new();
    for (date, _) in sorted {
        by_year.entry(date.year()).or_default().insert(date.ordinal());
    }

    let mut min_gap: Option<u32> = None;
    let mut single_years = 0usize;
    for days in by_year.values() {
        if days.len() < 2 {
            single_years += 1;
            continue;
        }
        let days: Vec<u32> = days.iter().copied().collect();
        for w in days.windows(2) {
            let gap = w[1] - w[0];
            min_gap = Some(min_gap.map_or(gap, |m| m.min(gap)));
        }
    }

    if single_years > 0 {
        warn!(
            years = single_years,
            "Years with a single observation excluded from step inference"
        );
    }

    min_gap.ok_or_else(|| {
        BreakError::DegenerateGap(format!(
            "no calendar year has two distinct observation dates ({} year(s) inspected)",
            by_year.len()
        ))
    })
}
