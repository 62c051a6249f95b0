use common::{stats, BreakError, ModelTerms, Result};
use harmonic::{design_matrix, recursive_residuals, RegressionData};
use tracing::debug;

/// Brown–Durbin–Evans constant for the Rec-CUSUM linear boundary.
pub fn roc_critical_value(level: f64) -> Result<f64> {
    const TABLE: [(f64, f64); 3] = [(0.01, 1.143), (0.05, 0.948), (0.10, 0.850)];
    TABLE
        .iter()
        .find(|(l, _)| (l - level).abs() < 1e-9)
        .map(|(_, lambda)| *lambda)
        .ok_or_else(|| {
            BreakError::ConfigError(format!(
                "reverse-ordered CUSUM supports levels 0.01, 0.05 and 0.10, got {level}"
            ))
        })
}

/// Index into `history` where its most recent stable stretch begins.
///
/// Runs a Rec-CUSUM test on the history in reverse time order. The first
/// boundary crossing, counted backwards from the monitoring start, marks the
/// first observation that no longer fits; everything after it is kept.
/// Returns 0 when the whole history is stable.
pub fn stable_history_start(
    terms: &ModelTerms,
    history: &RegressionData,
    level: f64,
) -> Result<usize> {
    let lambda = roc_critical_value(level)?;
    let n = history.len();
    let reversed = history.reversed();
    let x = design_matrix(terms, &reversed);
    let rr = recursive_residuals(&x, &reversed.response())?;

    let m = rr.values.len();
    let sigma = stats::std_dev(&rr.values);
    if m < 2 || sigma < 1e-12 {
        return Ok(0);
    }

    let scale = sigma * (m as f64).sqrt();
    let mut cusum = 0.0;
    for (k, w) in rr.values.iter().enumerate() {
        cusum += w;
        let t = (k + 1) as f64 / m as f64;
        if (cusum / scale).abs() > lambda * (1.0 + 2.0 * t) {
            let reversed_row = rr.start + k;
            let start = n - reversed_row;
            debug!(
                crossing_row = reversed_row,
                kept = n - start,
                of = n,
                "Reverse-ordered CUSUM trimmed the history"
            );
            return Ok(start);
        }
    }
    Ok(0)
}
