use std::collections::BTreeSet;

use common::{BreakError, QualityConfig, Result};
use num_traits::ToPrimitive;

/// Keeps values whose pixel-reliability flag is in an accepted set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityMask {
    accepted: BTreeSet<u8>,
}

impl QualityMask {
    pub fn new(accepted: impl IntoIterator<Item = u8>) -> Self {
        Self {
            accepted: accepted.into_iter().collect(),
        }
    }

    pub fn from_config(config: &QualityConfig) -> Self {
        Self::new(config.accepted_flags.iter().copied())
    }

    pub fn accepts(&self, flag: u8) -> bool {
        self.accepted.contains(&flag)
    }

    /// Replace values with rejected flags by `NaN`.
    pub fn apply(&self, values: &[f64], flags: &[u8]) -> Result<Vec<f64>> {
        if values.len() != flags.len() {
            return Err(BreakError::InvalidInput(format!(
                "{} values but {} quality flags",
                values.len(),
                flags.len()
            )));
        }
        Ok(values
            .iter()
            .zip(flags)
            .map(|(&v, &f)| if self.accepts(f) { v } else { f64::NAN })
            .collect())
    }
}

impl Default for QualityMask {
    /// Good and marginal data.
    fn default() -> Self {
        Self::new([0, 1])
    }
}

/// Convert raw integer counts to physical values; the fill value maps to `NaN`.
pub fn scale_raw<T: ToPrimitive>(raw: &[T], scale_factor: f64, fill_value: Option<f64>) -> Vec<f64> {
    raw.iter()
        .map(|r| match r.to_f64() {
            Some(v) if fill_value.map_or(true, |fill| v != fill) => v * scale_factor,
            _ => f64::NAN,
        })
        .collect()
}
