use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{BreakError, ModelTerms, Result};

/// Application-level configuration, loadable from a JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub regularize: RegularizeConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub segment: SegmentConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

impl AppConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading configuration");
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.regularize.validate()?;
        self.quality.validate()?;
        self.monitor.validate()?;
        self.segment.validate()?;
        self.batch.validate()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegularizeConfig {
    /// Slots per year; inferred from the observed step when absent.
    #[serde(default)]
    pub cycles_per_year: Option<usize>,
}

impl RegularizeConfig {
    fn validate(&self) -> Result<()> {
        if self.cycles_per_year == Some(0) {
            return Err(BreakError::ConfigError(
                "regularize.cycles_per_year must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// QA flags whose values are kept; everything else becomes missing.
    #[serde(default = "default_accepted_flags")]
    pub accepted_flags: Vec<u8>,
    /// Multiplier from raw counts to index units.
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    /// Raw value marking "no data".
    #[serde(default = "default_fill_value")]
    pub fill_value: Option<f64>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            accepted_flags: default_accepted_flags(),
            scale_factor: default_scale_factor(),
            fill_value: default_fill_value(),
        }
    }
}

impl QualityConfig {
    fn validate(&self) -> Result<()> {
        if !(self.scale_factor.is_finite() && self.scale_factor > 0.0) {
            return Err(BreakError::ConfigError(format!(
                "quality.scale_factor must be a positive number, got {}",
                self.scale_factor
            )));
        }
        Ok(())
    }
}

/// How the stable history period is chosen before fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum HistoryMode {
    /// Use every observation before the monitoring start.
    #[default]
    All,
    /// Start the history at a fixed fractional year.
    Fixed { start: f64 },
    /// Reverse-ordered CUSUM test for the most recent stable stretch.
    Roc {
        #[serde(default = "default_level")]
        level: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_harmonic_order")]
    pub harmonic_order: usize,
    #[serde(default = "default_true")]
    pub trend: bool,
    #[serde(default)]
    pub history: HistoryMode,
    /// Significance level used to derive the boundary constant.
    #[serde(default = "default_level")]
    pub level: f64,
    /// Explicit boundary constant (a²); overrides `level` when set.
    #[serde(default)]
    pub critical_value: Option<f64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            harmonic_order: default_harmonic_order(),
            trend: default_true(),
            history: HistoryMode::default(),
            level: default_level(),
            critical_value: None,
        }
    }
}

impl MonitorConfig {
    pub fn terms(&self) -> ModelTerms {
        ModelTerms::new(self.harmonic_order, self.trend)
    }

    pub fn validate(&self) -> Result<()> {
        check_level("monitor.level", self.level)?;
        if let HistoryMode::Roc { level } = self.history {
            check_level("monitor.history.level", level)?;
        }
        if let Some(c) = self.critical_value {
            if !(c.is_finite() && c > 0.0) {
                return Err(BreakError::ConfigError(format!(
                    "monitor.critical_value must be positive, got {c}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStrategyKind {
    #[default]
    BaiPerron,
    Pelt,
}

/// Number of breaks the multi-break search should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BreakCount {
    /// Pick the count minimising BIC.
    #[default]
    Auto,
    Fixed(usize),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub strategy: SegmentStrategyKind,
    /// Minimum segment length as a fraction of the observations.
    #[serde(default = "default_min_segment_fraction")]
    pub min_segment_fraction: f64,
    #[serde(default)]
    pub max_breaks: Option<usize>,
    #[serde(default)]
    pub break_count: BreakCount,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strategy: SegmentStrategyKind::default(),
            min_segment_fraction: default_min_segment_fraction(),
            max_breaks: None,
            break_count: BreakCount::default(),
        }
    }
}

impl SegmentConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_segment_fraction > 0.0 && self.min_segment_fraction < 0.5) {
            return Err(BreakError::ConfigError(format!(
                "segment.min_segment_fraction must be in (0, 0.5), got {}",
                self.min_segment_fraction
            )));
        }
        // PELT picks its own break count from the penalty.
        if self.strategy == SegmentStrategyKind::Pelt
            && (self.max_breaks.is_some() || self.break_count != BreakCount::Auto)
        {
            return Err(BreakError::ConfigError(
                "segment.max_breaks and segment.break_count apply to bai_perron only".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
        }
    }
}

impl BatchConfig {
    fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(BreakError::ConfigError(
                "batch.max_workers must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn check_level(name: &str, level: f64) -> Result<()> {
    if !(level > 0.0 && level < 1.0) {
        return Err(BreakError::ConfigError(format!(
            "{name} must be in (0, 1), got {level}"
        )));
    }
    Ok(())
}

fn default_accepted_flags() -> Vec<u8> {
    vec![0, 1]
}
fn default_scale_factor() -> f64 {
    0.0001
}
fn default_fill_value() -> Option<f64> {
    Some(-3000.0)
}
fn default_harmonic_order() -> usize {
    1
}
fn default_true() -> bool {
    true
}
fn default_level() -> f64 {
    0.05
}
fn default_min_segment_fraction() -> f64 {
    0.15
}
fn default_max_workers() -> usize {
    2
}
