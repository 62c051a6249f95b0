use common::{AppConfig, HistoryMode, MonitorConfig, Result, SegmentConfig, SegmentStrategyKind};
use pipeline::analyze_pixel;
use tracing::{debug, warn};

use crate::data_generator::BreakFixture;
use crate::metrics::{score, Detection, DetectionScore};

type Detector = Box<dyn Fn(&BreakFixture) -> Result<Detection>>;

/// Result of running a single detector on a single fixture.
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub fixture_name: String,
    pub detector_name: String,
    pub detection: Detection,
    pub score: DetectionScore,
}

/// Monitoring with the given model settings.
fn monitor_detector(monitor: MonitorConfig) -> Detector {
    let config = AppConfig {
        monitor,
        ..AppConfig::default()
    };
    Box::new(move |fixture| {
        let analysis = analyze_pixel(&fixture.dates, &fixture.values, fixture.monitor_start, &config)?;
        let result = analysis.result();
        Ok(Detection {
            time: result.breakpoint.map(|bp| bp.time),
            magnitude: result.magnitude,
        })
    })
}

/// Whole-series search; the most recent break at or after the monitoring
/// start is reported.
fn segment_detector(strategy: SegmentStrategyKind) -> Detector {
    let config = AppConfig {
        segment: SegmentConfig {
            enabled: true,
            strategy,
            ..SegmentConfig::default()
        },
        ..AppConfig::default()
    };
    Box::new(move |fixture| {
        let analysis = analyze_pixel(&fixture.dates, &fixture.values, fixture.monitor_start, &config)?;
        let recent = analysis
            .segmentation
            .iter()
            .flat_map(|s| s.breakpoints.iter())
            .filter(|b| b.breakpoint.time >= fixture.monitor_start - 1e-9)
            .last()
            .copied();
        Ok(Detection {
            time: recent.map(|b| b.breakpoint.time),
            magnitude: recent.map(|b| b.magnitude),
        })
    })
}

fn detectors() -> Vec<(&'static str, Detector)> {
    vec![
        ("monitor-h1", monitor_detector(MonitorConfig::default())),
        (
            "monitor-h2",
            monitor_detector(MonitorConfig {
                harmonic_order: 2,
                ..MonitorConfig::default()
            }),
        ),
        (
            "monitor-roc",
            monitor_detector(MonitorConfig {
                history: HistoryMode::Roc { level: 0.05 },
                ..MonitorConfig::default()
            }),
        ),
        ("bai-perron", segment_detector(SegmentStrategyKind::BaiPerron)),
        ("pelt", segment_detector(SegmentStrategyKind::Pelt)),
    ]
}

/// Run every detector on a single fixture.
pub fn run_backtest(fixture: &BreakFixture) -> Vec<BacktestResult> {
    let mut results = Vec::new();
    for (name, detect) in detectors() {
        match detect(fixture) {
            Ok(detection) => {
                let s = score(&detection, &fixture.expected);
                debug!(
                    detector = name,
                    fixture = %fixture.name,
                    outcome = s.outcome.label(),
                    "Detector scored"
                );
                results.push(BacktestResult {
                    fixture_name: fixture.name.clone(),
                    detector_name: name.to_string(),
                    detection,
                    score: s,
                });
            }
            Err(e) => {
                warn!(detector = name, fixture = %fixture.name, error = %e, "Detector failed");
            }
        }
    }
    results
}

/// Run backtests on all provided fixtures.
pub fn run_all_backtests(fixtures: &[BreakFixture]) -> Vec<BacktestResult> {
    fixtures.iter().flat_map(run_backtest).collect()
}
