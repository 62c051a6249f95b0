//! Batch integration tests: records → pixel stack → parallel analysis → grid.

use chrono::{Datelike, NaiveDate};
use common::{AppConfig, BatchConfig, BreakCount, SegmentConfig};
use pipeline::{run_batch, FlagRecord, PixelOutcome, PixelStack, ValueRecord};

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_env_filter("warn").try_init();
}

fn composite_keys() -> Vec<String> {
    (2001..2009)
        .flat_map(|y| (0..23).map(move |k| format!("A{y}{:03}", 1 + 16 * k)))
        .collect()
}

fn year_of(key: &str) -> i32 {
    pipeline::parse_modis_date(key).map(|d| d.year()).unwrap()
}

/// 2×2 grid: a drop, a stable pixel, an all-fill pixel and a pixel that
/// only has data in the final year.
fn records() -> (Vec<ValueRecord>, Vec<FlagRecord>) {
    let mut values = Vec::new();
    let mut flags = Vec::new();
    for (t, key) in composite_keys().iter().enumerate() {
        let year = year_of(key);
        let raws = [
            if year < 2008 { 5000 } else { 1000 },
            5000,
            -3000,
            if year == 2008 { 4000 } else { -3000 },
        ];
        for (pixel, raw) in raws.into_iter().enumerate() {
            values.push(ValueRecord {
                date: key.clone(),
                pixel,
                raw,
            });
            // Every fifth composite of the drop pixel is cloudy.
            let flag = if pixel == 0 && t % 5 == 0 && year < 2008 { 3 } else { 0 };
            flags.push(FlagRecord {
                date: key.clone(),
                pixel,
                flag,
            });
        }
    }
    (values, flags)
}

#[test]
fn test_batch_partial_failures() {
    init_logging();
    let (values, flags) = records();
    let config = AppConfig::default();
    let stack = PixelStack::from_records(2, 2, &values, Some(&flags), &config.quality).unwrap();
    assert_eq!(stack.dates.len(), 184);

    let report = run_batch(&stack, 2008.0, &config).unwrap();

    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.with_break, 1);
    assert_eq!(report.without_break, 1);
    assert_eq!(report.failed, 2);
    assert_eq!(report.failures_by_kind.get("insufficient_history"), Some(&2));

    let (time, magnitude) = report.grid.at(0, 0).unwrap();
    assert!((time - 2008.0).abs() < 1e-9);
    assert!((magnitude + 0.4).abs() < 1e-6);

    // Stable pixel: no break time, but its magnitude is still reported.
    let (time, magnitude) = report.grid.at(0, 1).unwrap();
    assert!(time.is_nan());
    assert!(magnitude.abs() < 1e-9, "magnitude = {magnitude}");
    let (time, magnitude) = report.grid.at(1, 0).unwrap();
    assert!(time.is_nan() && magnitude.is_nan());
    assert!(report.grid.at(2, 0).is_none());

    for (i, outcome) in report.outcomes.iter().enumerate() {
        assert_eq!(outcome.pixel(), i);
    }
    match &report.outcomes[2] {
        PixelOutcome::Failed { kind, reason, .. } => {
            assert_eq!(kind, "insufficient_history");
            assert!(!reason.is_empty());
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn test_batch_is_independent_of_worker_count() {
    init_logging();
    let (values, flags) = records();
    let mut config = AppConfig::default();
    let stack = PixelStack::from_records(2, 2, &values, Some(&flags), &config.quality).unwrap();

    let serial = {
        config.batch = BatchConfig { max_workers: 1 };
        run_batch(&stack, 2008.0, &config).unwrap()
    };
    let parallel = {
        config.batch = BatchConfig { max_workers: 4 };
        run_batch(&stack, 2008.0, &config).unwrap()
    };
    assert_eq!(serial.outcomes, parallel.outcomes);
}

#[test]
fn test_batch_report_serializes() {
    init_logging();
    let (values, _) = records();
    let config = AppConfig::default();
    let stack = PixelStack::from_records(2, 2, &values, None, &config.quality).unwrap();
    let report = run_batch(&stack, 2008.0, &config).unwrap();

    let json = report.to_json().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["outcomes"][2]["status"], "failed");
    assert_eq!(parsed["outcomes"][0]["status"], "analyzed");
    assert_eq!(parsed["failed"], 2);
}

#[test]
fn test_failed_segmentation_keeps_monitor_result() {
    init_logging();
    let (values, flags) = records();
    let config = AppConfig {
        segment: SegmentConfig {
            enabled: true,
            break_count: BreakCount::Fixed(10),
            ..SegmentConfig::default()
        },
        ..AppConfig::default()
    };
    let stack = PixelStack::from_records(2, 2, &values, Some(&flags), &config.quality).unwrap();
    let report = run_batch(&stack, 2008.0, &config).unwrap();

    assert_eq!(report.with_break, 1);
    assert_eq!(report.failed, 2);
    match &report.outcomes[0] {
        PixelOutcome::Analyzed {
            result,
            segment_breaks,
            segment_error,
            ..
        } => {
            assert!(result.breakpoint.is_some());
            assert_eq!(*segment_breaks, None);
            assert!(segment_error.as_deref().is_some_and(|e| e.contains("10 breaks")));
        }
        other => panic!("expected analysis, got {other:?}"),
    }
}

#[test]
fn test_batch_rejects_invalid_config() {
    let (values, _) = records();
    let mut config = AppConfig::default();
    let stack = PixelStack::from_records(2, 2, &values, None, &config.quality).unwrap();
    config.batch.max_workers = 0;
    assert!(run_batch(&stack, 2008.0, &config).is_err());
}

#[test]
fn test_dates_shared_across_pixels() {
    let (values, _) = records();
    let stack = PixelStack::from_records(2, 2, &values, None, &AppConfig::default().quality).unwrap();
    let first = stack.dates[0];
    assert_eq!(first, NaiveDate::from_ymd_opt(2001, 1, 1).unwrap());
}
