use crate::backtester::BacktestResult;
use crate::metrics::{summarize, DetectionScore};

fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    match v {
        Some(x) => format!("{x:.precision$}"),
        None => "-".to_string(),
    }
}

/// Print a formatted table of backtest results to stdout.
pub fn print_report(results: &[BacktestResult]) {
    if results.is_empty() {
        println!("No results to report.");
        return;
    }

    println!(
        "{:<18} {:<12} {:>10} {:>10} {:>12} {:>9} {:>9}",
        "Fixture", "Detector", "Break", "Magnitude", "Outcome", "Delay", "MagErr"
    );
    println!("{}", "-".repeat(86));

    let mut current_fixture = String::new();
    for r in results {
        if r.fixture_name != current_fixture {
            if !current_fixture.is_empty() {
                println!("{}", "-".repeat(86));
            }
            current_fixture = r.fixture_name.clone();
        }
        println!(
            "{:<18} {:<12} {:>10} {:>10} {:>12} {:>9} {:>9}",
            r.fixture_name,
            r.detector_name,
            fmt_opt(r.detection.time, 3),
            fmt_opt(r.detection.magnitude, 3),
            r.score.outcome.label(),
            fmt_opt(r.score.delay_years, 3),
            fmt_opt(r.score.magnitude_error, 3),
        );
    }
    println!("{}", "-".repeat(86));

    println!("\n=== Summary by Detector ===");
    for detector in collect_detector_names(results) {
        let scores: Vec<DetectionScore> = results
            .iter()
            .filter(|r| r.detector_name == detector)
            .map(|r| r.score)
            .collect();
        let s = summarize(&scores);
        println!(
            "  {:<12} hit rate = {:.2}  false alarms = {:.2}  mean delay = {}  mean |mag err| = {}",
            detector,
            s.hit_rate,
            s.false_alarm_rate,
            fmt_opt(s.mean_delay_years, 3),
            fmt_opt(s.mean_magnitude_error, 3),
        );
    }
}

fn collect_detector_names(results: &[BacktestResult]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for r in results {
        if !names.contains(&r.detector_name) {
            names.push(r.detector_name.clone());
        }
    }
    names
}
