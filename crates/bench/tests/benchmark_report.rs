use bench::backtester;
use bench::data_generator;
use bench::metrics::Outcome;
use bench::reporter;

#[test]
fn benchmark_all_fixtures() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .try_init();

    let fixtures = data_generator::generate_all_fixtures();
    let results = backtester::run_all_backtests(&fixtures);

    println!("\n========== DETECTION REPORT ==========\n");
    reporter::print_report(&results);

    // Sanity: every fixture should have at least one result
    for f in &fixtures {
        let count = results.iter().filter(|r| r.fixture_name == f.name).count();
        assert!(count > 0, "No results for fixture '{}'", f.name);
    }

    for name in ["abrupt_drop", "step_up"] {
        let hit = results
            .iter()
            .find(|r| r.fixture_name == name && r.detector_name == "monitor-h1")
            .map(|r| r.score.outcome);
        assert_eq!(hit, Some(Outcome::Hit), "monitor missed '{name}'");
    }
}
