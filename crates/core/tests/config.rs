use std::path::Path;
use std::time::Duration;

use pretty_assertions::assert_eq;
use timeliner_core::config::ScheduleConfig;
use timeliner_core::{HarvestConfig, HarvestError, ReportPaths, RunParams};

#[test]
fn test_defaults() {
    let config = HarvestConfig::default();
    assert_eq!(config.schedule.slots_per_batch, 11);
    assert_eq!(config.waits.polls_within(config.waits.exist_timeout()), 13);
    assert_eq!(
        config.interstitial.backoff(),
        [180, 180, 300, 480, 600].map(Duration::from_secs).to_vec()
    );
    assert_eq!(config.interstitial.unavailable_text, "This post is unavailable");
    config.validate().unwrap();
}

#[test]
fn test_partial_toml_overrides_keep_other_defaults() {
    let config = HarvestConfig::from_toml_str(
        r#"
[schedule]
slots_per_batch = 6

[interstitial]
backoff_secs = [1, 2]

[profiles]
base_url = "http://localhost:8080"
"#,
    )
    .unwrap();

    assert_eq!(config.schedule.slots_per_batch, 6);
    assert_eq!(config.schedule.nudge_every, 4);
    assert_eq!(config.interstitial.backoff_secs, vec![1, 2]);
    assert_eq!(config.interstitial.max_attempts, 5);
    assert_eq!(config.waits, HarvestConfig::default().waits);
    assert_eq!(
        config.profiles.profile_url("@alice"),
        "http://localhost:8080/alice"
    );
}

#[test]
fn test_invalid_values_are_rejected() {
    for input in [
        "[schedule]\nslots_per_batch = 0",
        "[schedule]\nnudge_every = 0",
        "[waits]\nmandatory_attempts = 0",
        "[interstitial]\nbackoff_secs = []",
        "[profiles]\nrestart_every = 0",
        "[schedule]\nslots_per_batch = \"many\"",
    ] {
        let err = HarvestConfig::from_toml_str(input).unwrap_err();
        assert!(matches!(err, HarvestError::Config(_)), "{input}: {err}");
    }
}

#[test]
fn test_missing_config_file_is_io_error() {
    let err = HarvestConfig::from_file(Path::new("/nonexistent/timeliner.toml")).unwrap_err();
    assert!(matches!(err, HarvestError::Io { .. }));
}

#[test]
fn test_batches_cover_limit_plus_overshoot() {
    let schedule = ScheduleConfig::default();
    assert_eq!(schedule.batches_for(0), 0);
    assert_eq!(schedule.batches_for(3), 1);
    assert_eq!(schedule.batches_for(100), 17);
}

#[test]
fn test_warm_start_scrolls() {
    let schedule = ScheduleConfig::default();
    assert_eq!(schedule.warm_start_scrolls(0), 0);
    assert_eq!(schedule.warm_start_scrolls(19), 0);
    // 20 cached: 2 screens, half skipped.
    assert_eq!(schedule.warm_start_scrolls(20), 1);
    assert_eq!(schedule.warm_start_scrolls(22), 1);
    // 110 cached: 10 screens, 5 skipped.
    assert_eq!(schedule.warm_start_scrolls(110), 5);
    assert_eq!(schedule.warm_start_scrolls(121), 5);
}

#[test]
fn test_report_paths() {
    let paths = ReportPaths::new("/data/reports", "nasa");
    assert_eq!(paths.dir(), Path::new("/data/reports/nasa"));
    assert_eq!(paths.posts_json(), Path::new("/data/reports/nasa/nasa.json"));
    assert_eq!(paths.posts_csv(), Path::new("/data/reports/nasa/nasa.csv"));
    assert_eq!(
        paths.metadata_json(),
        Path::new("/data/reports/nasa/nasa_metadata.json")
    );
    assert_eq!(
        paths.metadata_csv(),
        Path::new("/data/reports/nasa/nasa_metadata.csv")
    );
}

#[test]
fn test_run_params_builder() {
    let date = chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let params = RunParams::new("nasa", 50).until(date);
    assert_eq!(params.limit, 50);
    assert_eq!(params.until, Some(date));
    assert_eq!(params.report, "nasa");
}
