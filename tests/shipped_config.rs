//! ---
//! ems_section: "15-testing-qa-runbook"
//! ems_subsection: "integration-tests"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Integration and validation tests for the EVQ dashboard."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};
use std::time::Duration;

use evq_common::{DashboardConfig, MarkerRetention};
use evq_core::{Cadence, ControllerSettings};

fn repo_path(path: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join(path)
}

#[test]
fn shipped_config_matches_built_in_defaults() {
    let config = DashboardConfig::from_path(&repo_path("configs/evq.toml"))
        .unwrap_or_else(|err| panic!("configs/evq.toml must load: {err:#}"));
    let defaults = DashboardConfig::default();

    assert_eq!(config.backend.base_url, defaults.backend.base_url);
    assert_eq!(config.backend.request_timeout, Duration::from_secs(3));
    assert_eq!(config.polling.initial_speed, defaults.polling.initial_speed);
    assert_eq!(config.polling.max_speed, defaults.polling.max_speed);
    assert_eq!(config.polling.log_poll_interval, Duration::from_secs(1));
    assert_eq!(config.charts.capacity, defaults.charts.capacity);
    assert_eq!(config.markers.retention, MarkerRetention::KeepUntilReset);
    assert_eq!(config.generate.num_evs, defaults.generate.num_evs);
}

#[test]
fn shipped_config_drives_the_five_and_twenty_cadence() {
    let config = DashboardConfig::from_path(&repo_path("configs/evq.toml")).unwrap();
    let settings = ControllerSettings::from(&config);
    assert_eq!(settings.cadence, Cadence::new(5, 20));
    assert_eq!(settings.generate.num_agents, 100);
}

#[test]
fn config_file_starts_with_frontmatter() {
    let content = std::fs::read_to_string(repo_path("configs/evq.toml")).unwrap();
    assert!(
        content.starts_with("# ---"),
        "configs/evq.toml must include frontmatter header"
    );
}
