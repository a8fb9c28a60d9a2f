//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives for the dashboard runtime."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;
use url::Url;

use crate::logging::LogFormat;

fn default_base_url() -> Url {
    Url::parse("http://127.0.0.1:5000/").expect("valid default backend url")
}

fn default_request_timeout() -> Duration {
    Duration::from_millis(3000)
}

fn default_initial_speed() -> u32 {
    5
}

fn default_max_speed() -> u32 {
    10
}

fn default_chart_every_ticks() -> u64 {
    5
}

fn default_selector_every_ticks() -> u64 {
    20
}

fn default_log_poll_interval() -> Duration {
    Duration::from_millis(1000)
}

fn default_chart_capacity() -> usize {
    30
}

fn default_low_battery_threshold() -> f64 {
    0.2
}

fn default_num_evs() -> u32 {
    100
}

fn default_num_stations() -> u32 {
    20
}

fn default_num_nodes() -> u32 {
    80
}

fn default_num_routes() -> u32 {
    240
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for the dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub charts: ChartsConfig,
    #[serde(default)]
    pub markers: MarkerConfig,
    #[serde(default)]
    pub generate: GenerateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where a [`DashboardConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: DashboardConfig,
    /// `None` when no file was found and defaults are in effect.
    pub source: Option<PathBuf>,
}

impl DashboardConfig {
    pub const ENV_CONFIG_PATH: &str = "EVQ_CONFIG";

    /// Load configuration from disk, respecting the `EVQ_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    ///
    /// An explicit `EVQ_CONFIG` path must exist. Candidate paths are optional
    /// and the defaults apply when none of them is present.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no configuration file found; using defaults"
        );
        Ok(LoadedConfig {
            config: Self::default(),
            source: None,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<DashboardConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.backend.validate()?;
        self.polling.validate()?;
        self.markers.validate()?;
        if self.charts.capacity == 0 {
            return Err(anyhow!("charts.capacity must be at least 1"));
        }
        Ok(())
    }
}

impl std::str::FromStr for DashboardConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: DashboardConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Where the simulation backend lives.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: Url,
    #[serde(default = "default_request_timeout", rename = "request_timeout_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub request_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl BackendConfig {
    pub fn validate(&self) -> Result<()> {
        if self.base_url.cannot_be_a_base() {
            return Err(anyhow!(
                "backend.base_url {} cannot be used as a base url",
                self.base_url
            ));
        }
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "backend.base_url must use http or https, got {}",
                self.base_url.scheme()
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(anyhow!("backend.request_timeout_ms must be positive"));
        }
        Ok(())
    }
}

/// Tick cadence and speed bounds for the session controller.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_initial_speed")]
    pub initial_speed: u32,
    #[serde(default = "default_max_speed")]
    pub max_speed: u32,
    /// Charts are appended every N ticks.
    #[serde(default = "default_chart_every_ticks")]
    pub chart_every_ticks: u64,
    /// The agent selector (and selected timeline) refresh every N ticks.
    #[serde(default = "default_selector_every_ticks")]
    pub selector_every_ticks: u64,
    #[serde(default = "default_log_poll_interval", rename = "log_poll_interval_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub log_poll_interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_speed: default_initial_speed(),
            max_speed: default_max_speed(),
            chart_every_ticks: default_chart_every_ticks(),
            selector_every_ticks: default_selector_every_ticks(),
            log_poll_interval: default_log_poll_interval(),
        }
    }
}

impl PollingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_speed == 0 {
            return Err(anyhow!("polling.max_speed must be at least 1"));
        }
        if self.initial_speed == 0 || self.initial_speed > self.max_speed {
            return Err(anyhow!(
                "polling.initial_speed must be within 1..={}, got {}",
                self.max_speed,
                self.initial_speed
            ));
        }
        if self.chart_every_ticks == 0 || self.selector_every_ticks == 0 {
            return Err(anyhow!("polling cadences must be at least 1 tick"));
        }
        if self.log_poll_interval.is_zero() {
            return Err(anyhow!("polling.log_poll_interval_ms must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartsConfig {
    #[serde(default = "default_chart_capacity")]
    pub capacity: usize,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            capacity: default_chart_capacity(),
        }
    }
}

/// What happens to a marker whose entity is absent from a later snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerRetention {
    /// Markers stay on the map until the next full reset.
    #[default]
    KeepUntilReset,
    /// Markers are removed as soon as a snapshot omits their entity.
    PruneMissing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerConfig {
    #[serde(default = "default_low_battery_threshold")]
    pub low_battery_threshold: f64,
    #[serde(default)]
    pub retention: MarkerRetention,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            low_battery_threshold: default_low_battery_threshold(),
            retention: MarkerRetention::default(),
        }
    }
}

impl MarkerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.low_battery_threshold) {
            return Err(anyhow!(
                "markers.low_battery_threshold must be within [0, 1], got {}",
                self.low_battery_threshold
            ));
        }
        Ok(())
    }
}

/// Default world size requested by the regenerate command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateConfig {
    #[serde(default = "default_num_evs")]
    pub num_evs: u32,
    #[serde(default = "default_num_stations")]
    pub num_stations: u32,
    #[serde(default = "default_num_nodes")]
    pub num_nodes: u32,
    #[serde(default = "default_num_routes")]
    pub num_routes: u32,
    #[serde(default)]
    pub use_cache: Option<bool>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            num_evs: default_num_evs(),
            num_stations: default_num_stations(),
            num_nodes: default_num_nodes(),
            num_routes: default_num_routes(),
            use_cache: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}
