//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives for the dashboard runtime."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Shared primitives for the EVQ dashboard workspace.
//! This crate exposes configuration loading and tracing setup consumed by
//! the client, the core engine and both binaries.

pub mod config;
pub mod logging;

pub use config::{
    BackendConfig, ChartsConfig, DashboardConfig, GenerateConfig, LoadedConfig, LoggingConfig,
    MarkerConfig, MarkerRetention, PollingConfig,
};
pub use logging::{init_tracing, LogFormat, LogSink};
