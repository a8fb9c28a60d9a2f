//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Control CLI for operators of the charging-queue simulation."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use evq_client::HttpSimulationClient;
use evq_common::DashboardConfig;
use evq_logging as logging;
use url::Url;

mod inspect;
mod lifecycle;

#[derive(Debug, Parser)]
#[command(author, version, about = "EV charging-queue simulation control utility", long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionOptions,
    #[command(subcommand)]
    command: Commands,
}

/// Where the backend lives.
#[derive(Debug, Args)]
pub struct ConnectionOptions {
    /// Configuration file providing the backend section.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
    /// Backend base URL, overriding the configuration file.
    #[arg(long, env = "EVQ_BACKEND_URL", global = true)]
    pub base_url: Option<Url>,
    /// Print raw JSON instead of tables.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(flatten)]
    Control(lifecycle::ControlCommand),
    #[command(flatten)]
    Inspect(inspect::InspectCommand),
}

impl ConnectionOptions {
    fn load_config(&self) -> Result<DashboardConfig> {
        let mut config = match &self.config {
            Some(path) => DashboardConfig::from_path(path)?,
            None => DashboardConfig::load(&["configs/evq.toml", "evq.toml"])?,
        };
        if let Some(base_url) = &self.base_url {
            config.backend.base_url = base_url.clone();
        }
        config.validate()?;
        Ok(config)
    }

    fn client(&self) -> Result<(HttpSimulationClient, DashboardConfig)> {
        let config = self.load_config()?;
        let client = HttpSimulationClient::from_config(&config.backend)?;
        Ok((client, config))
    }
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let (client, config) = cli.connection.client()?;
    let runtime = tokio::runtime::Runtime::new()?;
    match cli.command {
        Commands::Control(cmd) => runtime.block_on(lifecycle::run(&client, &config, cmd))?,
        Commands::Inspect(cmd) => {
            runtime.block_on(inspect::run(&client, &config, cmd, cli.connection.json))?
        }
    }
    Ok(())
}
