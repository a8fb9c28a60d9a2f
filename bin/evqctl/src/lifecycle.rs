//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Control CLI for operators of the charging-queue simulation."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use evq_client::{GenerateParams, LifecycleCommand, SimulationApi};
use evq_common::DashboardConfig;
use evq_logging::{log_system_event, LogContext, SystemEventOutcome};

/// Commands that change the simulation lifecycle.
#[derive(Debug, Subcommand)]
pub enum ControlCommand {
    /// Start stepping the simulation.
    Start,
    /// Stop stepping the simulation.
    Stop,
    /// Rewind the simulation to its initial state.
    Reset,
    /// Build a new world. Omitted sizes come from the configuration.
    Generate(GenerateArgs),
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Number of EVs.
    #[arg(long)]
    pub evs: Option<u32>,
    /// Number of charging stations.
    #[arg(long)]
    pub stations: Option<u32>,
    /// Number of road network nodes.
    #[arg(long)]
    pub nodes: Option<u32>,
    /// Number of precomputed routes.
    #[arg(long)]
    pub routes: Option<u32>,
    /// Ask the backend to rebuild the road network instead of reusing its cache.
    #[arg(long)]
    pub no_cache: bool,
}

impl GenerateArgs {
    fn params(&self, config: &DashboardConfig) -> GenerateParams {
        let mut params = GenerateParams::from(&config.generate);
        if let Some(evs) = self.evs {
            params.num_agents = evs;
        }
        if let Some(stations) = self.stations {
            params.num_stations = stations;
        }
        if let Some(nodes) = self.nodes {
            params.num_nodes = nodes;
        }
        if let Some(routes) = self.routes {
            params.num_routes = routes;
        }
        if self.no_cache {
            params.use_cache = Some(false);
        }
        params
    }
}

pub async fn run(
    client: &dyn SimulationApi,
    config: &DashboardConfig,
    command: ControlCommand,
) -> Result<()> {
    let command = match command {
        ControlCommand::Start => LifecycleCommand::Start,
        ControlCommand::Stop => LifecycleCommand::Stop,
        ControlCommand::Reset => LifecycleCommand::Reset,
        ControlCommand::Generate(args) => LifecycleCommand::Generate(args.params(config)),
    };
    let label = command.label();
    let context = LogContext::new().with_command(label);
    match client.execute(&command).await {
        Ok(()) => {
            log_system_event(
                Some(&context),
                &format!("ctl.{label}"),
                "acknowledged",
                SystemEventOutcome::Success,
            );
            if let LifecycleCommand::Generate(params) = &command {
                println!(
                    "Generated {} EVs and {} stations ({} nodes, {} routes)",
                    params.num_agents, params.num_stations, params.num_nodes, params.num_routes
                );
            } else {
                println!("{label}: ok");
            }
            Ok(())
        }
        Err(err) => {
            log_system_event(
                Some(&context),
                &format!("ctl.{label}"),
                &err.to_string(),
                SystemEventOutcome::Fault,
            );
            Err(err).with_context(|| format!("{label} failed"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_flags_override_configuration() {
        let config = DashboardConfig::default();
        let args = GenerateArgs {
            evs: Some(12),
            stations: None,
            nodes: Some(40),
            routes: None,
            no_cache: true,
        };
        let params = args.params(&config);
        assert_eq!(params.num_agents, 12);
        assert_eq!(params.num_stations, config.generate.num_stations);
        assert_eq!(params.num_nodes, 40);
        assert_eq!(params.use_cache, Some(false));
    }
}
