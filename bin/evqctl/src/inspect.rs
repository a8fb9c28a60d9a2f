//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Control CLI for operators of the charging-queue simulation."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use anyhow::Result;
use clap::Subcommand;
use evq_client::{AgentState, SimulationApi, StationState};
use evq_common::DashboardConfig;
use evq_core::{agent_color, AgentStatus, MetricsDisplay, TimelineItem, LOG_PLACEHOLDER};
use serde::Serialize;

/// Read-only queries against the backend.
#[derive(Debug, Subcommand)]
pub enum InspectCommand {
    /// Current step and aggregate metrics.
    Status,
    /// Every EV with its status and charge.
    Agents,
    /// Every charging station with its queue.
    Stations,
    /// Journey log of one EV.
    Journey {
        /// EV identifier.
        id: String,
    },
    /// Optimisation log lines.
    Logs,
    /// Recorded simulation steps.
    History {
        #[arg(long, default_value_t = 0)]
        start: u64,
        #[arg(long, default_value_t = 100)]
        count: u64,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn run(
    client: &dyn SimulationApi,
    config: &DashboardConfig,
    command: InspectCommand,
    json: bool,
) -> Result<()> {
    match command {
        InspectCommand::Status => {
            let snapshot = client.snapshot().await?;
            if json {
                return print_json(&snapshot);
            }
            let metrics = MetricsDisplay::from(&snapshot.metrics);
            println!("Step:              {}", snapshot.step);
            println!("EVs / stations:    {} / {}", snapshot.agents.len(), snapshot.stations.len());
            println!("Average wait:      {}", metrics.average_wait);
            println!("Max queue:         {}", metrics.max_queue);
            println!("Completion rate:   {}", metrics.completion_rate);
            println!("Abandoned rate:    {}", metrics.abandoned_rate);
            println!("Optimisation time: {}", metrics.optimization_time);
        }
        InspectCommand::Agents => {
            let agents = client.agents().await?;
            if json {
                return print_json(&agents);
            }
            let threshold = config.markers.low_battery_threshold;
            println!("{:<12} {:<10} {:>7} {:<11} {:<12} {:>6}", "ID", "STATUS", "SOC", "MARKER", "STATION", "WAIT");
            for agent in &agents {
                println!("{}", agent_row(agent, threshold));
            }
        }
        InspectCommand::Stations => {
            let stations = client.stations().await?;
            if json {
                return print_json(&stations);
            }
            println!("{:<14} {:>8} {:>6} {:>9} {:>7}", "ID", "CHARGERS", "QUEUE", "CHARGING", "SERVED");
            for station in &stations {
                println!("{}", station_row(station));
            }
        }
        InspectCommand::Journey { id } => {
            let events = client.journey_log(&id).await?;
            if json {
                return print_json(&events);
            }
            if events.is_empty() {
                println!("No journey data available for {id}");
            }
            for item in events.iter().map(TimelineItem::from) {
                println!("{} [{}] {}", item.time, item.category.as_str(), item.title);
                for (label, value) in &item.details {
                    println!("    {label}: {value}");
                }
            }
        }
        InspectCommand::Logs => {
            let logs = client.optimization_logs().await?;
            if json {
                return print_json(&logs);
            }
            if logs.is_empty() {
                println!("{LOG_PLACEHOLDER}");
            }
            for line in logs {
                println!("{line}");
            }
        }
        InspectCommand::History { start, count } => {
            let history = client.history(start, count).await?;
            if json {
                return print_json(&history);
            }
            println!("{:>6} {:>6} {:>10} {:>10}", "STEP", "EVS", "AVG WAIT", "MAX QUEUE");
            for entry in &history {
                let metrics = MetricsDisplay::from(&entry.metrics);
                println!(
                    "{:>6} {:>6} {:>10} {:>10}",
                    entry.step,
                    entry.agents.len(),
                    metrics.average_wait,
                    metrics.max_queue
                );
            }
        }
    }
    Ok(())
}

fn agent_row(agent: &AgentState, low_battery_threshold: f64) -> String {
    format!(
        "{:<12} {:<10} {:>6.1}% {:<11} {:<12} {:>5.0}s",
        agent.id,
        AgentStatus::of(agent).label(),
        agent.state_of_charge * 100.0,
        format!("{:?}", agent_color(agent, low_battery_threshold)),
        agent.assigned_station.as_deref().unwrap_or("-"),
        agent.waiting_time_seconds
    )
}

fn station_row(station: &StationState) -> String {
    format!(
        "{:<14} {:>8} {:>6} {:>9} {:>7}",
        station.id,
        station.charger_count,
        station.queue_length,
        station.charging_agent_ids.len(),
        station.total_served
    )
}
