//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulation backend client and wire model."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use async_trait::async_trait;

use crate::error::ClientError;
use crate::model::{
    AgentState, GenerateParams, HistoryEntry, JourneyEvent, SimulationSnapshot, StationState,
};

/// Lifecycle request sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleCommand {
    Start,
    Stop,
    Reset,
    Generate(GenerateParams),
}

impl LifecycleCommand {
    /// Endpoint path relative to the backend base url.
    pub fn path(&self) -> &'static str {
        match self {
            LifecycleCommand::Start => "api/simulation/start",
            LifecycleCommand::Stop => "api/simulation/stop",
            LifecycleCommand::Reset => "api/simulation/reset",
            LifecycleCommand::Generate(_) => "api/generate",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LifecycleCommand::Start => "start",
            LifecycleCommand::Stop => "stop",
            LifecycleCommand::Reset => "reset",
            LifecycleCommand::Generate(_) => "generate",
        }
    }
}

/// Read and control surface of the simulation backend.
///
/// Each call is independent and returns a complete resource. Implementations
/// must not cache between calls.
#[async_trait]
pub trait SimulationApi: Send + Sync + 'static {
    async fn agents(&self) -> Result<Vec<AgentState>, ClientError>;

    async fn stations(&self) -> Result<Vec<StationState>, ClientError>;

    /// Ordered journey of one agent. A response without `journey_log` yields
    /// an empty list.
    async fn journey_log(&self, agent_id: &str) -> Result<Vec<JourneyEvent>, ClientError>;

    /// Full snapshot. An `{"error": ...}` body maps to [`ClientError::Backend`].
    async fn snapshot(&self) -> Result<SimulationSnapshot, ClientError>;

    async fn optimization_logs(&self) -> Result<Vec<String>, ClientError>;

    async fn history(&self, start: u64, count: u64) -> Result<Vec<HistoryEntry>, ClientError>;

    /// Issue a lifecycle command. `{"success": false}` maps to
    /// [`ClientError::Rejected`].
    async fn execute(&self, command: &LifecycleCommand) -> Result<(), ClientError>;
}
