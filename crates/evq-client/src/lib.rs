//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulation backend client and wire model."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Data access for the simulation backend. Every call returns a full,
//! typed resource; the client holds no state between calls.

pub mod api;
pub mod error;
pub mod http;
pub mod model;

pub use api::{LifecycleCommand, SimulationApi};
pub use error::ClientError;
pub use http::HttpSimulationClient;
pub use model::{
    AgentState, CommandAck, EventTimestamp, EventType, GenerateParams, HistoryEntry,
    JourneyEvent, JourneyLogResponse, LatLng, LogsResponse, MetricsSnapshot, SimulationSnapshot,
    StationState,
};
