//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Simulation backend client and wire model."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Wire model of the simulation backend. Field names on the wire follow the
//! backend (`evs`, `soc`, `num_chargers`, ...); the Rust names follow the
//! dashboard vocabulary.

use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime};
use evq_common::GenerateConfig;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Geographic position, serialised as a `[lat, lng]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl From<LatLng> for [f64; 2] {
    fn from(value: LatLng) -> Self {
        [value.lat, value.lng]
    }
}

/// One mobile agent (an EV) as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub id: String,
    #[serde(rename = "current_position")]
    pub position: LatLng,
    /// Fractional battery level in `[0, 1]`.
    #[serde(rename = "soc")]
    pub state_of_charge: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_soc: Option<f64>,
    pub charging: bool,
    pub in_queue: bool,
    #[serde(default)]
    pub assigned_station: Option<String>,
    #[serde(rename = "waiting_time", default)]
    pub waiting_time_seconds: f64,
    #[serde(default)]
    pub trip_completed: bool,
    #[serde(default)]
    pub abandoned: bool,
}

impl AgentState {
    /// A driving agent with no station assignment.
    pub fn new(id: impl Into<String>, position: LatLng, state_of_charge: f64) -> Self {
        Self {
            id: id.into(),
            position,
            state_of_charge,
            target_soc: None,
            charging: false,
            in_queue: false,
            assigned_station: None,
            waiting_time_seconds: 0.0,
            trip_completed: false,
            abandoned: false,
        }
    }
}

/// A charging station as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationState {
    pub id: String,
    pub location: LatLng,
    #[serde(rename = "num_chargers")]
    pub charger_count: u32,
    #[serde(rename = "charging_rate")]
    pub charging_rate_kw: f64,
    pub queue_length: u32,
    #[serde(rename = "charging_evs", default)]
    pub charging_agent_ids: Vec<String>,
    #[serde(default)]
    pub total_served: u64,
    #[serde(default)]
    pub average_wait_time: f64,
}

impl StationState {
    pub fn new(id: impl Into<String>, location: LatLng, charger_count: u32) -> Self {
        Self {
            id: id.into(),
            location,
            charger_count,
            charging_rate_kw: 7.0,
            queue_length: 0,
            charging_agent_ids: Vec::new(),
            total_served: 0,
            average_wait_time: 0.0,
        }
    }
}

/// Aggregate metrics computed by the backend each step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(rename = "average_wait_time")]
    pub average_wait_time_seconds: f64,
    pub max_queue_length: u32,
    pub completion_rate: f64,
    pub abandoned_rate: f64,
    #[serde(rename = "optimization_time", default)]
    pub optimization_time_seconds: f64,
}

/// One full, self-consistent read of the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub step: u64,
    #[serde(rename = "evs")]
    pub agents: Vec<AgentState>,
    pub stations: Vec<StationState>,
    pub metrics: MetricsSnapshot,
}

/// Recorded step returned by the history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub step: u64,
    #[serde(default)]
    pub timestamp: Option<EventTimestamp>,
    #[serde(rename = "evs", default)]
    pub agents: Vec<AgentState>,
    #[serde(default)]
    pub stations: Vec<StationState>,
    pub metrics: MetricsSnapshot,
    #[serde(default)]
    pub optimization_logs: Vec<String>,
}

/// Kind of a journey event. Unknown kinds are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Initialized,
    Moved,
    StartedCharging,
    ChargingProgress,
    ChargingComplete,
    JoinedQueue,
    InsufficientBattery,
    ChargingNeeded,
    Abandoned,
    TripCompleted,
    Other(String),
}

impl EventType {
    /// Human readable name as emitted by the backend.
    pub fn display_name(&self) -> &str {
        match self {
            EventType::Initialized => "Initialized",
            EventType::Moved => "Moved",
            EventType::StartedCharging => "Started Charging",
            EventType::ChargingProgress => "Charging Progress",
            EventType::ChargingComplete => "Charging Complete",
            EventType::JoinedQueue => "Joined Queue",
            EventType::InsufficientBattery => "Insufficient Battery",
            EventType::ChargingNeeded => "Charging Needed",
            EventType::Abandoned => "Abandoned",
            EventType::TripCompleted => "Trip Completed",
            EventType::Other(raw) => raw,
        }
    }
}

impl From<String> for EventType {
    fn from(raw: String) -> Self {
        // "Started Charging", "StartedCharging" and "started_charging" are the same kind.
        let key: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "initialized" => EventType::Initialized,
            "moved" => EventType::Moved,
            "startedcharging" => EventType::StartedCharging,
            "chargingprogress" => EventType::ChargingProgress,
            "chargingcomplete" => EventType::ChargingComplete,
            "joinedqueue" => EventType::JoinedQueue,
            "insufficientbattery" => EventType::InsufficientBattery,
            "chargingneeded" => EventType::ChargingNeeded,
            "abandoned" => EventType::Abandoned,
            "tripcompleted" => EventType::TripCompleted,
            _ => EventType::Other(raw),
        }
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        match value {
            EventType::Other(raw) => raw,
            known => known.display_name().to_owned(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Event timestamp. The backend emits naive ISO-8601 local times; offsets
/// are accepted and converted to local time. Unparseable values are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct EventTimestamp {
    raw: String,
    parsed: Option<NaiveDateTime>,
}

impl EventTimestamp {
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn parsed(&self) -> Option<NaiveDateTime> {
        self.parsed
    }

    /// `HH:MM:SS`, or the raw text when it could not be parsed.
    pub fn display_time(&self) -> String {
        match self.parsed {
            Some(at) => at.format("%H:%M:%S").to_string(),
            None => self.raw.clone(),
        }
    }
}

impl From<String> for EventTimestamp {
    fn from(raw: String) -> Self {
        let trimmed = raw.trim();
        let parsed = DateTime::parse_from_rfc3339(trimmed)
            .map(|at| at.with_timezone(&Local).naive_local())
            .ok()
            .or_else(|| trimmed.parse::<NaiveDateTime>().ok())
            .or_else(|| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f").ok());
        Self { raw, parsed }
    }
}

impl From<EventTimestamp> for String {
    fn from(value: EventTimestamp) -> Self {
        value.raw
    }
}

/// One entry of an agent's journey log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyEvent {
    pub timestamp: EventTimestamp,
    #[serde(rename = "event")]
    pub event_type: EventType,
    #[serde(default)]
    pub details: IndexMap<String, Value>,
}

/// Payload of `GET /api/ev/journey-log/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JourneyLogResponse {
    #[serde(default, rename = "ev_id")]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub journey_log: Option<Vec<JourneyEvent>>,
}

/// Payload of `GET /api/optimization/logs`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogsResponse {
    #[serde(default)]
    pub logs: Vec<String>,
}

/// Acknowledgement returned by every lifecycle endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandAck {
    pub success: bool,
}

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateParams {
    #[serde(rename = "num_evs")]
    pub num_agents: u32,
    pub num_stations: u32,
    pub num_nodes: u32,
    pub num_routes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_cache: Option<bool>,
}

impl From<&GenerateConfig> for GenerateParams {
    fn from(config: &GenerateConfig) -> Self {
        Self {
            num_agents: config.num_evs,
            num_stations: config.num_stations,
            num_nodes: config.num_nodes,
            num_routes: config.num_routes,
            use_cache: config.use_cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn agent_uses_backend_field_names() {
        let agent: AgentState = serde_json::from_value(json!({
            "id": "ev-1",
            "current_position": [12.97, 77.59],
            "soc": 0.42,
            "target_soc": 0.8,
            "charging": false,
            "in_queue": true,
            "assigned_station": "station-3",
            "waiting_time": 120,
            "trip_completed": false,
            "abandoned": false,
            "journey_log": []
        }))
        .unwrap();
        assert_eq!(agent.position, LatLng::new(12.97, 77.59));
        assert_eq!(agent.assigned_station.as_deref(), Some("station-3"));
        assert_eq!(agent.waiting_time_seconds, 120.0);
        assert!(agent.in_queue);
    }

    #[test]
    fn snapshot_maps_evs_to_agents() {
        let snapshot: SimulationSnapshot = serde_json::from_value(json!({
            "step": 7,
            "evs": [],
            "stations": [{
                "id": "station-1",
                "location": [12.9, 77.6],
                "num_chargers": 2,
                "charging_rate": 22.0,
                "queue_length": 3,
                "charging_evs": ["ev-4"]
            }],
            "metrics": {
                "average_wait_time": 90.0,
                "max_queue_length": 3,
                "completion_rate": 0.5,
                "abandoned_rate": 0.1,
                "optimization_time": 0.012,
                "station_utilization": {"station-1": 0.5}
            }
        }))
        .unwrap();
        assert_eq!(snapshot.step, 7);
        assert_eq!(snapshot.stations[0].charging_agent_ids, vec!["ev-4"]);
        assert_eq!(snapshot.metrics.max_queue_length, 3);
    }

    #[test]
    fn event_type_accepts_display_and_compact_spellings() {
        assert_eq!(
            EventType::from("Started Charging".to_owned()),
            EventType::StartedCharging
        );
        assert_eq!(
            EventType::from("StartedCharging".to_owned()),
            EventType::StartedCharging
        );
        assert_eq!(
            EventType::from("Solar Flare".to_owned()),
            EventType::Other("Solar Flare".to_owned())
        );
        assert_eq!(String::from(EventType::JoinedQueue), "Joined Queue");
    }

    #[test]
    fn naive_timestamps_format_as_wall_clock() {
        let ts = EventTimestamp::from("2024-03-01T08:15:42.123456".to_owned());
        assert_eq!(ts.display_time(), "08:15:42");
        let ts = EventTimestamp::from("2024-03-01T08:15:42".to_owned());
        assert_eq!(ts.display_time(), "08:15:42");
    }

    #[test]
    fn unparseable_timestamp_is_shown_verbatim() {
        let ts = EventTimestamp::from("yesterday".to_owned());
        assert!(ts.parsed().is_none());
        assert_eq!(ts.display_time(), "yesterday");
    }

    #[test]
    fn journey_details_keep_backend_order() {
        let event: JourneyEvent = serde_json::from_value(json!({
            "timestamp": "2024-03-01T08:15:42",
            "event": "Moved",
            "details": {"from": "Node A", "to": "Node B", "distance": "1.20 km"}
        }))
        .unwrap();
        let keys: Vec<&str> = event.details.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["from", "to", "distance"]);
    }

    #[test]
    fn generate_params_serialise_with_backend_names() {
        let params = GenerateParams::from(&GenerateConfig::default());
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(
            value,
            json!({"num_evs": 100, "num_stations": 20, "num_nodes": 80, "num_routes": 240})
        );
    }
}
