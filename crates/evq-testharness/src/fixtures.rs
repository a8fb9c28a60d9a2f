//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Test harness fixtures, fakes and mock backend."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Deterministic entity builders.

use evq_client::{
    AgentState, EventTimestamp, EventType, JourneyEvent, LatLng, MetricsSnapshot, StationState,
};
use indexmap::IndexMap;
use serde_json::Value;

/// Grid origin used by every fixture.
pub const ORIGIN: LatLng = LatLng::new(12.9716, 77.5946);

pub fn agent(id: &str, soc: f64) -> AgentState {
    AgentState::new(id, ORIGIN, soc)
}

/// `count` agents named `ev-0..`, spread east of the origin with falling charge.
pub fn fleet(count: u32) -> Vec<AgentState> {
    (0..count)
        .map(|index| {
            let position = LatLng::new(ORIGIN.lat, ORIGIN.lng + f64::from(index) * 0.001);
            let soc = 0.9 - f64::from(index % 8) * 0.1;
            AgentState::new(format!("ev-{index}"), position, soc)
        })
        .collect()
}

/// `count` stations named `station-0..`, spread north of the origin.
pub fn stations(count: u32) -> Vec<StationState> {
    (0..count)
        .map(|index| {
            let location = LatLng::new(ORIGIN.lat + f64::from(index) * 0.002, ORIGIN.lng);
            StationState::new(format!("station-{index}"), location, 2)
        })
        .collect()
}

pub fn metrics(average_wait_seconds: f64, max_queue_length: u32) -> MetricsSnapshot {
    MetricsSnapshot {
        average_wait_time_seconds: average_wait_seconds,
        max_queue_length,
        ..MetricsSnapshot::default()
    }
}

pub fn journey_event(timestamp: &str, event: &str, details: &[(&str, Value)]) -> JourneyEvent {
    JourneyEvent {
        timestamp: EventTimestamp::from(timestamp.to_owned()),
        event_type: EventType::from(event.to_owned()),
        details: details
            .iter()
            .map(|(key, value)| ((*key).to_owned(), value.clone()))
            .collect::<IndexMap<_, _>>(),
    }
}

/// Journey a freshly generated agent starts with.
pub fn initial_journey() -> Vec<JourneyEvent> {
    vec![journey_event(
        "2024-03-01T08:00:00",
        "Initialized",
        &[("battery", Value::from("90.0%"))],
    )]
}
