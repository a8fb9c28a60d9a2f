//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Dashboard synchronisation and rendering core."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Keeps one map marker per agent and per station, keyed by entity id.
//!
//! Markers are created the first time an id is seen and mutated in place
//! afterwards. Whether markers of entities missing from a snapshot survive is
//! decided by [`MarkerRetention`].

use std::collections::HashSet;

use evq_client::{AgentState, StationState};
use evq_common::{MarkerConfig, MarkerRetention};
use indexmap::IndexMap;
use tracing::debug;

use crate::surface::{MapSurface, MarkerHandle, MarkerStyle, PopupContent, Rgb, SurfaceError};

const AGENT_SCALE: u8 = 7;
const AGENT_Z_INDEX: i32 = 5;
const STATION_SCALE: u8 = 10;
const STATION_Z_INDEX: i32 = 10;
const AGENT_STROKE: Rgb = Rgb::from_hex(0x000000);
const STATION_STROKE: Rgb = Rgb::from_hex(0x388E3C);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerColor {
    Charging,
    Queued,
    LowBattery,
    Idle,
    Station,
}

impl MarkerColor {
    pub fn rgb(self) -> Rgb {
        match self {
            MarkerColor::Charging | MarkerColor::Station => Rgb::from_hex(0x4CAF50),
            MarkerColor::Queued => Rgb::from_hex(0xFFC107),
            MarkerColor::LowBattery => Rgb::from_hex(0xF44336),
            MarkerColor::Idle => Rgb::from_hex(0x2196F3),
        }
    }
}

/// Colour priority: charging, then queued, then low battery.
pub fn agent_color(agent: &AgentState, low_battery_threshold: f64) -> MarkerColor {
    if agent.charging {
        MarkerColor::Charging
    } else if agent.in_queue {
        MarkerColor::Queued
    } else if agent.state_of_charge < low_battery_threshold {
        MarkerColor::LowBattery
    } else {
        MarkerColor::Idle
    }
}

pub fn agent_style(agent: &AgentState, low_battery_threshold: f64) -> MarkerStyle {
    MarkerStyle {
        fill: agent_color(agent, low_battery_threshold).rgb(),
        stroke: AGENT_STROKE,
        scale: AGENT_SCALE,
        z_index: AGENT_Z_INDEX,
        title: format!("EV {} ({:.1}%)", agent.id, agent.state_of_charge * 100.0),
    }
}

pub fn station_style(station: &StationState) -> MarkerStyle {
    MarkerStyle {
        fill: MarkerColor::Station.rgb(),
        stroke: STATION_STROKE,
        scale: STATION_SCALE,
        z_index: STATION_Z_INDEX,
        title: format!("Station {} ({} chargers)", station.id, station.charger_count),
    }
}

pub fn agent_popup(agent: &AgentState) -> PopupContent {
    let status = if agent.charging {
        "Charging"
    } else if agent.in_queue {
        "In Queue"
    } else {
        "Driving"
    };
    let mut lines = vec![
        format!("Battery: {:.1}%", agent.state_of_charge * 100.0),
        format!("Status: {status}"),
    ];
    if let Some(station) = agent.assigned_station.as_deref().filter(|id| !id.is_empty()) {
        lines.push(format!("Assigned to: Station {station}"));
    }
    if agent.waiting_time_seconds > 0.0 {
        lines.push(format!(
            "Wait time: {}s",
            plain_number(agent.waiting_time_seconds)
        ));
    }
    PopupContent {
        heading: format!("EV {}", agent.id),
        lines,
    }
}

pub fn station_popup(station: &StationState) -> PopupContent {
    PopupContent {
        heading: format!("Station {}", station.id),
        lines: vec![
            format!("Chargers: {}", station.charger_count),
            format!("Charging Rate: {} kW", plain_number(station.charging_rate_kw)),
            format!("Queue: {}", station.queue_length),
            format!("EVs Charging: {}", station.charging_agent_ids.len()),
        ],
    }
}

/// Integral values print without a fractional part.
pub(crate) fn plain_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Marker churn produced by one reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub pruned: usize,
}

pub struct EntityReconciler {
    surface: Box<dyn MapSurface>,
    agents: IndexMap<String, MarkerHandle>,
    stations: IndexMap<String, MarkerHandle>,
    low_battery_threshold: f64,
    retention: MarkerRetention,
}

impl EntityReconciler {
    pub fn new(surface: Box<dyn MapSurface>, config: &MarkerConfig) -> Self {
        Self {
            surface,
            agents: IndexMap::new(),
            stations: IndexMap::new(),
            low_battery_threshold: config.low_battery_threshold,
            retention: config.retention,
        }
    }

    pub fn reconcile(
        &mut self,
        agents: &[AgentState],
        stations: &[StationState],
    ) -> Result<ReconcileReport, SurfaceError> {
        let mut report = ReconcileReport::default();

        for agent in agents {
            let style = agent_style(agent, self.low_battery_threshold);
            let popup = agent_popup(agent);
            match self.agents.get(&agent.id) {
                Some(&handle) => {
                    self.surface.update_marker_position(handle, agent.position)?;
                    self.surface.update_marker_style(handle, &style)?;
                    self.surface.attach_detail_popup(handle, &popup)?;
                    report.updated += 1;
                }
                None => {
                    let handle = self.surface.create_point_marker(agent.position, &style)?;
                    self.agents.insert(agent.id.clone(), handle);
                    self.surface.attach_detail_popup(handle, &popup)?;
                    report.created += 1;
                }
            }
        }

        for station in stations {
            let style = station_style(station);
            let popup = station_popup(station);
            match self.stations.get(&station.id) {
                Some(&handle) => {
                    self.surface
                        .update_marker_position(handle, station.location)?;
                    self.surface.update_marker_style(handle, &style)?;
                    self.surface.attach_detail_popup(handle, &popup)?;
                    report.updated += 1;
                }
                None => {
                    let handle = self
                        .surface
                        .create_point_marker(station.location, &style)?;
                    self.stations.insert(station.id.clone(), handle);
                    self.surface.attach_detail_popup(handle, &popup)?;
                    report.created += 1;
                }
            }
        }

        if self.retention == MarkerRetention::PruneMissing {
            let live: HashSet<&str> = agents.iter().map(|agent| agent.id.as_str()).collect();
            report.pruned += prune(self.surface.as_mut(), &mut self.agents, &live)?;
            let live: HashSet<&str> = stations
                .iter()
                .map(|station| station.id.as_str())
                .collect();
            report.pruned += prune(self.surface.as_mut(), &mut self.stations, &live)?;
        }

        debug!(
            created = report.created,
            updated = report.updated,
            pruned = report.pruned,
            "markers reconciled"
        );
        Ok(report)
    }

    /// Detach every marker and forget all ids. Returns the number removed.
    ///
    /// An id is forgotten only after its marker left the surface.
    pub fn clear_all(&mut self) -> Result<usize, SurfaceError> {
        let removed = forget_all(self.surface.as_mut(), &mut self.agents)?;
        Ok(removed + forget_all(self.surface.as_mut(), &mut self.stations)?)
    }

    /// Full reset followed by a reload from freshly fetched entities.
    pub fn reset_all(
        &mut self,
        agents: &[AgentState],
        stations: &[StationState],
    ) -> Result<ReconcileReport, SurfaceError> {
        self.clear_all()?;
        self.reconcile(agents, stations)
    }

    pub fn agent_handle(&self, id: &str) -> Option<MarkerHandle> {
        self.agents.get(id).copied()
    }

    pub fn station_handle(&self, id: &str) -> Option<MarkerHandle> {
        self.stations.get(id).copied()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }
}

fn forget_all(
    surface: &mut dyn MapSurface,
    markers: &mut IndexMap<String, MarkerHandle>,
) -> Result<usize, SurfaceError> {
    let mut removed = 0;
    while let Some((_, handle)) = markers.last() {
        surface.remove_marker(*handle)?;
        markers.pop();
        removed += 1;
    }
    Ok(removed)
}

fn prune(
    surface: &mut dyn MapSurface,
    markers: &mut IndexMap<String, MarkerHandle>,
    live: &HashSet<&str>,
) -> Result<usize, SurfaceError> {
    let stale: Vec<String> = markers
        .keys()
        .filter(|id| !live.contains(id.as_str()))
        .cloned()
        .collect();
    for id in &stale {
        if let Some(handle) = markers.get(id) {
            surface.remove_marker(*handle)?;
            markers.shift_remove(id);
        }
    }
    Ok(stale.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use evq_client::LatLng;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct World {
        next: u64,
        markers: HashMap<MarkerHandle, (LatLng, MarkerStyle, Option<PopupContent>)>,
        created: usize,
        reject_removal: bool,
    }

    #[derive(Clone, Default)]
    struct FakeMap(Arc<Mutex<World>>);

    impl MapSurface for FakeMap {
        fn create_point_marker(&mut self, position: LatLng, style: &MarkerStyle) -> Result<MarkerHandle, SurfaceError> {
            let mut world = self.0.lock().unwrap();
            world.next += 1;
            world.created += 1;
            let handle = MarkerHandle(world.next);
            world.markers.insert(handle, (position, style.clone(), None));
            Ok(handle)
        }

        fn update_marker_position(&mut self, handle: MarkerHandle, position: LatLng) -> Result<(), SurfaceError> {
            let mut world = self.0.lock().unwrap();
            let marker = world.markers.get_mut(&handle).ok_or(SurfaceError::UnknownMarker(handle))?;
            marker.0 = position;
            Ok(())
        }

        fn update_marker_style(&mut self, handle: MarkerHandle, style: &MarkerStyle) -> Result<(), SurfaceError> {
            let mut world = self.0.lock().unwrap();
            let marker = world.markers.get_mut(&handle).ok_or(SurfaceError::UnknownMarker(handle))?;
            marker.1 = style.clone();
            Ok(())
        }

        fn attach_detail_popup(&mut self, handle: MarkerHandle, popup: &PopupContent) -> Result<(), SurfaceError> {
            let mut world = self.0.lock().unwrap();
            let marker = world.markers.get_mut(&handle).ok_or(SurfaceError::UnknownMarker(handle))?;
            marker.2 = Some(popup.clone());
            Ok(())
        }

        fn remove_marker(&mut self, handle: MarkerHandle) -> Result<(), SurfaceError> {
            let mut world = self.0.lock().unwrap();
            if world.reject_removal {
                return Err(SurfaceError::Unavailable("map detached".into()));
            }
            world.markers.remove(&handle).map(|_| ()).ok_or(SurfaceError::UnknownMarker(handle))
        }
    }

    fn agent(id: &str, charging: bool, in_queue: bool, soc: f64) -> AgentState {
        AgentState {
            charging,
            in_queue,
            ..AgentState::new(id, LatLng::new(12.9, 77.6), soc)
        }
    }

    fn station(id: &str) -> StationState {
        StationState::new(id, LatLng::new(12.95, 77.55), 4)
    }

    #[test]
    fn color_priority_is_total_and_deterministic() {
        let threshold = 0.2;
        for charging in [false, true] {
            for in_queue in [false, true] {
                for soc in [0.1, 0.8] {
                    let expected = if charging {
                        MarkerColor::Charging
                    } else if in_queue {
                        MarkerColor::Queued
                    } else if soc < threshold {
                        MarkerColor::LowBattery
                    } else {
                        MarkerColor::Idle
                    };
                    let subject = agent("ev-1", charging, in_queue, soc);
                    assert_eq!(agent_color(&subject, threshold), expected);
                    assert_eq!(agent_color(&subject, threshold), expected);
                }
            }
        }
        assert_eq!(
            agent_color(&agent("ev-1", true, true, 0.1), threshold),
            MarkerColor::Charging
        );
    }

    #[test]
    fn repeated_reconcile_never_duplicates_handles() {
        let map = FakeMap::default();
        let mut reconciler = EntityReconciler::new(Box::new(map.clone()), &MarkerConfig::default());
        let agents = vec![agent("ev-1", false, false, 0.5), agent("ev-2", false, true, 0.5)];
        let stations = vec![station("station-1")];

        let first = reconciler.reconcile(&agents, &stations).unwrap();
        let handle = reconciler.agent_handle("ev-1").unwrap();
        for _ in 0..5 {
            let report = reconciler.reconcile(&agents, &stations).unwrap();
            assert_eq!(report.created, 0);
            assert_eq!(report.updated, 3);
        }
        assert_eq!(first.created, 3);
        assert_eq!(reconciler.agent_handle("ev-1"), Some(handle));
        assert_eq!(map.0.lock().unwrap().created, 3);
    }

    #[test]
    fn update_moves_and_restyles_in_place() {
        let map = FakeMap::default();
        let mut reconciler = EntityReconciler::new(Box::new(map.clone()), &MarkerConfig::default());
        reconciler.reconcile(&[agent("ev-1", false, false, 0.5)], &[]).unwrap();

        let mut moved = agent("ev-1", true, false, 0.55);
        moved.position = LatLng::new(13.0, 77.7);
        reconciler.reconcile(&[moved], &[]).unwrap();

        let handle = reconciler.agent_handle("ev-1").unwrap();
        let world = map.0.lock().unwrap();
        let (position, style, popup) = &world.markers[&handle];
        assert_eq!(*position, LatLng::new(13.0, 77.7));
        assert_eq!(style.fill, MarkerColor::Charging.rgb());
        assert_eq!(style.title, "EV ev-1 (55.0%)");
        assert!(popup.as_ref().unwrap().lines.contains(&"Status: Charging".to_owned()));
    }

    #[test]
    fn missing_entities_keep_markers_by_default() {
        let map = FakeMap::default();
        let mut reconciler = EntityReconciler::new(Box::new(map.clone()), &MarkerConfig::default());
        reconciler
            .reconcile(&[agent("ev-1", false, false, 0.5), agent("ev-2", false, false, 0.5)], &[])
            .unwrap();
        reconciler.reconcile(&[agent("ev-1", false, false, 0.5)], &[]).unwrap();
        assert_eq!(reconciler.agent_count(), 2);
        assert_eq!(map.0.lock().unwrap().markers.len(), 2);
    }

    #[test]
    fn prune_policy_removes_missing_entities() {
        let map = FakeMap::default();
        let config = MarkerConfig {
            retention: MarkerRetention::PruneMissing,
            ..MarkerConfig::default()
        };
        let mut reconciler = EntityReconciler::new(Box::new(map.clone()), &config);
        reconciler
            .reconcile(&[agent("ev-1", false, false, 0.5), agent("ev-2", false, false, 0.5)], &[station("station-1")])
            .unwrap();
        let report = reconciler.reconcile(&[agent("ev-2", false, false, 0.5)], &[]).unwrap();
        assert_eq!(report.pruned, 2);
        assert!(reconciler.agent_handle("ev-1").is_none());
        assert_eq!(map.0.lock().unwrap().markers.len(), 1);
    }

    #[test]
    fn reset_all_replaces_every_marker() {
        let map = FakeMap::default();
        let mut reconciler = EntityReconciler::new(Box::new(map.clone()), &MarkerConfig::default());
        reconciler.reconcile(&[agent("ev-1", false, false, 0.5)], &[station("station-1")]).unwrap();
        let report = reconciler
            .reset_all(&[agent("ev-9", false, false, 0.5)], &[])
            .unwrap();
        assert_eq!(report.created, 1);
        assert!(reconciler.agent_handle("ev-1").is_none());
        assert_eq!(reconciler.station_count(), 0);
        assert_eq!(map.0.lock().unwrap().markers.len(), 1);
    }

    #[test]
    fn failed_removal_keeps_marker_tracked() {
        let map = FakeMap::default();
        let mut reconciler = EntityReconciler::new(Box::new(map.clone()), &MarkerConfig::default());
        reconciler
            .reconcile(&[agent("ev-1", false, false, 0.5)], &[station("station-1")])
            .unwrap();
        map.0.lock().unwrap().reject_removal = true;
        assert!(reconciler.clear_all().is_err());
        assert_eq!(reconciler.agent_count() + reconciler.station_count(), 2);

        map.0.lock().unwrap().reject_removal = false;
        assert_eq!(reconciler.clear_all().unwrap(), 2);
        assert_eq!(reconciler.agent_count() + reconciler.station_count(), 0);
        assert!(map.0.lock().unwrap().markers.is_empty());
    }

    #[test]
    fn popups_follow_the_dashboard_wording() {
        let mut queued = agent("ev-3", false, true, 0.123);
        queued.assigned_station = Some("station-2".into());
        queued.waiting_time_seconds = 45.0;
        let popup = agent_popup(&queued);
        assert_eq!(popup.heading, "EV ev-3");
        assert_eq!(
            popup.lines,
            vec![
                "Battery: 12.3%",
                "Status: In Queue",
                "Assigned to: Station station-2",
                "Wait time: 45s"
            ]
        );

        let mut busy = station("station-2");
        busy.charging_rate_kw = 22.0;
        busy.queue_length = 3;
        busy.charging_agent_ids = vec!["ev-1".into(), "ev-4".into()];
        assert_eq!(
            station_popup(&busy).lines,
            vec!["Chargers: 4", "Charging Rate: 22 kW", "Queue: 3", "EVs Charging: 2"]
        );
        assert_eq!(station_style(&busy).title, "Station station-2 (4 chargers)");
    }
}
