//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Test harness fixtures, fakes and mock backend."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Surfaces that record every call into a shared [`Recorded`] state.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use evq_client::LatLng;
use evq_core::{
    ChartConfig, ChartHandle, ChartSurface, ControlState, LogSurface, MapSurface, MarkerHandle,
    MarkerStyle, MetricsDisplay, MetricsSurface, PopupContent, SelectorOption, SelectorSurface,
    StatusSurface, SurfaceError, SurfaceSet, TimelineItem, TimelinePlaceholder, TimelineSurface,
};
use parking_lot::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMarker {
    pub position: LatLng,
    pub style: MarkerStyle,
    pub popup: Option<PopupContent>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedChart {
    pub config: ChartConfig,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub redraws: usize,
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub markers: BTreeMap<MarkerHandle, RecordedMarker>,
    pub markers_created: usize,
    pub markers_removed: usize,
    pub charts: BTreeMap<ChartHandle, RecordedChart>,
    pub charts_destroyed: usize,
    pub metrics: Option<MetricsDisplay>,
    pub metrics_renders: usize,
    pub timeline: Vec<TimelineItem>,
    pub timeline_placeholder: Option<TimelinePlaceholder>,
    pub timeline_scrolls: usize,
    pub options: Vec<SelectorOption>,
    pub selected: Option<String>,
    pub log_lines: Vec<String>,
    pub log_placeholder: Option<String>,
    pub log_scrolls: usize,
    pub controls: Option<ControlState>,
    pub speed: Option<u32>,
    pub errors: Vec<String>,
    next_handle: u64,
}

impl Recorded {
    /// Marker whose style title matches `title`.
    pub fn marker_titled(&self, title: &str) -> Option<&RecordedMarker> {
        self.markers.values().find(|marker| marker.style.title == title)
    }

    /// Chart with the given title.
    pub fn chart_titled(&self, title: &str) -> Option<&RecordedChart> {
        self.charts.values().find(|chart| chart.config.title == title)
    }

    fn issue(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

/// Name of a surface slot, used to inject render failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Map,
    Charts,
    Metrics,
    Timeline,
    Selector,
    Log,
    Status,
}

#[derive(Default)]
struct Shared {
    state: Mutex<Recorded>,
    broken: Mutex<HashSet<Slot>>,
}

/// Owner of the recorded state. Hands out one surface per slot.
#[derive(Clone, Default)]
pub struct Recorder {
    shared: Arc<Shared>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, Recorded> {
        self.shared.state.lock()
    }

    /// Make every call on `slot` fail until [`repair`](Self::repair).
    pub fn break_slot(&self, slot: Slot) {
        self.shared.broken.lock().insert(slot);
    }

    pub fn repair(&self, slot: Slot) {
        self.shared.broken.lock().remove(&slot);
    }

    /// A surface set with every slot registered.
    pub fn surface_set(&self) -> SurfaceSet {
        SurfaceSet::new()
            .with_map(self.surface(Slot::Map))
            .with_charts(self.surface(Slot::Charts))
            .with_metrics(self.surface(Slot::Metrics))
            .with_timeline(self.surface(Slot::Timeline))
            .with_selector(self.surface(Slot::Selector))
            .with_log(self.surface(Slot::Log))
            .with_status(self.surface(Slot::Status))
    }

    pub fn surface(&self, slot: Slot) -> RecordingSurface {
        RecordingSurface {
            slot,
            shared: self.shared.clone(),
        }
    }
}

/// Implements every surface trait; each instance reports under one slot.
pub struct RecordingSurface {
    slot: Slot,
    shared: Arc<Shared>,
}

impl RecordingSurface {
    fn record<R>(
        &mut self,
        change: impl FnOnce(&mut Recorded) -> Result<R, SurfaceError>,
    ) -> Result<R, SurfaceError> {
        if self.shared.broken.lock().contains(&self.slot) {
            return Err(SurfaceError::Unavailable(format!("{:?} broken", self.slot)));
        }
        change(&mut self.shared.state.lock())
    }
}

fn marker(state: &mut Recorded, handle: MarkerHandle) -> Result<&mut RecordedMarker, SurfaceError> {
    state
        .markers
        .get_mut(&handle)
        .ok_or(SurfaceError::UnknownMarker(handle))
}

impl MapSurface for RecordingSurface {
    fn create_point_marker(
        &mut self,
        position: LatLng,
        style: &MarkerStyle,
    ) -> Result<MarkerHandle, SurfaceError> {
        self.record(|state| {
            let handle = MarkerHandle(state.issue());
            state.markers.insert(
                handle,
                RecordedMarker {
                    position,
                    style: style.clone(),
                    popup: None,
                },
            );
            state.markers_created += 1;
            Ok(handle)
        })
    }

    fn update_marker_position(
        &mut self,
        handle: MarkerHandle,
        position: LatLng,
    ) -> Result<(), SurfaceError> {
        self.record(|state| {
            marker(state, handle)?.position = position;
            Ok(())
        })
    }

    fn update_marker_style(
        &mut self,
        handle: MarkerHandle,
        style: &MarkerStyle,
    ) -> Result<(), SurfaceError> {
        self.record(|state| {
            marker(state, handle)?.style = style.clone();
            Ok(())
        })
    }

    fn attach_detail_popup(
        &mut self,
        handle: MarkerHandle,
        popup: &PopupContent,
    ) -> Result<(), SurfaceError> {
        self.record(|state| {
            marker(state, handle)?.popup = Some(popup.clone());
            Ok(())
        })
    }

    fn remove_marker(&mut self, handle: MarkerHandle) -> Result<(), SurfaceError> {
        self.record(|state| {
            state
                .markers
                .remove(&handle)
                .ok_or(SurfaceError::UnknownMarker(handle))?;
            state.markers_removed += 1;
            Ok(())
        })
    }
}

impl ChartSurface for RecordingSurface {
    fn create_series_chart(&mut self, config: &ChartConfig) -> Result<ChartHandle, SurfaceError> {
        self.record(|state| {
            let handle = ChartHandle(state.issue());
            state.charts.insert(
                handle,
                RecordedChart {
                    config: config.clone(),
                    labels: Vec::new(),
                    values: Vec::new(),
                    redraws: 0,
                },
            );
            Ok(handle)
        })
    }

    fn redraw(
        &mut self,
        handle: ChartHandle,
        labels: &[String],
        series: &[f64],
    ) -> Result<(), SurfaceError> {
        self.record(|state| {
            let chart = state
                .charts
                .get_mut(&handle)
                .ok_or(SurfaceError::UnknownChart(handle))?;
            chart.labels = labels.to_vec();
            chart.values = series.to_vec();
            chart.redraws += 1;
            Ok(())
        })
    }

    fn destroy(&mut self, handle: ChartHandle) -> Result<(), SurfaceError> {
        self.record(|state| {
            state
                .charts
                .remove(&handle)
                .ok_or(SurfaceError::UnknownChart(handle))?;
            state.charts_destroyed += 1;
            Ok(())
        })
    }
}

impl MetricsSurface for RecordingSurface {
    fn show_metrics(&mut self, metrics: &MetricsDisplay) -> Result<(), SurfaceError> {
        self.record(|state| {
            state.metrics = Some(metrics.clone());
            state.metrics_renders += 1;
            Ok(())
        })
    }
}

impl TimelineSurface for RecordingSurface {
    fn clear(&mut self) -> Result<(), SurfaceError> {
        self.record(|state| {
            state.timeline.clear();
            state.timeline_placeholder = None;
            Ok(())
        })
    }

    fn append(&mut self, item: &TimelineItem) -> Result<(), SurfaceError> {
        self.record(|state| {
            state.timeline.push(item.clone());
            Ok(())
        })
    }

    fn show_placeholder(&mut self, placeholder: TimelinePlaceholder) -> Result<(), SurfaceError> {
        self.record(|state| {
            state.timeline.clear();
            state.timeline_placeholder = Some(placeholder);
            Ok(())
        })
    }

    fn scroll_to_latest(&mut self) -> Result<(), SurfaceError> {
        self.record(|state| {
            state.timeline_scrolls += 1;
            Ok(())
        })
    }
}

impl SelectorSurface for RecordingSurface {
    fn set_options(&mut self, options: &[SelectorOption]) -> Result<(), SurfaceError> {
        self.record(|state| {
            state.options = options.to_vec();
            Ok(())
        })
    }

    fn set_selected(&mut self, agent_id: Option<&str>) -> Result<(), SurfaceError> {
        self.record(|state| {
            state.selected = agent_id.map(str::to_owned);
            Ok(())
        })
    }
}

impl LogSurface for RecordingSurface {
    fn set_content(&mut self, lines: &[String]) -> Result<(), SurfaceError> {
        self.record(|state| {
            state.log_lines = lines.to_vec();
            state.log_placeholder = None;
            Ok(())
        })
    }

    fn show_placeholder(&mut self, text: &str) -> Result<(), SurfaceError> {
        self.record(|state| {
            state.log_lines.clear();
            state.log_placeholder = Some(text.to_owned());
            Ok(())
        })
    }

    fn scroll_to_bottom(&mut self) -> Result<(), SurfaceError> {
        self.record(|state| {
            state.log_scrolls += 1;
            Ok(())
        })
    }
}

impl StatusSurface for RecordingSurface {
    fn set_controls(&mut self, controls: ControlState) -> Result<(), SurfaceError> {
        self.record(|state| {
            state.controls = Some(controls);
            Ok(())
        })
    }

    fn set_speed(&mut self, speed: u32) -> Result<(), SurfaceError> {
        self.record(|state| {
            state.speed = Some(speed);
            Ok(())
        })
    }

    fn report_error(&mut self, message: &str) -> Result<(), SurfaceError> {
        self.record(|state| {
            state.errors.push(message.to_owned());
            Ok(())
        })
    }
}
