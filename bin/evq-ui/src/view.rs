//! ---
//! ems_section: "12-gui-setup-wizard"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Terminal dashboard for the EV charging-queue simulation."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Terminal surfaces. Every trait call lands in a shared [`ViewModel`] that
//! the draw pass reads on the next frame.

use std::collections::BTreeMap;
use std::sync::Arc;

use evq_client::LatLng;
use evq_core::{
    ChartConfig, ChartHandle, ChartSurface, ControlState, LogSurface, MapSurface, MarkerHandle,
    MarkerStyle, MetricsDisplay, MetricsSurface, PopupContent, Rgb, SelectorOption,
    SelectorSurface, StatusSurface, SurfaceError, SurfaceSet, TimelineItem, TimelinePlaceholder,
    TimelineSurface,
};
use parking_lot::{Mutex, MutexGuard};

pub struct MapMarker {
    pub position: LatLng,
    pub style: MarkerStyle,
    pub popup: Option<PopupContent>,
}

pub struct ChartView {
    pub title: &'static str,
    pub y_axis: &'static str,
    pub color: Rgb,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Default)]
pub struct ViewModel {
    pub markers: BTreeMap<MarkerHandle, MapMarker>,
    pub charts: BTreeMap<ChartHandle, ChartView>,
    pub metrics: Option<MetricsDisplay>,
    pub timeline: Vec<TimelineItem>,
    pub timeline_placeholder: Option<TimelinePlaceholder>,
    /// Lines from the bottom; `0` pins the view to the latest entry.
    pub timeline_offset: usize,
    pub options: Vec<SelectorOption>,
    pub selected: Option<String>,
    pub log: Vec<String>,
    pub log_placeholder: Option<String>,
    pub log_offset: usize,
    pub controls: Option<ControlState>,
    pub speed: u32,
    pub last_error: Option<String>,
    next_handle: u64,
}

impl ViewModel {
    fn issue(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    /// Marker carrying the popup with the given heading.
    pub fn marker_with_heading(&self, heading: &str) -> Option<MarkerHandle> {
        self.markers.iter().find_map(|(handle, marker)| {
            marker
                .popup
                .as_ref()
                .filter(|popup| popup.heading == heading)
                .map(|_| *handle)
        })
    }
}

#[derive(Clone, Default)]
pub struct SharedView(Arc<Mutex<ViewModel>>);

impl SharedView {
    pub fn lock(&self) -> MutexGuard<'_, ViewModel> {
        self.0.lock()
    }

    pub fn surface_set(&self) -> SurfaceSet {
        SurfaceSet::new()
            .with_map(self.surface())
            .with_charts(self.surface())
            .with_metrics(self.surface())
            .with_timeline(self.surface())
            .with_selector(self.surface())
            .with_log(self.surface())
            .with_status(self.surface())
    }

    fn surface(&self) -> TerminalSurface {
        TerminalSurface(self.clone())
    }
}

pub struct TerminalSurface(SharedView);

impl TerminalSurface {
    fn marker(
        view: &mut ViewModel,
        handle: MarkerHandle,
    ) -> Result<&mut MapMarker, SurfaceError> {
        view.markers
            .get_mut(&handle)
            .ok_or(SurfaceError::UnknownMarker(handle))
    }
}

impl MapSurface for TerminalSurface {
    fn create_point_marker(
        &mut self,
        position: LatLng,
        style: &MarkerStyle,
    ) -> Result<MarkerHandle, SurfaceError> {
        let mut view = self.0.lock();
        let handle = MarkerHandle(view.issue());
        view.markers.insert(
            handle,
            MapMarker {
                position,
                style: style.clone(),
                popup: None,
            },
        );
        Ok(handle)
    }

    fn update_marker_position(
        &mut self,
        handle: MarkerHandle,
        position: LatLng,
    ) -> Result<(), SurfaceError> {
        Self::marker(&mut self.0.lock(), handle)?.position = position;
        Ok(())
    }

    fn update_marker_style(
        &mut self,
        handle: MarkerHandle,
        style: &MarkerStyle,
    ) -> Result<(), SurfaceError> {
        Self::marker(&mut self.0.lock(), handle)?.style = style.clone();
        Ok(())
    }

    fn attach_detail_popup(
        &mut self,
        handle: MarkerHandle,
        popup: &PopupContent,
    ) -> Result<(), SurfaceError> {
        Self::marker(&mut self.0.lock(), handle)?.popup = Some(popup.clone());
        Ok(())
    }

    fn remove_marker(&mut self, handle: MarkerHandle) -> Result<(), SurfaceError> {
        self.0
            .lock()
            .markers
            .remove(&handle)
            .map(|_| ())
            .ok_or(SurfaceError::UnknownMarker(handle))
    }
}

impl ChartSurface for TerminalSurface {
    fn create_series_chart(&mut self, config: &ChartConfig) -> Result<ChartHandle, SurfaceError> {
        let mut view = self.0.lock();
        let handle = ChartHandle(view.issue());
        view.charts.insert(
            handle,
            ChartView {
                title: config.title,
                y_axis: config.y_axis,
                color: config.color,
                labels: Vec::new(),
                values: Vec::new(),
            },
        );
        Ok(handle)
    }

    fn redraw(
        &mut self,
        handle: ChartHandle,
        labels: &[String],
        series: &[f64],
    ) -> Result<(), SurfaceError> {
        let mut view = self.0.lock();
        let chart = view
            .charts
            .get_mut(&handle)
            .ok_or(SurfaceError::UnknownChart(handle))?;
        chart.labels = labels.to_vec();
        chart.values = series.to_vec();
        Ok(())
    }

    fn destroy(&mut self, handle: ChartHandle) -> Result<(), SurfaceError> {
        self.0
            .lock()
            .charts
            .remove(&handle)
            .map(|_| ())
            .ok_or(SurfaceError::UnknownChart(handle))
    }
}

impl MetricsSurface for TerminalSurface {
    fn show_metrics(&mut self, metrics: &MetricsDisplay) -> Result<(), SurfaceError> {
        self.0.lock().metrics = Some(metrics.clone());
        Ok(())
    }
}

impl TimelineSurface for TerminalSurface {
    fn clear(&mut self) -> Result<(), SurfaceError> {
        let mut view = self.0.lock();
        view.timeline.clear();
        view.timeline_placeholder = None;
        view.timeline_offset = 0;
        Ok(())
    }

    fn append(&mut self, item: &TimelineItem) -> Result<(), SurfaceError> {
        self.0.lock().timeline.push(item.clone());
        Ok(())
    }

    fn show_placeholder(&mut self, placeholder: TimelinePlaceholder) -> Result<(), SurfaceError> {
        let mut view = self.0.lock();
        view.timeline.clear();
        view.timeline_placeholder = Some(placeholder);
        view.timeline_offset = 0;
        Ok(())
    }

    fn scroll_to_latest(&mut self) -> Result<(), SurfaceError> {
        self.0.lock().timeline_offset = 0;
        Ok(())
    }
}

impl SelectorSurface for TerminalSurface {
    fn set_options(&mut self, options: &[SelectorOption]) -> Result<(), SurfaceError> {
        self.0.lock().options = options.to_vec();
        Ok(())
    }

    fn set_selected(&mut self, agent_id: Option<&str>) -> Result<(), SurfaceError> {
        self.0.lock().selected = agent_id.map(str::to_owned);
        Ok(())
    }
}

impl LogSurface for TerminalSurface {
    fn set_content(&mut self, lines: &[String]) -> Result<(), SurfaceError> {
        let mut view = self.0.lock();
        view.log = lines.to_vec();
        view.log_placeholder = None;
        Ok(())
    }

    fn show_placeholder(&mut self, text: &str) -> Result<(), SurfaceError> {
        let mut view = self.0.lock();
        view.log.clear();
        view.log_placeholder = Some(text.to_owned());
        view.log_offset = 0;
        Ok(())
    }

    fn scroll_to_bottom(&mut self) -> Result<(), SurfaceError> {
        self.0.lock().log_offset = 0;
        Ok(())
    }
}

impl StatusSurface for TerminalSurface {
    fn set_controls(&mut self, controls: ControlState) -> Result<(), SurfaceError> {
        self.0.lock().controls = Some(controls);
        Ok(())
    }

    fn set_speed(&mut self, speed: u32) -> Result<(), SurfaceError> {
        self.0.lock().speed = speed;
        Ok(())
    }

    fn report_error(&mut self, message: &str) -> Result<(), SurfaceError> {
        self.0.lock().last_error = Some(message.to_owned());
        Ok(())
    }
}
