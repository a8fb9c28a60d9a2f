//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Dashboard synchronisation and rendering core."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Rendering backends consumed by the core. Every surface is driven from the
//! controller loop only, so implementations need `Send` but not `Sync`.

use std::fmt;

use evq_client::LatLng;
use thiserror::Error;

use crate::charts::ChartConfig;
use crate::metrics::MetricsDisplay;
use crate::selector::SelectorOption;
use crate::session::ControlState;
use crate::timeline::{TimelineItem, TimelinePlaceholder};

/// Opaque marker identifier issued by a [`MapSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(pub u64);

/// Opaque chart identifier issued by a [`ChartSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChartHandle(pub u64);

/// 24-bit colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const fn from_hex(value: u32) -> Self {
        Self(
            ((value >> 16) & 0xff) as u8,
            ((value >> 8) & 0xff) as u8,
            (value & 0xff) as u8,
        )
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// Visual style of a point marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyle {
    pub fill: Rgb,
    pub stroke: Rgb,
    pub scale: u8,
    pub z_index: i32,
    pub title: String,
}

/// Detail popup attached to a marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupContent {
    pub heading: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("unknown marker handle {0:?}")]
    UnknownMarker(MarkerHandle),
    #[error("unknown chart handle {0:?}")]
    UnknownChart(ChartHandle),
    #[error("surface unavailable: {0}")]
    Unavailable(String),
    #[error("render failed: {0}")]
    Render(String),
}

pub trait MapSurface: Send {
    fn create_point_marker(
        &mut self,
        position: LatLng,
        style: &MarkerStyle,
    ) -> Result<MarkerHandle, SurfaceError>;

    fn update_marker_position(
        &mut self,
        handle: MarkerHandle,
        position: LatLng,
    ) -> Result<(), SurfaceError>;

    fn update_marker_style(
        &mut self,
        handle: MarkerHandle,
        style: &MarkerStyle,
    ) -> Result<(), SurfaceError>;

    /// Attach or replace the popup of a marker.
    fn attach_detail_popup(
        &mut self,
        handle: MarkerHandle,
        popup: &PopupContent,
    ) -> Result<(), SurfaceError>;

    fn remove_marker(&mut self, handle: MarkerHandle) -> Result<(), SurfaceError>;
}

pub trait ChartSurface: Send {
    fn create_series_chart(&mut self, config: &ChartConfig) -> Result<ChartHandle, SurfaceError>;

    /// Replace the full series of a chart. `labels` and `series` have equal length.
    fn redraw(
        &mut self,
        handle: ChartHandle,
        labels: &[String],
        series: &[f64],
    ) -> Result<(), SurfaceError>;

    fn destroy(&mut self, handle: ChartHandle) -> Result<(), SurfaceError>;
}

pub trait MetricsSurface: Send {
    fn show_metrics(&mut self, metrics: &MetricsDisplay) -> Result<(), SurfaceError>;
}

pub trait TimelineSurface: Send {
    fn clear(&mut self) -> Result<(), SurfaceError>;

    fn append(&mut self, item: &TimelineItem) -> Result<(), SurfaceError>;

    /// Replace the whole timeline with a placeholder message.
    fn show_placeholder(&mut self, placeholder: TimelinePlaceholder) -> Result<(), SurfaceError>;

    fn scroll_to_latest(&mut self) -> Result<(), SurfaceError>;
}

pub trait SelectorSurface: Send {
    /// Replace all options. The "no selection" entry is implied.
    fn set_options(&mut self, options: &[SelectorOption]) -> Result<(), SurfaceError>;

    fn set_selected(&mut self, agent_id: Option<&str>) -> Result<(), SurfaceError>;
}

pub trait LogSurface: Send {
    fn set_content(&mut self, lines: &[String]) -> Result<(), SurfaceError>;

    fn show_placeholder(&mut self, text: &str) -> Result<(), SurfaceError>;

    fn scroll_to_bottom(&mut self) -> Result<(), SurfaceError>;
}

/// Control enablement, speed and the operator error line.
pub trait StatusSurface: Send {
    fn set_controls(&mut self, controls: ControlState) -> Result<(), SurfaceError>;

    fn set_speed(&mut self, speed: u32) -> Result<(), SurfaceError>;

    fn report_error(&mut self, message: &str) -> Result<(), SurfaceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_round_trips_hex_notation() {
        assert_eq!(Rgb::from_hex(0x4CAF50), Rgb(0x4C, 0xAF, 0x50));
        assert_eq!(Rgb::from_hex(0x388E3C).to_string(), "#388E3C");
    }
}
