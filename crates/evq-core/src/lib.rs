//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Dashboard synchronisation and rendering core."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Snapshot-driven synchronisation between the simulation backend and the
//! dashboard surfaces.

pub mod charts;
pub mod controller;
pub mod error;
pub mod log_tail;
pub mod metrics;
pub mod reconciler;
pub mod registry;
pub mod rolling;
pub mod scheduler;
pub mod selector;
pub mod session;
pub mod surface;
pub mod timeline;

pub use charts::{ChartConfig, ChartPanel, ChartSeries};
pub use controller::{Command, ControllerSettings, SessionController, RECENT_ERROR_LIMIT};
pub use error::SessionError;
pub use log_tail::{LogTailer, LOG_PLACEHOLDER};
pub use metrics::{MetricsDisplay, MetricsPanel};
pub use reconciler::{
    agent_color, agent_popup, agent_style, station_popup, station_style, EntityReconciler,
    MarkerColor, ReconcileReport,
};
pub use registry::SurfaceSet;
pub use rolling::RollingWindow;
pub use scheduler::{Cadence, TickPlan, TickTimer};
pub use selector::{
    AgentSelector, AgentStatus, SelectionRestore, SelectorOption, NO_SELECTION_LABEL,
};
pub use session::{ControlState, SessionState};
pub use surface::{
    ChartHandle, ChartSurface, LogSurface, MapSurface, MarkerHandle, MarkerStyle, MetricsSurface,
    PopupContent, Rgb, SelectorSurface, StatusSurface, SurfaceError, TimelineSurface,
};
pub use timeline::{
    title_case_label, EventCategory, TimelineItem, TimelinePlaceholder, TimelineRenderer,
};
