//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Dashboard synchronisation and rendering core."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use evq_client::MetricsSnapshot;

use crate::surface::{MetricsSurface, SurfaceError};

/// Operator-facing text for one metrics snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsDisplay {
    /// `m:ss`
    pub average_wait: String,
    pub max_queue: String,
    pub completion_rate: String,
    pub abandoned_rate: String,
    /// Whole milliseconds, e.g. `12ms`.
    pub optimization_time: String,
}

impl From<&MetricsSnapshot> for MetricsDisplay {
    fn from(metrics: &MetricsSnapshot) -> Self {
        Self {
            average_wait: format_wait(metrics.average_wait_time_seconds),
            max_queue: metrics.max_queue_length.to_string(),
            completion_rate: format!("{:.1}%", metrics.completion_rate * 100.0),
            abandoned_rate: format!("{:.1}%", metrics.abandoned_rate * 100.0),
            optimization_time: format!("{:.0}ms", metrics.optimization_time_seconds * 1000.0),
        }
    }
}

fn format_wait(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let minutes = (seconds / 60.0).floor() as u64;
    let rest = (seconds % 60.0).floor() as u64;
    format!("{minutes}:{rest:02}")
}

pub struct MetricsPanel {
    surface: Box<dyn MetricsSurface>,
    last: Option<MetricsDisplay>,
}

impl MetricsPanel {
    pub fn new(surface: Box<dyn MetricsSurface>) -> Self {
        Self {
            surface,
            last: None,
        }
    }

    pub fn render(&mut self, metrics: &MetricsSnapshot) -> Result<(), SurfaceError> {
        let display = MetricsDisplay::from(metrics);
        self.surface.show_metrics(&display)?;
        self.last = Some(display);
        Ok(())
    }

    pub fn last(&self) -> Option<&MetricsDisplay> {
        self.last.as_ref()
    }
}
