//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Dashboard synchronisation and rendering core."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use crate::surface::{
    ChartSurface, LogSurface, MapSurface, MetricsSurface, SelectorSurface, StatusSurface,
    TimelineSurface,
};

/// Surfaces available to the controller. Absent slots disable the feature.
#[derive(Default)]
pub struct SurfaceSet {
    pub map: Option<Box<dyn MapSurface>>,
    pub charts: Option<Box<dyn ChartSurface>>,
    pub metrics: Option<Box<dyn MetricsSurface>>,
    pub timeline: Option<Box<dyn TimelineSurface>>,
    pub selector: Option<Box<dyn SelectorSurface>>,
    pub log: Option<Box<dyn LogSurface>>,
    pub status: Option<Box<dyn StatusSurface>>,
}

impl SurfaceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_map(mut self, surface: impl MapSurface + 'static) -> Self {
        self.map = Some(Box::new(surface));
        self
    }

    pub fn with_charts(mut self, surface: impl ChartSurface + 'static) -> Self {
        self.charts = Some(Box::new(surface));
        self
    }

    pub fn with_metrics(mut self, surface: impl MetricsSurface + 'static) -> Self {
        self.metrics = Some(Box::new(surface));
        self
    }

    pub fn with_timeline(mut self, surface: impl TimelineSurface + 'static) -> Self {
        self.timeline = Some(Box::new(surface));
        self
    }

    pub fn with_selector(mut self, surface: impl SelectorSurface + 'static) -> Self {
        self.selector = Some(Box::new(surface));
        self
    }

    pub fn with_log(mut self, surface: impl LogSurface + 'static) -> Self {
        self.log = Some(Box::new(surface));
        self
    }

    pub fn with_status(mut self, surface: impl StatusSurface + 'static) -> Self {
        self.status = Some(Box::new(surface));
        self
    }

    /// Names of the slots left empty.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("map", self.map.is_none()),
            ("charts", self.charts.is_none()),
            ("metrics", self.metrics.is_none()),
            ("timeline", self.timeline.is_none()),
            ("selector", self.selector.is_none()),
            ("log", self.log.is_none()),
            ("status", self.status.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsDisplay;
    use crate::surface::SurfaceError;

    struct Sink;

    impl MetricsSurface for Sink {
        fn show_metrics(&mut self, _: &MetricsDisplay) -> Result<(), SurfaceError> {
            Ok(())
        }
    }

    #[test]
    fn lists_missing_slots() {
        let set = SurfaceSet::new().with_metrics(Sink);
        let missing = set.missing();
        assert!(!missing.contains(&"metrics"));
        assert_eq!(missing.len(), 6);
    }
}
