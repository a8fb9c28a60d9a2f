//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Dashboard synchronisation and rendering core."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use crate::surface::{LogSurface, SurfaceError};

pub const LOG_PLACEHOLDER: &str = "No optimization logs yet.";

/// Mirrors the backend optimisation log and scrolls when it grows.
pub struct LogTailer {
    surface: Box<dyn LogSurface>,
    observed_lines: usize,
}

impl LogTailer {
    pub fn new(surface: Box<dyn LogSurface>) -> Self {
        Self {
            surface,
            observed_lines: 0,
        }
    }

    /// Replace the displayed log. Returns whether the view was scrolled.
    ///
    /// An empty fetch shows the placeholder and keeps the observed count.
    pub fn apply(&mut self, lines: &[String]) -> Result<bool, SurfaceError> {
        if lines.is_empty() {
            self.surface.show_placeholder(LOG_PLACEHOLDER)?;
            return Ok(false);
        }
        self.surface.set_content(lines)?;
        if lines.len() == self.observed_lines {
            return Ok(false);
        }
        self.observed_lines = lines.len();
        self.surface.scroll_to_bottom()?;
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<(), SurfaceError> {
        self.observed_lines = 0;
        self.surface.show_placeholder(LOG_PLACEHOLDER)
    }

    pub fn observed_lines(&self) -> usize {
        self.observed_lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeLog(Arc<Mutex<(Vec<String>, usize)>>);

    impl LogSurface for FakeLog {
        fn set_content(&mut self, lines: &[String]) -> Result<(), SurfaceError> {
            self.0.lock().unwrap().0 = lines.to_vec();
            Ok(())
        }

        fn show_placeholder(&mut self, text: &str) -> Result<(), SurfaceError> {
            self.0.lock().unwrap().0 = vec![text.to_owned()];
            Ok(())
        }

        fn scroll_to_bottom(&mut self) -> Result<(), SurfaceError> {
            self.0.lock().unwrap().1 += 1;
            Ok(())
        }
    }

    fn lines(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("step {i}")).collect()
    }

    #[test]
    fn scrolls_only_when_line_count_changes() {
        let log = FakeLog::default();
        let mut tailer = LogTailer::new(Box::new(log.clone()));
        assert!(tailer.apply(&lines(3)).unwrap());
        assert!(!tailer.apply(&lines(3)).unwrap());
        assert!(!tailer.apply(&lines(3)).unwrap());
        assert!(tailer.apply(&lines(5)).unwrap());
        assert_eq!(log.0.lock().unwrap().1, 2);
        assert_eq!(log.0.lock().unwrap().0.len(), 5);
    }

    #[test]
    fn clear_restores_placeholder_and_count() {
        let log = FakeLog::default();
        let mut tailer = LogTailer::new(Box::new(log.clone()));
        tailer.apply(&lines(2)).unwrap();
        tailer.clear().unwrap();
        assert_eq!(tailer.observed_lines(), 0);
        assert_eq!(log.0.lock().unwrap().0, vec![LOG_PLACEHOLDER.to_owned()]);
        assert!(tailer.apply(&lines(2)).unwrap());
    }

    #[test]
    fn empty_fetch_keeps_observed_count() {
        let log = FakeLog::default();
        let mut tailer = LogTailer::new(Box::new(log.clone()));
        assert!(tailer.apply(&lines(4)).unwrap());
        assert!(!tailer.apply(&[]).unwrap());
        assert_eq!(tailer.observed_lines(), 4);
        assert_eq!(log.0.lock().unwrap().0, vec![LOG_PLACEHOLDER.to_owned()]);
        assert!(!tailer.apply(&lines(4)).unwrap());
        assert_eq!(log.0.lock().unwrap().1, 1);
    }

    #[test]
    fn empty_log_shows_placeholder() {
        let log = FakeLog::default();
        let mut tailer = LogTailer::new(Box::new(log.clone()));
        assert!(!tailer.apply(&[]).unwrap());
        assert_eq!(log.0.lock().unwrap().0, vec![LOG_PLACEHOLDER.to_owned()]);
    }
}
