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

use crate::rolling::RollingWindow;
use crate::surface::{ChartHandle, ChartSurface, Rgb, SurfaceError};

/// The two rolling charts shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartSeries {
    AverageWaitMinutes,
    MaxQueueLength,
}

impl ChartSeries {
    pub const ALL: [ChartSeries; 2] = [ChartSeries::AverageWaitMinutes, ChartSeries::MaxQueueLength];

    pub fn config(self, capacity: usize) -> ChartConfig {
        match self {
            ChartSeries::AverageWaitMinutes => ChartConfig {
                series: self,
                title: "Average Wait Time (min)",
                y_axis: "Minutes",
                color: Rgb::from_hex(0xF44336),
                capacity,
            },
            ChartSeries::MaxQueueLength => ChartConfig {
                series: self,
                title: "Max Queue Length",
                y_axis: "EVs in Queue",
                color: Rgb::from_hex(0x2196F3),
                capacity,
            },
        }
    }

    /// Sample value taken from a metrics snapshot at push time.
    pub fn sample(self, metrics: &MetricsSnapshot) -> f64 {
        match self {
            ChartSeries::AverageWaitMinutes => metrics.average_wait_time_seconds / 60.0,
            ChartSeries::MaxQueueLength => f64::from(metrics.max_queue_length),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartConfig {
    pub series: ChartSeries,
    pub title: &'static str,
    pub y_axis: &'static str,
    pub color: Rgb,
    pub capacity: usize,
}

struct ChartSlot {
    config: ChartConfig,
    handle: Option<ChartHandle>,
    window: RollingWindow,
}

/// Owns the rolling windows and their chart handles.
pub struct ChartPanel {
    surface: Box<dyn ChartSurface>,
    slots: Vec<ChartSlot>,
}

impl ChartPanel {
    /// Create both charts in their zeroed state.
    pub fn new(surface: Box<dyn ChartSurface>, capacity: usize) -> Result<Self, SurfaceError> {
        let capacity = capacity.max(1);
        let slots = ChartSeries::ALL
            .iter()
            .map(|series| ChartSlot {
                config: series.config(capacity),
                handle: None,
                window: RollingWindow::new(capacity),
            })
            .collect();
        let mut panel = Self { surface, slots };
        panel.reinitialize()?;
        Ok(panel)
    }

    /// Destroy existing charts, zero the windows and create fresh charts.
    pub fn reinitialize(&mut self) -> Result<(), SurfaceError> {
        for slot in &mut self.slots {
            if let Some(handle) = slot.handle.take() {
                self.surface.destroy(handle)?;
            }
        }
        for slot in &mut self.slots {
            slot.window.reset();
            let handle = self.surface.create_series_chart(&slot.config)?;
            slot.handle = Some(handle);
            self.surface
                .redraw(handle, &slot.window.labels(), &slot.window.samples())?;
        }
        Ok(())
    }

    /// Append one sample per chart, labelled with the snapshot step, and redraw.
    pub fn push(&mut self, metrics: &MetricsSnapshot, step: u64) -> Result<(), SurfaceError> {
        let label = step.to_string();
        for slot in &mut self.slots {
            slot.window
                .push(slot.config.series.sample(metrics), label.clone());
            if let Some(handle) = slot.handle {
                self.surface
                    .redraw(handle, &slot.window.labels(), &slot.window.samples())?;
            }
        }
        Ok(())
    }

    pub fn window(&self, series: ChartSeries) -> Option<&RollingWindow> {
        self.slots
            .iter()
            .find(|slot| slot.config.series == series)
            .map(|slot| &slot.window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Calls {
        created: Vec<&'static str>,
        destroyed: Vec<ChartHandle>,
        redraws: usize,
    }

    struct FakeCharts {
        calls: Arc<Mutex<Calls>>,
        next: u64,
    }

    impl ChartSurface for FakeCharts {
        fn create_series_chart(&mut self, config: &ChartConfig) -> Result<ChartHandle, SurfaceError> {
            self.next += 1;
            self.calls.lock().unwrap().created.push(config.title);
            Ok(ChartHandle(self.next))
        }

        fn redraw(&mut self, _: ChartHandle, labels: &[String], series: &[f64]) -> Result<(), SurfaceError> {
            assert_eq!(labels.len(), series.len());
            self.calls.lock().unwrap().redraws += 1;
            Ok(())
        }

        fn destroy(&mut self, handle: ChartHandle) -> Result<(), SurfaceError> {
            self.calls.lock().unwrap().destroyed.push(handle);
            Ok(())
        }
    }

    fn panel(capacity: usize) -> (ChartPanel, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let surface = FakeCharts {
            calls: calls.clone(),
            next: 0,
        };
        (ChartPanel::new(Box::new(surface), capacity).unwrap(), calls)
    }

    #[test]
    fn push_converts_wait_to_minutes() {
        let (mut panel, calls) = panel(4);
        let metrics = MetricsSnapshot {
            average_wait_time_seconds: 90.0,
            max_queue_length: 6,
            ..MetricsSnapshot::default()
        };
        panel.push(&metrics, 42).unwrap();
        let wait = panel.window(ChartSeries::AverageWaitMinutes).unwrap();
        assert_eq!(wait.latest(), Some((1.5, "42")));
        let queue = panel.window(ChartSeries::MaxQueueLength).unwrap();
        assert_eq!(queue.latest(), Some((6.0, "42")));
        assert_eq!(calls.lock().unwrap().redraws, 4);
    }

    #[test]
    fn reinitialize_destroys_before_recreating() {
        let (mut panel, calls) = panel(4);
        panel.push(&MetricsSnapshot::default(), 1).unwrap();
        panel.reinitialize().unwrap();
        let calls = calls.lock().unwrap();
        assert_eq!(calls.destroyed, vec![ChartHandle(1), ChartHandle(2)]);
        assert_eq!(
            calls.created,
            vec![
                "Average Wait Time (min)",
                "Max Queue Length",
                "Average Wait Time (min)",
                "Max Queue Length"
            ]
        );
        assert_eq!(
            panel.window(ChartSeries::MaxQueueLength).unwrap().samples(),
            vec![0.0; 4]
        );
    }
}
