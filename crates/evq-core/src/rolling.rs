//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Dashboard synchronisation and rendering core."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::collections::VecDeque;

/// Fixed-capacity FIFO of `(sample, label)` pairs feeding one chart.
///
/// Samples and labels always have the same length, never above `capacity`.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingWindow {
    capacity: usize,
    samples: VecDeque<f64>,
    labels: VecDeque<String>,
}

impl RollingWindow {
    /// Window in its reset state. A zero capacity is clamped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut window = Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
            labels: VecDeque::with_capacity(capacity),
        };
        window.reset();
        window
    }

    pub fn push(&mut self, sample: f64, label: impl Into<String>) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
            self.labels.pop_front();
        }
        self.samples.push_back(sample);
        self.labels.push_back(label.into());
    }

    /// `capacity` zero samples with empty labels.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.labels.clear();
        self.samples.resize(self.capacity, 0.0);
        self.labels.resize(self.capacity, String::new());
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn labels(&self) -> Vec<String> {
        self.labels.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<(f64, &str)> {
        Some((*self.samples.back()?, self.labels.back()?.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_window_is_zero_filled() {
        let window = RollingWindow::new(4);
        assert_eq!(window.samples(), vec![0.0; 4]);
        assert!(window.labels().iter().all(String::is_empty));
    }

    #[test]
    fn lengths_stay_equal_and_bounded() {
        let mut window = RollingWindow::new(5);
        for step in 0..23u32 {
            window.push(f64::from(step), step.to_string());
            assert_eq!(window.samples().len(), window.labels().len());
            assert!(window.len() <= window.capacity());
        }
    }

    #[test]
    fn overflow_keeps_last_capacity_pairs_in_order() {
        let mut window = RollingWindow::new(3);
        for step in 1..=5u32 {
            window.push(f64::from(step) * 10.0, step.to_string());
        }
        assert_eq!(window.samples(), vec![30.0, 40.0, 50.0]);
        assert_eq!(window.labels(), vec!["3", "4", "5"]);
        assert_eq!(window.latest(), Some((50.0, "5")));
    }

    #[test]
    fn reset_is_idempotent() {
        let mut window = RollingWindow::new(3);
        window.push(7.5, "12");
        window.reset();
        let once = window.clone();
        window.reset();
        assert_eq!(window, once);
        assert_eq!(window.samples(), vec![0.0; 3]);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut window = RollingWindow::new(0);
        window.push(1.0, "a");
        window.push(2.0, "b");
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.samples(), vec![2.0]);
    }
}
