//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Dashboard synchronisation and rendering core."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Which operator controls are currently enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub start: bool,
    pub stop: bool,
    pub reset: bool,
    pub generate: bool,
}

/// Lifecycle state of one dashboard session. Owned by the controller.
#[derive(Debug)]
pub struct SessionState {
    running: bool,
    speed_multiplier: u32,
    tick_counter: u64,
    selected_agent_id: Option<String>,
    epoch: CancellationToken,
}

impl SessionState {
    pub fn new(speed_multiplier: u32) -> Self {
        Self {
            running: false,
            speed_multiplier: speed_multiplier.max(1),
            tick_counter: 0,
            selected_agent_id: None,
            epoch: CancellationToken::new(),
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn speed_multiplier(&self) -> u32 {
        self.speed_multiplier
    }

    pub fn set_speed_multiplier(&mut self, speed: u32) {
        self.speed_multiplier = speed.max(1);
    }

    /// `1000 / speed` milliseconds.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(1) / self.speed_multiplier
    }

    pub fn tick_counter(&self) -> u64 {
        self.tick_counter
    }

    /// Count one tick and return its number, starting at 1.
    pub fn advance_tick(&mut self) -> u64 {
        self.tick_counter += 1;
        self.tick_counter
    }

    pub fn selected_agent_id(&self) -> Option<&str> {
        self.selected_agent_id.as_deref()
    }

    pub fn select(&mut self, agent_id: Option<String>) {
        self.selected_agent_id = agent_id;
    }

    /// Token shared by every request of the current epoch.
    pub fn epoch(&self) -> &CancellationToken {
        &self.epoch
    }

    /// Cancel all requests of the current epoch and open a new one.
    pub fn cancel_in_flight(&mut self) {
        self.epoch.cancel();
        self.epoch = CancellationToken::new();
    }

    /// Clear the tick counter and selection. The running flag is untouched.
    pub fn reset(&mut self) {
        self.tick_counter = 0;
        self.selected_agent_id = None;
    }

    pub fn controls(&self) -> ControlState {
        ControlState {
            start: !self.running,
            stop: self.running,
            reset: !self.running,
            generate: !self.running,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_period_follows_speed() {
        let mut session = SessionState::new(5);
        assert_eq!(session.tick_period(), Duration::from_millis(200));
        session.set_speed_multiplier(1);
        assert_eq!(session.tick_period(), Duration::from_secs(1));
        session.set_speed_multiplier(0);
        assert_eq!(session.speed_multiplier(), 1);
    }

    #[test]
    fn reset_keeps_running_flag() {
        let mut session = SessionState::new(2);
        session.set_running(true);
        session.advance_tick();
        session.select(Some("ev-1".into()));
        session.reset();
        assert!(session.running());
        assert_eq!(session.tick_counter(), 0);
        assert_eq!(session.selected_agent_id(), None);
    }

    #[test]
    fn cancel_in_flight_replaces_the_epoch() {
        let mut session = SessionState::new(1);
        let before = session.epoch().clone();
        session.cancel_in_flight();
        assert!(before.is_cancelled());
        assert!(!session.epoch().is_cancelled());
    }

    #[test]
    fn controls_mirror_running_flag() {
        let mut session = SessionState::new(1);
        assert!(session.controls().start && !session.controls().stop);
        session.set_running(true);
        let controls = session.controls();
        assert!(!controls.start && controls.stop && !controls.reset && !controls.generate);
    }
}
