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

use evq_common::PollingConfig;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Re-armable repeating timer. At most one interval exists at a time.
#[derive(Debug, Default)]
pub struct TickTimer {
    interval: Option<Interval>,
}

impl TickTimer {
    pub fn disarmed() -> Self {
        Self::default()
    }

    /// Replace any running interval. The first tick fires one period from now.
    pub fn arm(&mut self, period: Duration) {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    pub fn disarm(&mut self) {
        self.interval = None;
    }

    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    pub fn period(&self) -> Option<Duration> {
        self.interval.as_ref().map(Interval::period)
    }

    /// Completes on the next tick; pending forever while disarmed.
    pub async fn tick(&mut self) -> Instant {
        match self.interval.as_mut() {
            Some(interval) => interval.tick().await,
            None => std::future::pending().await,
        }
    }
}

/// Work due on a given tick in addition to the snapshot refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickPlan {
    pub append_charts: bool,
    pub refresh_selector: bool,
}

/// Sub-cadences of the tick loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    chart_every: u64,
    selector_every: u64,
}

impl Cadence {
    pub fn new(chart_every: u64, selector_every: u64) -> Self {
        Self {
            chart_every: chart_every.max(1),
            selector_every: selector_every.max(1),
        }
    }

    pub fn plan(&self, tick: u64) -> TickPlan {
        TickPlan {
            append_charts: tick % self.chart_every == 0,
            refresh_selector: tick % self.selector_every == 0,
        }
    }
}

impl Default for Cadence {
    fn default() -> Self {
        Self::new(5, 20)
    }
}

impl From<&PollingConfig> for Cadence {
    fn from(config: &PollingConfig) -> Self {
        Self::new(config.chart_every_ticks, config.selector_every_ticks)
    }
}
