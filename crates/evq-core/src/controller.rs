//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Dashboard synchronisation and rendering core."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Session controller: owns the lifecycle state, the tick timer and every
//! rendering component, and is the only place where state changes.
//!
//! Backend calls run as tasks on a [`JoinSet`]; their results come back
//! through [`SessionController::step`] and are applied synchronously. Each
//! task carries the [`CancellationToken`] of the epoch it was issued in, so
//! results from before a stop, reset or regenerate are dropped on arrival.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use evq_client::{
    AgentState, ClientError, GenerateParams, JourneyEvent, LifecycleCommand, SimulationApi,
    SimulationSnapshot, StationState,
};
use evq_common::{DashboardConfig, MarkerConfig};
use evq_logging::{
    evq_debug, evq_error, evq_info, log_system_event, LogContext, SystemEventOutcome,
};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::charts::ChartPanel;
use crate::error::SessionError;
use crate::log_tail::LogTailer;
use crate::metrics::MetricsPanel;
use crate::reconciler::EntityReconciler;
use crate::registry::SurfaceSet;
use crate::scheduler::{Cadence, TickPlan, TickTimer};
use crate::selector::{AgentSelector, SelectionRestore};
use crate::session::SessionState;
use crate::surface::{StatusSurface, SurfaceError};
use crate::timeline::{TimelinePlaceholder, TimelineRenderer};

/// Number of error messages retained for the status view.
pub const RECENT_ERROR_LIMIT: usize = 20;

/// Operator request handled by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Reset,
    SetSpeed(u32),
    /// `None` uses the configured world size.
    Generate(Option<GenerateParams>),
    Select(Option<String>),
    Shutdown,
}

impl Command {
    pub fn label(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Stop => "stop",
            Command::Reset => "reset",
            Command::SetSpeed(_) => "speed",
            Command::Generate(_) => "generate",
            Command::Select(_) => "select",
            Command::Shutdown => "shutdown",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub initial_speed: u32,
    pub max_speed: u32,
    pub cadence: Cadence,
    pub log_poll_interval: Duration,
    pub chart_capacity: usize,
    pub markers: MarkerConfig,
    pub generate: GenerateParams,
}

impl From<&DashboardConfig> for ControllerSettings {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            initial_speed: config.polling.initial_speed,
            max_speed: config.polling.max_speed,
            cadence: Cadence::from(&config.polling),
            log_poll_interval: config.polling.log_poll_interval,
            chart_capacity: config.charts.capacity,
            markers: config.markers.clone(),
            generate: GenerateParams::from(&config.generate),
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&DashboardConfig::default())
    }
}

enum Outcome {
    Lifecycle {
        command: LifecycleCommand,
        result: Result<(), ClientError>,
    },
    Snapshot {
        tick: Option<u64>,
        plan: TickPlan,
        snapshot: Result<SimulationSnapshot, ClientError>,
        agents: Option<Result<Vec<AgentState>, ClientError>>,
    },
    Selector(Result<Vec<AgentState>, ClientError>),
    Journey {
        agent_id: String,
        result: Result<Vec<JourneyEvent>, ClientError>,
    },
    Logs(Result<Vec<String>, ClientError>),
    Fleet(Result<(Vec<AgentState>, Vec<StationState>), ClientError>),
}

struct Envelope {
    epoch: CancellationToken,
    /// `None` when the epoch was cancelled before the request finished.
    outcome: Option<Outcome>,
}

enum Wake {
    Completed(Result<Envelope, JoinError>),
    Tick,
    LogPoll,
}

pub struct SessionController {
    api: Arc<dyn SimulationApi>,
    session: SessionState,
    settings: ControllerSettings,
    reconciler: Option<EntityReconciler>,
    charts: Option<ChartPanel>,
    metrics: Option<MetricsPanel>,
    timeline: Option<TimelineRenderer>,
    selector: Option<AgentSelector>,
    log: Option<LogTailer>,
    status: Option<Box<dyn StatusSurface>>,
    timer: TickTimer,
    log_timer: TickTimer,
    tasks: JoinSet<Envelope>,
    lifecycle_pending: Option<&'static str>,
    recent_errors: VecDeque<String>,
}

impl SessionController {
    /// Build the components for the registered surfaces and bootstrap the
    /// dashboard. Must be called from within a Tokio runtime.
    pub fn new(
        api: Arc<dyn SimulationApi>,
        surfaces: SurfaceSet,
        settings: ControllerSettings,
    ) -> Self {
        let missing = surfaces.missing();
        if !missing.is_empty() {
            warn!(?missing, "surfaces not registered; dependent features disabled");
        }
        let SurfaceSet {
            map,
            charts,
            metrics,
            timeline,
            selector,
            log,
            status,
        } = surfaces;

        let charts = charts.and_then(|surface| {
            match ChartPanel::new(surface, settings.chart_capacity) {
                Ok(panel) => Some(panel),
                Err(err) => {
                    warn!(error = %err, "chart initialisation failed; charts disabled");
                    None
                }
            }
        });
        let max_speed = settings.max_speed.max(1);
        let mut log_timer = TickTimer::disarmed();
        log_timer.arm(settings.log_poll_interval);

        let mut controller = Self {
            api,
            session: SessionState::new(settings.initial_speed.clamp(1, max_speed)),
            reconciler: map.map(|surface| EntityReconciler::new(surface, &settings.markers)),
            charts,
            metrics: metrics.map(MetricsPanel::new),
            timeline: timeline.map(TimelineRenderer::new),
            selector: selector.map(AgentSelector::new),
            log: log.map(LogTailer::new),
            status,
            timer: TickTimer::disarmed(),
            log_timer,
            tasks: JoinSet::new(),
            lifecycle_pending: None,
            recent_errors: VecDeque::with_capacity(RECENT_ERROR_LIMIT),
            settings,
        };
        controller.bootstrap();
        controller
    }

    fn bootstrap(&mut self) {
        let shown = self
            .timeline
            .as_mut()
            .map(|timeline| timeline.show_placeholder(TimelinePlaceholder::SelectAgent));
        self.check_surface("timeline", shown);
        let cleared = self.log.as_mut().map(LogTailer::clear);
        self.check_surface("log", cleared);
        self.publish_controls();
        self.publish_speed();

        self.spawn_fleet_reload();
        self.spawn_selector_refresh();
        self.spawn_snapshot(None, TickPlan::default());
        evq_info!(
            context = LogContext::new().with_speed(self.session.speed_multiplier()),
            "session controller ready"
        );
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Period of the armed tick timer, `None` while stopped.
    pub fn timer_period(&self) -> Option<Duration> {
        self.timer.period()
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Most recent failures, oldest first.
    pub fn recent_errors(&self) -> impl Iterator<Item = &str> {
        self.recent_errors.iter().map(String::as_str)
    }

    pub fn reconciler(&self) -> Option<&EntityReconciler> {
        self.reconciler.as_ref()
    }

    pub fn charts(&self) -> Option<&ChartPanel> {
        self.charts.as_ref()
    }

    pub fn selector(&self) -> Option<&AgentSelector> {
        self.selector.as_ref()
    }

    pub fn log_tailer(&self) -> Option<&LogTailer> {
        self.log.as_ref()
    }

    /// Apply an operator command. Rejections are also reported on the
    /// error channel.
    pub fn handle_command(&mut self, command: Command) -> Result<(), SessionError> {
        let label = command.label();
        let result = self.dispatch(command);
        if let Err(err) = &result {
            self.report_failure(label, err);
        }
        result
    }

    fn dispatch(&mut self, command: Command) -> Result<(), SessionError> {
        let context = LogContext::new()
            .with_command(command.label())
            .with_speed(self.session.speed_multiplier());
        evq_debug!(context = context, "command received");
        match command {
            Command::Start => {
                self.ensure_no_lifecycle_pending("start")?;
                if self.session.running() {
                    return Err(SessionError::CommandIgnored {
                        command: "start",
                        reason: "simulation already running",
                    });
                }
                self.spawn_lifecycle(LifecycleCommand::Start);
            }
            Command::Stop => {
                self.ensure_no_lifecycle_pending("stop")?;
                if !self.session.running() {
                    return Err(SessionError::CommandIgnored {
                        command: "stop",
                        reason: "simulation not running",
                    });
                }
                self.spawn_lifecycle(LifecycleCommand::Stop);
            }
            Command::Reset => {
                self.ensure_no_lifecycle_pending("reset")?;
                self.spawn_lifecycle(LifecycleCommand::Reset);
            }
            Command::Generate(params) => {
                self.ensure_no_lifecycle_pending("generate")?;
                let params = params.unwrap_or_else(|| self.settings.generate.clone());
                self.spawn_lifecycle(LifecycleCommand::Generate(params));
            }
            Command::SetSpeed(speed) => self.set_speed(speed)?,
            Command::Select(agent_id) => self.select(agent_id),
            Command::Shutdown => self.shutdown(),
        }
        Ok(())
    }

    fn ensure_no_lifecycle_pending(&self, command: &'static str) -> Result<(), SessionError> {
        match self.lifecycle_pending {
            Some(_) => Err(SessionError::CommandIgnored {
                command,
                reason: "another lifecycle command is in flight",
            }),
            None => Ok(()),
        }
    }

    fn set_speed(&mut self, speed: u32) -> Result<(), SessionError> {
        let max = self.settings.max_speed.max(1);
        if speed == 0 || speed > max {
            return Err(SessionError::InvalidSpeed {
                requested: speed,
                max,
            });
        }
        self.session.set_speed_multiplier(speed);
        if self.session.running() {
            self.timer.arm(self.session.tick_period());
        }
        self.publish_speed();
        evq_info!(
            context = LogContext::new().with_command("speed").with_speed(speed),
            "speed multiplier set to {}x",
            speed
        );
        Ok(())
    }

    fn select(&mut self, agent_id: Option<String>) {
        self.session.select(agent_id.clone());
        let selected = self
            .selector
            .as_mut()
            .map(|selector| selector.select(agent_id.as_deref()));
        self.check_surface("selector", selected);
        match agent_id {
            Some(agent_id) => self.spawn_journey(agent_id),
            None => self.show_timeline_placeholder(),
        }
    }

    /// Cancel outstanding work and stop both timers.
    pub fn shutdown(&mut self) {
        self.session.cancel_in_flight();
        self.timer.disarm();
        self.log_timer.disarm();
        self.tasks.abort_all();
        evq_info!("session controller shut down");
    }

    /// Wait for the next task completion or timer tick and apply it.
    pub async fn step(&mut self) {
        let wake = tokio::select! {
            Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => Wake::Completed(joined),
            _ = self.timer.tick() => Wake::Tick,
            _ = self.log_timer.tick() => Wake::LogPoll,
        };
        match wake {
            Wake::Completed(joined) => self.on_completed(joined),
            Wake::Tick => self.on_tick(),
            Wake::LogPoll => self.on_log_poll(),
        }
    }

    /// Apply every in-flight result, including follow-up requests they spawn.
    pub async fn settle(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            self.on_completed(joined);
        }
    }

    /// Event loop: commands from `commands`, results and ticks from [`step`](Self::step).
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => {
                        self.shutdown();
                        break;
                    }
                    Some(command) => {
                        let _ = self.handle_command(command);
                    }
                },
                _ = self.step() => {}
            }
        }
    }

    fn on_tick(&mut self) {
        let tick = self.session.advance_tick();
        let plan = self.settings.cadence.plan(tick);
        self.spawn_snapshot(Some(tick), plan);
    }

    fn on_log_poll(&mut self) {
        if !self.session.running() || self.log.is_none() {
            return;
        }
        let api = self.api.clone();
        self.spawn_in_epoch(async move { Outcome::Logs(api.optimization_logs().await) });
    }

    fn on_completed(&mut self, joined: Result<Envelope, JoinError>) {
        let envelope = match joined {
            Ok(envelope) => envelope,
            Err(err) if err.is_cancelled() => return,
            Err(err) => {
                self.report_failure("task", &err);
                return;
            }
        };
        let Some(outcome) = envelope.outcome else {
            evq_debug!("request abandoned after epoch cancellation");
            return;
        };
        if envelope.epoch.is_cancelled() {
            evq_debug!("discarding result from a cancelled epoch");
            return;
        }
        self.apply(outcome);
    }

    fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Lifecycle { command, result } => {
                self.lifecycle_pending = None;
                match result {
                    Ok(()) => self.on_lifecycle_success(command),
                    Err(err) => {
                        let context = LogContext::new().with_command(command.label());
                        log_system_event(
                            Some(&context),
                            &format!("session.{}", command.label()),
                            &err.to_string(),
                            SystemEventOutcome::Fault,
                        );
                        self.report_failure(command.label(), &err);
                    }
                }
            }
            Outcome::Snapshot {
                tick,
                plan,
                snapshot,
                agents,
            } => {
                self.apply_snapshot(tick, plan, snapshot);
                if let Some(agents) = agents {
                    self.apply_selector(agents);
                }
            }
            Outcome::Selector(agents) => self.apply_selector(agents),
            Outcome::Journey { agent_id, result } => self.apply_journey(agent_id, result),
            Outcome::Logs(result) => self.apply_logs(result),
            Outcome::Fleet(result) => match result {
                Ok((agents, stations)) => {
                    let reloaded = self
                        .reconciler
                        .as_mut()
                        .map(|reconciler| reconciler.reset_all(&agents, &stations));
                    if let Some(report) = self.check_surface("map", reloaded) {
                        evq_info!("fleet loaded: {} markers", report.created);
                    }
                }
                Err(err) => self.report_failure("fleet", &err),
            },
        }
    }

    fn on_lifecycle_success(&mut self, command: LifecycleCommand) {
        let label = command.label();
        match command {
            LifecycleCommand::Start => {
                self.session.set_running(true);
                self.timer.arm(self.session.tick_period());
            }
            LifecycleCommand::Stop => {
                self.session.set_running(false);
                self.timer.disarm();
                self.session.cancel_in_flight();
            }
            LifecycleCommand::Reset => {
                self.session.cancel_in_flight();
                self.session.reset();
                self.refresh_after_reset();
            }
            LifecycleCommand::Generate(_) => {
                // The backend halts the simulation when it rebuilds the world.
                self.session.set_running(false);
                self.timer.disarm();
                self.session.cancel_in_flight();
                self.session.reset();
                let cleared = self.reconciler.as_mut().map(EntityReconciler::clear_all);
                self.check_surface("map", cleared);
                self.spawn_fleet_reload();
                self.refresh_after_reset();
            }
        }
        self.publish_controls();
        let context = LogContext::new()
            .with_command(label)
            .with_speed(self.session.speed_multiplier());
        let message = match self.timer.period() {
            Some(period) => format!("acknowledged; ticking every {}ms", period.as_millis()),
            None => "acknowledged".to_owned(),
        };
        log_system_event(
            Some(&context),
            &format!("session.{label}"),
            &message,
            SystemEventOutcome::Success,
        );
    }

    fn refresh_after_reset(&mut self) {
        let reinitialised = self.charts.as_mut().map(ChartPanel::reinitialize);
        self.check_surface("charts", reinitialised);
        let cleared = self.log.as_mut().map(LogTailer::clear);
        self.check_surface("log", cleared);
        self.show_timeline_placeholder();
        let deselected = self.selector.as_mut().map(|selector| selector.select(None));
        self.check_surface("selector", deselected);
        self.spawn_snapshot(None, TickPlan::default());
        self.spawn_selector_refresh();
    }

    fn apply_snapshot(
        &mut self,
        tick: Option<u64>,
        plan: TickPlan,
        result: Result<SimulationSnapshot, ClientError>,
    ) {
        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.report_failure("snapshot", &err);
                return;
            }
        };
        let reconciled = self
            .reconciler
            .as_mut()
            .map(|reconciler| reconciler.reconcile(&snapshot.agents, &snapshot.stations));
        self.check_surface("map", reconciled);
        let rendered = self
            .metrics
            .as_mut()
            .map(|metrics| metrics.render(&snapshot.metrics));
        self.check_surface("metrics", rendered);
        if plan.append_charts {
            let pushed = self
                .charts
                .as_mut()
                .map(|charts| charts.push(&snapshot.metrics, snapshot.step));
            self.check_surface("charts", pushed);
        }
        evq_debug!(
            context = LogContext::new().with_tick(tick.unwrap_or_default()),
            "applied snapshot step {}",
            snapshot.step
        );
    }

    fn apply_selector(&mut self, result: Result<Vec<AgentState>, ClientError>) {
        let agents = match result {
            Ok(agents) => agents,
            Err(err) => {
                self.report_failure("selector", &err);
                return;
            }
        };
        let previous = self.session.selected_agent_id().map(str::to_owned);
        let refreshed = self
            .selector
            .as_mut()
            .map(|selector| selector.refresh(&agents, previous.as_deref()));
        match self.check_surface("selector", refreshed) {
            Some(SelectionRestore::Retained(agent_id)) => self.spawn_journey(agent_id),
            Some(SelectionRestore::Dropped(agent_id)) => {
                evq_info!(
                    context = LogContext::new().with_agent(&agent_id),
                    "selected agent no longer listed; selection cleared"
                );
                self.session.select(None);
                self.show_timeline_placeholder();
            }
            Some(SelectionRestore::Nothing) | None => {}
        }
    }

    fn apply_journey(&mut self, agent_id: String, result: Result<Vec<JourneyEvent>, ClientError>) {
        if self.session.selected_agent_id() != Some(agent_id.as_str()) {
            evq_debug!(
                context = LogContext::new().with_agent(&agent_id),
                "discarding journey of an agent that is no longer selected"
            );
            return;
        }
        match result {
            Ok(events) => {
                let rendered = self
                    .timeline
                    .as_mut()
                    .map(|timeline| timeline.render(&events));
                self.check_surface("timeline", rendered);
            }
            Err(err) => self.report_failure("journey", &err),
        }
    }

    fn apply_logs(&mut self, result: Result<Vec<String>, ClientError>) {
        if !self.session.running() {
            return;
        }
        match result {
            Ok(lines) => {
                let applied = self.log.as_mut().map(|log| log.apply(&lines));
                self.check_surface("log", applied);
            }
            Err(err) => self.report_failure("logs", &err),
        }
    }

    fn show_timeline_placeholder(&mut self) {
        let shown = self
            .timeline
            .as_mut()
            .map(|timeline| timeline.show_placeholder(TimelinePlaceholder::SelectAgent));
        self.check_surface("timeline", shown);
    }

    fn publish_controls(&mut self) {
        let controls = self.session.controls();
        let published = self
            .status
            .as_mut()
            .map(|status| status.set_controls(controls));
        self.check_surface("status", published);
    }

    fn publish_speed(&mut self) {
        let speed = self.session.speed_multiplier();
        let published = self.status.as_mut().map(|status| status.set_speed(speed));
        self.check_surface("status", published);
    }

    fn spawn_lifecycle(&mut self, command: LifecycleCommand) {
        let api = self.api.clone();
        self.lifecycle_pending = Some(command.label());
        // Lifecycle acknowledgements are never cancelled by an epoch change.
        self.tasks.spawn(async move {
            let result = api.execute(&command).await;
            Envelope {
                epoch: CancellationToken::new(),
                outcome: Some(Outcome::Lifecycle { command, result }),
            }
        });
    }

    fn spawn_in_epoch<F>(&mut self, work: F)
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        let epoch = self.session.epoch().clone();
        self.tasks.spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = epoch.cancelled() => None,
                outcome = work => Some(outcome),
            };
            Envelope { epoch, outcome }
        });
    }

    fn spawn_snapshot(&mut self, tick: Option<u64>, plan: TickPlan) {
        let api = self.api.clone();
        let fetch_agents = plan.refresh_selector && self.selector.is_some();
        self.spawn_in_epoch(async move {
            let snapshot = api.snapshot().await;
            let agents = if fetch_agents {
                Some(api.agents().await)
            } else {
                None
            };
            Outcome::Snapshot {
                tick,
                plan,
                snapshot,
                agents,
            }
        });
    }

    fn spawn_selector_refresh(&mut self) {
        if self.selector.is_none() {
            return;
        }
        let api = self.api.clone();
        self.spawn_in_epoch(async move { Outcome::Selector(api.agents().await) });
    }

    fn spawn_journey(&mut self, agent_id: String) {
        if self.timeline.is_none() {
            return;
        }
        let api = self.api.clone();
        self.spawn_in_epoch(async move {
            let result = api.journey_log(&agent_id).await;
            Outcome::Journey { agent_id, result }
        });
    }

    fn spawn_fleet_reload(&mut self) {
        if self.reconciler.is_none() {
            return;
        }
        let api = self.api.clone();
        self.spawn_in_epoch(async move {
            let agents = match api.agents().await {
                Ok(agents) => agents,
                Err(err) => return Outcome::Fleet(Err(err)),
            };
            Outcome::Fleet(api.stations().await.map(|stations| (agents, stations)))
        });
    }

    fn check_surface<T>(
        &mut self,
        component: &'static str,
        result: Option<Result<T, SurfaceError>>,
    ) -> Option<T> {
        match result? {
            Ok(value) => Some(value),
            Err(err) => {
                self.report_failure(component, &SessionError::Surface(err));
                None
            }
        }
    }

    /// Single sink for every failure: structured log, recent-error ring and
    /// the status line.
    fn report_failure(&mut self, operation: &str, error: &dyn fmt::Display) {
        let message = format!("{operation}: {error}");
        let context = LogContext::new()
            .with_command(operation)
            .with_tick(self.session.tick_counter())
            .with_speed(self.session.speed_multiplier());
        evq_error!(context = context, "{}", message);
        if self.recent_errors.len() == RECENT_ERROR_LIMIT {
            self.recent_errors.pop_front();
        }
        self.recent_errors.push_back(message.clone());
        if let Some(status) = self.status.as_mut() {
            if let Err(err) = status.report_error(&message) {
                warn!(error = %err, "status surface rejected error line");
            }
        }
    }
}
