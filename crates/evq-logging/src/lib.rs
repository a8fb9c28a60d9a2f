//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Structured logging context and macros."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Logging context shared by the session controller and the CLI tools.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

#[doc(hidden)]
pub use tracing;

/// Initialize a baseline stderr subscriber suitable for one-shot tools.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Scheduler tick the event belongs to.
    pub tick: Option<u64>,
    /// Agent identifier associated with the log event.
    pub agent: Option<&'a str>,
    /// Lifecycle command or fetch being processed.
    pub command: Option<&'a str>,
    /// Speed multiplier in effect.
    pub speed: Option<u32>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a tick value.
    pub fn with_tick(mut self, tick: u64) -> Self {
        self.tick = Some(tick);
        self
    }

    /// Attach an agent identifier.
    pub fn with_agent(mut self, agent: &'a str) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Attach the command or operation name.
    pub fn with_command(mut self, command: &'a str) -> Self {
        self.command = Some(command);
        self
    }

    /// Attach the speed multiplier.
    pub fn with_speed(mut self, speed: u32) -> Self {
        self.speed = Some(speed);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation failed or was rejected.
    Fault,
}

impl SystemEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized lifecycle event with a success/fault outcome.
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    match outcome {
        SystemEventOutcome::Success => tracing::info!(
            event,
            outcome = outcome.as_str(),
            tick = ctx.tick.unwrap_or_default(),
            command = ctx.command.unwrap_or(""),
            speed = ctx.speed.unwrap_or_default(),
            message = %message
        ),
        SystemEventOutcome::Fault => tracing::error!(
            event,
            outcome = outcome.as_str(),
            tick = ctx.tick.unwrap_or_default(),
            command = ctx.command.unwrap_or(""),
            speed = ctx.speed.unwrap_or_default(),
            message = %message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_emit_without_panic() {
        init();
        let ctx = LogContext::new().with_tick(20).with_agent("ev-1");
        evq_info!(context = ctx.clone(), "selector refreshed");
        evq_debug!("debug message");
        evq_warn!(context = ctx.clone(), "stale journey for {}", "ev-2");
        evq_error!(context = ctx, "error code: {}", 42);
    }

    #[test]
    fn system_event_helper_emits() {
        init();
        let ctx = LogContext::new().with_command("start").with_speed(5);
        log_system_event(
            Some(&ctx),
            "session.start",
            "timer armed",
            SystemEventOutcome::Success,
        );
        log_system_event(
            None,
            "session.stop",
            "backend rejected stop",
            SystemEventOutcome::Fault,
        );
    }
}
