//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Structured logging context and macros."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
/// Shared expansion used by the level-specific macros below.
#[doc(hidden)]
#[macro_export]
macro_rules! __evq_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        $crate::tracing::event!(
            $level,
            tick = ctx.tick.unwrap_or_default(),
            agent = ctx.agent.unwrap_or(""),
            command = ctx.command.unwrap_or(""),
            speed = ctx.speed.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with dashboard context.
#[macro_export]
macro_rules! evq_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__evq_event!($crate::tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__evq_event!($crate::tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with dashboard context.
#[macro_export]
macro_rules! evq_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__evq_event!($crate::tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__evq_event!($crate::tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with dashboard context.
#[macro_export]
macro_rules! evq_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__evq_event!($crate::tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__evq_event!($crate::tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with dashboard context.
#[macro_export]
macro_rules! evq_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__evq_event!($crate::tracing::Level::ERROR, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__evq_event!($crate::tracing::Level::ERROR, $crate::LogContext::default(), $($arg)+)
    };
}
