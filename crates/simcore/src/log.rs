//! Logging facilities.

use atty::Stream;
use colored::{Color, ColoredString, Colorize};
use log::error;
use serde::Serialize;
use serde_json::json;

use crate::event::Event;

/// Applies the color to the string if stderr (log) goes to console.
pub fn get_colored(s: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        s.color(color)
    } else {
        s.normal()
    }
}

/// Formats a component-scoped message and passes it to the `log` facade.
///
/// Output format is `[<time> <LEVEL> <component>] <message>`.
#[doc(hidden)]
#[macro_export]
macro_rules! __log_component {
    ($level:ident, $label:expr, $color:ident, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        log::$level!(
            target: ctx.name(),
            "[{:.3} {} {}] {}",
            ctx.time(),
            $crate::log::get_colored($label, $crate::colored::Color::$color),
            ctx.name(),
            format_args!($($arg)+)
        )
    }};
}

/// Logs a message at the info level.
///
/// The first argument is anything with `time()` and `name()` methods, e.g. a
/// [`SimulationContext`](crate::SimulationContext), the rest is a format string with its arguments.
///
/// # Examples
///
/// ```rust
/// use std::io::Write;
/// use env_logger::Builder;
/// use simcore::{log_info, Simulation};
///
/// // configure env_logger
/// Builder::from_default_env()
///     .format(|buf, record| writeln!(buf, "{}", record.args()))
///     .init();
///
/// let mut sim = Simulation::<u32>::new();
/// let id = sim.register("comp");
/// let ctx = sim.context(id);
/// log_info!(ctx, "started with {} events", 0);
/// ```
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::__log_component!(info, "INFO ", Green, $ctx, $($arg)+)
    };
}

/// Logs a message at the debug level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::__log_component!(debug, "DEBUG", Blue, $ctx, $($arg)+)
    };
}

/// Logs a message at the trace level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::__log_component!(trace, "TRACE", Cyan, $ctx, $($arg)+)
    };
}

/// Logs a message at the warn level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::__log_component!(warn, "WARN ", Yellow, $ctx, $($arg)+)
    };
}

/// Logs a message at the error level.
///
/// See [`log_info!`](crate::log_info!).
#[macro_export]
macro_rules! log_error {
    ($ctx:expr, $($arg:tt)+) => {
        $crate::__log_component!(error, "ERROR", Red, $ctx, $($arg)+)
    };
}

/// Logs an event addressed to an unknown component.
pub(crate) fn log_undelivered_event<D: Serialize>(event: &Event<D>) {
    error!(
        target: "simulation",
        "[{:.3} {} simulation] Undelivered event: {}",
        event.time,
        crate::log::get_colored("ERROR", colored::Color::Red),
        json!({"data": event.data, "src": event.src, "dst": event.dst})
    );
}

/// Logs incorrect event.
pub(crate) fn log_incorrect_event<D: Serialize>(event: &Event<D>, msg: &str) {
    error!(
        target: "simulation",
        "[{:.3} {} simulation] Incorrect event ({}): {}",
        event.time,
        crate::log::get_colored("ERROR", colored::Color::Red),
        msg,
        json!({"data": event.data, "src": event.src, "dst": event.dst})
    );
}
