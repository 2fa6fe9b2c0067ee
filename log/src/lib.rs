use std::{fmt::Display, str::FromStr};

use backtrace::Backtrace;
use tracing::{debug, error, info, level_filters::LevelFilter, trace, warn};

/// Installs the global `tracing` subscriber.
///
/// Only the first call installs anything; later calls report an error
/// instead of panicking so tests can initialise logging freely.
pub fn init(display_level: &bool, level_filter: &str) -> Result<(), String> {
    let level_filter = LevelFilter::from_str(level_filter)
        .map_err(|err| format!("Invalid log level filter '{level_filter}': {err}"))?;

    tracing_subscriber::fmt()
        .with_level(*display_level)
        .with_max_level(level_filter)
        .with_target(false)
        .try_init()
        .map_err(|err| err.to_string())
}

pub fn trace<T: Display>(component: &str, msg: T) {
    trace!(component, "{msg}");
}

pub fn debug<T: Display>(component: &str, msg: T) {
    debug!(component, "{msg}");
}

pub fn info<T: Display>(component: &str, msg: T) {
    info!(component, "{msg}");
}

pub fn warn<T: Display>(component: &str, msg: T) {
    warn!(component, "{msg}");
}

pub fn error<T: Display>(component: &str, msg: T) {
    let show_backtrace = std::env::var("RUST_BACKTRACE").is_ok_and(|var| var == "1");
    match show_backtrace {
        true => error!(component, "{msg}\n{:?}", Backtrace::new()),
        false => error!(component, "{msg}"),
    }
}
