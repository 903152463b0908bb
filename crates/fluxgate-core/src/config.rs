/// This config file lists out the default values for the fluxgate settings.
/// All can be overridden by an ENV var of the same name. These should only
/// be primitive types.
use crate::macros::get_fluxgate_setting;

/// whether every single handler delivery is written to the trace log
pub static FLUXGATE_LOG_DELIVERIES: bool = false;

/// log level used by the logging middleware when built from the environment
pub static FLUXGATE_MIDDLEWARE_LOG_LEVEL: &'static str = "debug";

/// Runtime options of a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Trace-log each handler invocation, including promotions by `wait_for`
    pub log_deliveries: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            log_deliveries: FLUXGATE_LOG_DELIVERIES,
        }
    }
}

impl DispatcherConfig {
    /// Builds the config from the `FLUXGATE_*` environment variables
    pub fn from_env() -> Self {
        Self {
            log_deliveries: get_fluxgate_setting!(FLUXGATE_LOG_DELIVERIES, bool),
        }
    }
}

/// Level used by [`LoggingMiddleware::from_env`](crate::LoggingMiddleware::from_env).
pub fn middleware_log_level() -> log::Level {
    let raw = get_fluxgate_setting!(FLUXGATE_MIDDLEWARE_LOG_LEVEL);
    match raw.parse() {
        Ok(level) => level,
        Err(_e) => {
            log::warn!(
                "Env var setting FLUXGATE_MIDDLEWARE_LOG_LEVEL, '{}' is not a valid log level. Using default",
                raw
            );
            log::Level::Debug
        }
    }
}
