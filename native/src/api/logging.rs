use crate::api::types::Diagnostics;
use crate::logging::{SENTRY_DSN_ENV, SENTRY_ENVIRONMENT_ENV};

/// Enable Sentry from `RADIO_SENTRY_DSN` and `RADIO_SENTRY_ENVIRONMENT`.
/// Returns whether reporting is now on.
pub fn init_error_reporting() -> bool {
    let dsn = std::env::var(SENTRY_DSN_ENV).ok();
    let environment = std::env::var(SENTRY_ENVIRONMENT_ENV).ok();
    crate::logging::init_sentry(dsn.as_deref(), environment.as_deref())
}

pub fn get_diagnostics() -> Diagnostics {
    Diagnostics {
        crash_log_path: crate::logging::get_crash_log_path(),
        error_reporting: crate::logging::is_sentry_enabled(),
    }
}

/// Remove the crash log. A no-op before the crash logger is installed.
pub fn clear_crash_log() -> Result<(), String> {
    crate::logging::clear_crash_log().map_err(|e| e.to_string())
}

pub fn log_critical_error(context: &str, error: &str) {
    crate::logging::log_critical_error(context, error);
}

pub fn capture_critical_error(context: &str, error: &str) {
    crate::logging::capture_critical_error(context, error);
}
