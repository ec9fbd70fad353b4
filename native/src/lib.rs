pub mod api;
pub mod channel;
pub mod config;
pub mod controller;
pub mod error;
pub mod graph;
#[cfg(unix)]
pub mod ipc;
pub mod logging;
pub mod notifier;

use log::{debug, info};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

pub use config::RadioConfig;
pub use controller::RadioController;
pub use error::{ControlError, ControlResult};
pub use notifier::ErrorRegistry;

// Process-wide controller used by the api layer.
pub static RADIO_CONTROLLER: Mutex<Option<Arc<RadioController>>> = Mutex::new(None);

/// Current controller, if initialized.
pub fn controller() -> ControlResult<Arc<RadioController>> {
    RADIO_CONTROLLER
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or(ControlError::NotInitialized)
}

pub fn initialize_internal(config: RadioConfig) -> ControlResult<()> {
    logging::init_logger();
    logging::init_crash_logger();

    info!("[INIT] Starting radio controller...");
    let init_start = Instant::now();

    config.validate()?;
    debug!("[INIT] Control directory: {:?}", config.control_dir);
    debug!(
        "[INIT] Sample rate {} Hz, poll interval {:?}",
        config.sample_rate,
        config.poll_interval()
    );

    let status = channel::probe_channels(&config);
    debug!("[INIT] Channel status: {}", status.msg);

    let controller = Arc::new(RadioController::new(config));
    {
        let mut guard = RADIO_CONTROLLER
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = guard.replace(controller) {
            previous.shutdown();
        }
    }

    info!("[INIT] Radio controller ready in {:?}", init_start.elapsed());
    Ok(())
}

pub fn cleanup_internal() {
    info!("[CLEANUP] Shutting down radio controller...");

    let controller = RADIO_CONTROLLER
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(controller) = controller {
        controller.shutdown();
    }

    info!("[CLEANUP] Radio controller shut down");
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
