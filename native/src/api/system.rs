use crate::api::types::{ControllerSnapshot, StatusReport};
use crate::channel::probe_channels;
use crate::config::RadioConfig;
use log::warn;

/// Report whether the engine's pipes exist. Before initialization the
/// configured locations are probed directly.
pub fn get_status() -> StatusReport {
    match crate::controller() {
        Ok(controller) => controller.status(),
        Err(_) => {
            let config = RadioConfig::load().unwrap_or_else(|e| {
                warn!("[CONFIG] {}, probing default locations", e);
                RadioConfig::default()
            });
            probe_channels(&config)
        }
    }
}

pub fn get_state() -> Result<ControllerSnapshot, String> {
    let controller = crate::controller().map_err(|e| e.to_string())?;
    Ok(ControllerSnapshot {
        running: controller.is_running(),
        transmit_open: controller.is_transmit_open(),
        receive_open: controller.is_receive_open(),
        components: controller.component_names(),
        cursor: controller.cursor(),
        pending_error_callbacks: controller.errors().pending(),
    })
}

pub fn get_version() -> String {
    crate::get_version()
}
