use crate::controller::RadioController;
use crate::error::ControlResult;
use crate::api::types::PlotKind;
use tokio::sync::oneshot;

fn with_controller<T>(f: impl FnOnce(&RadioController) -> ControlResult<T>) -> Result<T, String> {
    let controller = crate::controller().map_err(|e| e.to_string())?;
    f(&controller).map_err(|e| e.to_string())
}

// ===== Lifecycle =====

pub fn reset() -> Result<(), String> {
    with_controller(RadioController::reset)
}

pub fn start() -> Result<(), String> {
    with_controller(RadioController::start)
}

pub fn stop() -> Result<(), String> {
    with_controller(RadioController::stop)
}

pub fn is_running() -> bool {
    crate::controller().is_ok_and(|c| c.is_running())
}

// ===== Components =====

pub fn create_radio_source(name: &str, frequency_mhz: f64) -> Result<(), String> {
    with_controller(|c| c.create_radio_source(name, frequency_mhz))
}

pub fn create_radio_sink(name: &str, frequency_mhz: f64) -> Result<(), String> {
    with_controller(|c| c.create_radio_sink(name, frequency_mhz))
}

pub fn create_display_sink(name: &str) -> Result<(), String> {
    with_controller(|c| c.create_display_sink(name))
}

pub fn create_plot_display_sink(
    name: &str,
    plot: PlotKind,
    frequency_mhz: f64,
) -> Result<(), String> {
    with_controller(|c| c.create_plot_display_sink(name, plot, frequency_mhz))
}

pub fn create_message_source(name: &str, bit_rate: u32) -> Result<(), String> {
    with_controller(|c| c.create_message_source(name, bit_rate))
}

pub fn create_message_sink(name: &str) -> Result<(), String> {
    with_controller(|c| c.create_message_sink(name))
}

pub fn create_simple_framer(name: &str) -> Result<(), String> {
    with_controller(|c| c.create_simple_framer(name))
}

pub fn create_simple_deframer(name: &str) -> Result<(), String> {
    with_controller(|c| c.create_simple_deframer(name))
}

pub fn create_manchester_encoder(name: &str) -> Result<(), String> {
    with_controller(|c| c.create_manchester_encoder(name))
}

pub fn create_manchester_decoder(name: &str) -> Result<(), String> {
    with_controller(|c| c.create_manchester_decoder(name))
}

pub fn create_low_pass_filter(name: &str, bandwidth_khz: f64) -> Result<(), String> {
    with_controller(|c| c.create_low_pass_filter(name, bandwidth_khz))
}

pub fn create_band_pass_filter(name: &str, low_khz: f64, high_khz: f64) -> Result<(), String> {
    with_controller(|c| c.create_band_pass_filter(name, low_khz, high_khz))
}

pub fn create_decimation_filter(name: &str, factor: u32, gain: f64) -> Result<(), String> {
    with_controller(|c| c.create_decimation_filter(name, factor, gain))
}

pub fn create_interpolation_filter(name: &str, factor: u32, gain: f64) -> Result<(), String> {
    with_controller(|c| c.create_interpolation_filter(name, factor, gain))
}

pub fn create_sample_rate_limiter(name: &str, sample_rate: u32) -> Result<(), String> {
    with_controller(|c| c.create_sample_rate_limiter(name, sample_rate))
}

pub fn create_ook_modulator(name: &str, bit_rate: u32, mod_freq_khz: u32) -> Result<(), String> {
    with_controller(|c| c.create_ook_modulator(name, bit_rate, mod_freq_khz))
}

pub fn create_ook_demodulator(name: &str, bit_rate: u32) -> Result<(), String> {
    with_controller(|c| c.create_ook_demodulator(name, bit_rate))
}

pub fn create_bit_rate_sampler(name: &str, bit_rate: u32) -> Result<(), String> {
    with_controller(|c| c.create_bit_rate_sampler(name, bit_rate))
}

pub fn reconnect(name: &str) -> Result<(), String> {
    with_controller(|c| c.reconnect(name))
}

pub fn make_simple_connection(producer: &str, consumer: &str) -> Result<(), String> {
    with_controller(|c| c.make_simple_connection(producer, consumer))
}

// ===== Messages =====

pub fn send_simple_message(text: &str) -> Result<(), String> {
    with_controller(|c| c.send_message(text))
}

/// Wait for the next received line. Failures are reported through the error
/// callbacks and yield an empty string.
pub async fn receive_simple_message() -> Result<String, String> {
    let controller = crate::controller().map_err(|e| e.to_string())?;
    Ok(controller.receive_message().await)
}

// ===== Errors =====

/// Register a callback fired once, for the next reported error.
pub fn on_next_error<F>(callback: F) -> Result<(), String>
where
    F: FnOnce(&str) + Send + 'static,
{
    let controller = crate::controller().map_err(|e| e.to_string())?;
    controller.errors().subscribe(callback);
    Ok(())
}

/// Resolve with the message of the next reported error.
pub fn next_error() -> Result<oneshot::Receiver<String>, String> {
    let controller = crate::controller().map_err(|e| e.to_string())?;
    Ok(controller.errors().subscribe_once())
}

/// Forward every reported error to `forward` until the controller is
/// cleaned up.
pub fn watch_errors<F>(forward: F) -> Result<(), String>
where
    F: Fn(&str) + Send + Sync + 'static,
{
    let controller = crate::controller().map_err(|e| e.to_string())?;
    crate::notifier::watch_errors(controller.errors(), forward);
    Ok(())
}
