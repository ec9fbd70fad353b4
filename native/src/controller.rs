use crate::channel::{
    open_nonblocking_read, poll_until_message, probe_channels, CommandEmitter, CommandSink,
    LineMessageReader, MessageEmitter, StatusReport,
};
use crate::config::RadioConfig;
use crate::error::{ControlError, ControlResult};
use crate::graph::{ComponentGraphBuilder, ComponentKind, PlotKind};
use crate::notifier::ErrorRegistry;
use log::{error, info, warn};
use std::fs::File;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Drives the radio engine: lifecycle commands, component creation and the
/// message channels.
///
/// Every failure is returned to the caller and also delivered to the error
/// registry, so callers that only watch the registry still see it.
pub struct RadioController {
    config: RadioConfig,
    state: Mutex<ControllerState>,
    errors: Arc<ErrorRegistry>,
}

struct ControllerState {
    commands: CommandEmitter,
    tx: MessageEmitter,
    rx: LineMessageReader<File>,
    graph: ComponentGraphBuilder,
    tx_msg_start: bool,
    rx_msg_start: bool,
    running: bool,
}

impl ControllerState {
    fn new(config: &RadioConfig) -> Self {
        Self {
            commands: CommandEmitter::new(config.command_path()),
            tx: MessageEmitter::new(config.tx_message_path()),
            rx: LineMessageReader::new(config.rx_buffer_capacity),
            graph: ComponentGraphBuilder::new(),
            tx_msg_start: false,
            rx_msg_start: false,
            running: false,
        }
    }

    fn reset(&mut self) -> ControlResult<()> {
        if self.running {
            self.stop()?;
        }
        self.tx_msg_start = false;
        self.rx_msg_start = false;
        self.graph.reset();
        self.commands.send("RESET")?;
        info!("[RADIO] Reset");
        Ok(())
    }

    fn start(&mut self, config: &RadioConfig) -> ControlResult<()> {
        self.commands.send("START")?;
        if let Err(e) = self.open_message_channels(config) {
            // Leave the engine stopped so it agrees with `running`.
            self.tx.close();
            self.rx.detach();
            if let Err(stop_err) = self.commands.send("STOP") {
                warn!("[RADIO] Failed to stop after aborted start: {}", stop_err);
            }
            return Err(e);
        }
        self.running = true;
        info!("[RADIO] Started");
        Ok(())
    }

    fn open_message_channels(&mut self, config: &RadioConfig) -> ControlResult<()> {
        if self.tx_msg_start && !self.tx.is_open() {
            self.tx.open()?;
        }
        if self.rx_msg_start && !self.rx.is_open() {
            let path = config.rx_message_path();
            let file = open_nonblocking_read(&path).map_err(|e| {
                ControlError::io(format!("Failed to open receive pipe {:?}", path), e)
            })?;
            info!("[RX] Opened receive pipe {:?}", path);
            self.rx.attach(file);
        }
        Ok(())
    }

    fn stop(&mut self) -> ControlResult<()> {
        self.commands.send("STOP")?;
        self.running = false;
        self.tx.close();
        if self.rx.detach().is_some() {
            info!("[RX] Closed receive pipe");
        }
        info!("[RADIO] Stopped");
        Ok(())
    }

    fn create(&mut self, name: &str, kind: &ComponentKind) -> ControlResult<()> {
        self.graph.create(name, kind, &mut self.commands)?;
        match kind {
            ComponentKind::MessageSource { .. } => self.tx_msg_start = true,
            ComponentKind::MessageSink { .. } => self.rx_msg_start = true,
            _ => {}
        }
        Ok(())
    }
}

impl RadioController {
    pub fn new(config: RadioConfig) -> Self {
        Self::with_registry(config, Arc::new(ErrorRegistry::new()))
    }

    pub fn with_registry(config: RadioConfig, errors: Arc<ErrorRegistry>) -> Self {
        let state = ControllerState::new(&config);
        Self {
            config,
            state: Mutex::new(state),
            errors,
        }
    }

    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    pub fn errors(&self) -> &Arc<ErrorRegistry> {
        &self.errors
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify_error(&self, error: &ControlError) {
        if error.is_graph_error() {
            warn!("[GRAPH] {}", error);
        } else {
            error!("[RADIO] {}", error);
        }
        self.errors.notify(&error.to_string());
    }

    /// Publish a failed result to the registry. The state lock must already
    /// be released, since subscribers may call back into the controller.
    fn report<T>(&self, result: ControlResult<T>) -> ControlResult<T> {
        if let Err(ref e) = result {
            self.notify_error(e);
        }
        result
    }

    // ===== Lifecycle =====

    /// Stop if running, forget every component and send `RESET`.
    pub fn reset(&self) -> ControlResult<()> {
        let result = self.state().reset();
        self.report(result)
    }

    /// Send `START` and open the message channels declared this session.
    pub fn start(&self) -> ControlResult<()> {
        let result = self.state().start(&self.config);
        self.report(result)
    }

    /// Send `STOP` and release the message channels. A pending receive fails
    /// on its next poll.
    pub fn stop(&self) -> ControlResult<()> {
        let result = self.state().stop();
        self.report(result)
    }

    pub fn is_running(&self) -> bool {
        self.state().running
    }

    pub fn is_transmit_open(&self) -> bool {
        self.state().tx.is_open()
    }

    pub fn is_receive_open(&self) -> bool {
        self.state().rx.is_open()
    }

    /// Close every channel, including the command pipe.
    pub fn shutdown(&self) {
        let mut state = self.state();
        state.commands.close();
        state.tx.close();
        state.rx.detach();
        info!("[RADIO] Channels closed");
    }

    pub fn status(&self) -> StatusReport {
        probe_channels(&self.config)
    }

    pub fn component_names(&self) -> Vec<String> {
        self.state().graph.component_names()
    }

    pub fn cursor(&self) -> Option<String> {
        self.state().graph.cursor().map(str::to_string)
    }

    // ===== Components =====

    fn create(&self, name: &str, kind: ControlResult<ComponentKind>) -> ControlResult<()> {
        let result = kind.and_then(|kind| self.state().create(name, &kind));
        self.report(result)
    }

    pub fn create_radio_source(&self, name: &str, frequency_mhz: f64) -> ControlResult<()> {
        self.create(
            name,
            ComponentKind::radio_source(frequency_mhz, self.config.sample_rate),
        )
    }

    pub fn create_radio_sink(&self, name: &str, frequency_mhz: f64) -> ControlResult<()> {
        self.create(
            name,
            ComponentKind::radio_sink(frequency_mhz, self.config.sample_rate),
        )
    }

    pub fn create_display_sink(&self, name: &str) -> ControlResult<()> {
        self.create(name, Ok(ComponentKind::DisplaySink))
    }

    /// Display sink that labels its plot with the given tuning frequency and
    /// the configured sample rate.
    pub fn create_plot_display_sink(
        &self,
        name: &str,
        plot: PlotKind,
        frequency_mhz: f64,
    ) -> ControlResult<()> {
        self.create(
            name,
            ComponentKind::plot_display_sink(plot, frequency_mhz, self.config.sample_rate),
        )
    }

    pub fn create_message_source(&self, name: &str, bit_rate: u32) -> ControlResult<()> {
        self.create(
            name,
            ComponentKind::message_source(self.config.tx_message_path(), bit_rate),
        )
    }

    pub fn create_message_sink(&self, name: &str) -> ControlResult<()> {
        self.create(
            name,
            Ok(ComponentKind::MessageSink {
                pipe: self.config.rx_message_path(),
            }),
        )
    }

    pub fn create_simple_framer(&self, name: &str) -> ControlResult<()> {
        self.create(name, Ok(ComponentKind::SimpleFramer))
    }

    pub fn create_simple_deframer(&self, name: &str) -> ControlResult<()> {
        self.create(name, Ok(ComponentKind::SimpleDeframer))
    }

    pub fn create_manchester_encoder(&self, name: &str) -> ControlResult<()> {
        self.create(name, Ok(ComponentKind::ManchesterEncoder))
    }

    pub fn create_manchester_decoder(&self, name: &str) -> ControlResult<()> {
        self.create(name, Ok(ComponentKind::ManchesterDecoder))
    }

    pub fn create_low_pass_filter(&self, name: &str, bandwidth_khz: f64) -> ControlResult<()> {
        self.create(
            name,
            ComponentKind::low_pass_filter(bandwidth_khz, self.config.sample_rate),
        )
    }

    pub fn create_band_pass_filter(
        &self,
        name: &str,
        low_khz: f64,
        high_khz: f64,
    ) -> ControlResult<()> {
        self.create(
            name,
            ComponentKind::band_pass_filter(low_khz, high_khz, self.config.sample_rate),
        )
    }

    pub fn create_decimation_filter(&self, name: &str, factor: u32, gain: f64) -> ControlResult<()> {
        self.create(name, ComponentKind::decimation_filter(factor, gain))
    }

    pub fn create_interpolation_filter(
        &self,
        name: &str,
        factor: u32,
        gain: f64,
    ) -> ControlResult<()> {
        self.create(name, ComponentKind::interpolation_filter(factor, gain))
    }

    pub fn create_sample_rate_limiter(&self, name: &str, sample_rate: u32) -> ControlResult<()> {
        self.create(name, ComponentKind::sample_rate_limiter(sample_rate))
    }

    pub fn create_ook_modulator(
        &self,
        name: &str,
        bit_rate: u32,
        mod_freq_khz: u32,
    ) -> ControlResult<()> {
        self.create(
            name,
            ComponentKind::ook_modulator(bit_rate, mod_freq_khz, self.config.sample_rate),
        )
    }

    pub fn create_ook_demodulator(&self, name: &str, bit_rate: u32) -> ControlResult<()> {
        self.create(
            name,
            ComponentKind::ook_demodulator(bit_rate, self.config.sample_rate),
        )
    }

    pub fn create_bit_rate_sampler(&self, name: &str, bit_rate: u32) -> ControlResult<()> {
        self.create(
            name,
            ComponentKind::bit_rate_sampler(bit_rate, self.config.sample_rate),
        )
    }

    /// Continue building from the output of an existing component.
    pub fn reconnect(&self, name: &str) -> ControlResult<()> {
        let result = self.state().graph.reconnect(name);
        self.report(result)
    }

    /// Connect two existing components explicitly.
    pub fn make_simple_connection(&self, producer: &str, consumer: &str) -> ControlResult<()> {
        let result = {
            let mut state = self.state();
            let ControllerState {
                graph, commands, ..
            } = &mut *state;
            graph.connect(producer, consumer, commands)
        };
        self.report(result)
    }

    // ===== Messages =====

    /// Queue a payload line for transmission. Dropped while the transmit
    /// channel is closed.
    pub fn send_message(&self, payload: &str) -> ControlResult<()> {
        let result = self.state().tx.send_message(payload);
        self.report(result)
    }

    /// Wait for the next received line.
    pub async fn try_receive_message(&self) -> ControlResult<String> {
        poll_until_message(|| self.state().rx.poll_once(), self.config.poll_interval()).await
    }

    /// Wait for the next received line, yielding an empty string after
    /// reporting a failure to the registry.
    pub async fn receive_message(&self) -> String {
        match self.try_receive_message().await {
            Ok(message) => message,
            Err(e) => {
                self.notify_error(&e);
                String::new()
            }
        }
    }
}
