use crate::error::{ControlError, ControlResult};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONTROL_DIR: &str = "/tmp/lrcontrol";
pub const DEFAULT_RX_BUFFER_CAPACITY: usize = 255;
pub const DEFAULT_SAMPLE_RATE: u32 = 499_200;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

const CONFIG_FILE_NAME: &str = "control.json";

/// Channel locations and tuning for the radio controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Directory holding the pipe endpoints created by the radio engine.
    pub control_dir: PathBuf,
    pub command_pipe: String,
    pub tx_message_pipe: String,
    pub rx_message_pipe: String,
    /// Socket used by the `radio-ctl` front end.
    pub socket_name: String,
    pub rx_buffer_capacity: usize,
    /// Fixed sample rate the engine runs at, used to scale bandwidths and
    /// modulator divisors.
    pub sample_rate: u32,
    pub poll_interval_ms: u64,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            control_dir: PathBuf::from(DEFAULT_CONTROL_DIR),
            command_pipe: "command.pipe".to_string(),
            tx_message_pipe: "txmessage.pipe".to_string(),
            rx_message_pipe: "rxmessage.pipe".to_string(),
            socket_name: "control.sock".to_string(),
            rx_buffer_capacity: DEFAULT_RX_BUFFER_CAPACITY,
            sample_rate: DEFAULT_SAMPLE_RATE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl RadioConfig {
    /// Configuration rooted at `dir` with default file names.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            control_dir: dir.into(),
            ..Self::default()
        }
    }

    /// Load defaults, then the user config file if present, then environment
    /// overrides.
    pub fn load() -> ControlResult<Self> {
        let mut config = match config_file_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => {
                debug!("[CONFIG] No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        info!(
            "[CONFIG] Channels in {:?} (sample rate {} Hz, rx buffer {} bytes)",
            config.control_dir, config.sample_rate, config.rx_buffer_capacity
        );
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ControlResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ControlError::io(format!("Failed to read {:?}", path), e))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| ControlError::Config(format!("{:?}: {}", path, e)))?;
        info!("[CONFIG] Loaded {:?}", path);
        Ok(config)
    }

    /// Apply `RADIO_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ControlResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("RADIO_CONTROL_DIR") {
            self.control_dir = PathBuf::from(dir);
        }
        if let Some(rate) = lookup("RADIO_SAMPLE_RATE") {
            self.sample_rate = rate
                .trim()
                .parse()
                .map_err(|e| ControlError::Config(format!("RADIO_SAMPLE_RATE '{}': {}", rate, e)))?;
        }
        if let Some(interval) = lookup("RADIO_POLL_INTERVAL_MS") {
            self.poll_interval_ms = interval.trim().parse().map_err(|e| {
                ControlError::Config(format!("RADIO_POLL_INTERVAL_MS '{}': {}", interval, e))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ControlResult<()> {
        if self.rx_buffer_capacity == 0 {
            return Err(ControlError::Config(
                "rx_buffer_capacity must be greater than zero".to_string(),
            ));
        }
        if self.sample_rate == 0 {
            return Err(ControlError::Config(
                "sample_rate must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn command_path(&self) -> PathBuf {
        self.control_dir.join(&self.command_pipe)
    }

    pub fn tx_message_path(&self) -> PathBuf {
        self.control_dir.join(&self.tx_message_pipe)
    }

    pub fn rx_message_path(&self) -> PathBuf {
        self.control_dir.join(&self.rx_message_pipe)
    }

    pub fn socket_path(&self) -> PathBuf {
        self.control_dir.join(&self.socket_name)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("scratch-radio").join(CONFIG_FILE_NAME))
}
