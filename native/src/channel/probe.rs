use crate::config::RadioConfig;
use serde::{Deserialize, Serialize};

/// Readiness level reported to the host, using its numeric status codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    NotReady,
    Ready,
}

impl ChannelStatus {
    pub fn code(self) -> u8 {
        match self {
            Self::NotReady => 0,
            Self::Ready => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusReport {
    pub status: ChannelStatus,
    pub msg: String,
}

impl StatusReport {
    fn not_ready(msg: &str) -> Self {
        Self {
            status: ChannelStatus::NotReady,
            msg: msg.to_string(),
        }
    }
}

/// Check that the engine has created all three pipe endpoints.
pub fn probe_channels(config: &RadioConfig) -> StatusReport {
    if !config.command_path().exists() {
        return StatusReport::not_ready("No command pipe found");
    }
    if !config.tx_message_path().exists() {
        return StatusReport::not_ready("No transmit pipe found");
    }
    if !config.rx_message_path().exists() {
        return StatusReport::not_ready("No receive pipe found");
    }
    StatusReport {
        status: ChannelStatus::Ready,
        msg: "Ready".to_string(),
    }
}
