use serde::{Deserialize, Serialize};

pub use crate::channel::{ChannelStatus, StatusReport};
pub use crate::graph::PlotKind;

/// Snapshot of the controller for the host's status display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub running: bool,
    pub transmit_open: bool,
    pub receive_open: bool,
    pub components: Vec<String>,
    /// Component whose output is still waiting for a consumer.
    pub cursor: Option<String>,
    pub pending_error_callbacks: usize,
}

/// Where failures are recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostics {
    pub crash_log_path: Option<String>,
    /// Sentry reporting is active.
    pub error_reporting: bool,
}
