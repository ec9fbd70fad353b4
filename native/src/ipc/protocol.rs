// Request/response types exchanged with the block host, JSON encoded.
use crate::api::types::{ControllerSnapshot, Diagnostics, PlotKind, StatusReport};
use serde::{Deserialize, Serialize};

/// Request with optional correlation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadioRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<u32>,

    #[serde(flatten)]
    pub request: RadioRequestType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RadioRequestType {
    // Lifecycle
    Reset,
    Start,
    Stop,
    IsRunning,

    // Graph
    Create {
        name: String,
        component: ComponentRequest,
    },
    Reconnect {
        name: String,
    },
    Connect {
        producer: String,
        consumer: String,
    },

    // Messages
    SendMessage {
        text: String,
    },
    ReceiveMessage,

    // System
    GetStatus,
    GetState,
    GetVersion,
    GetDiagnostics,
    ClearCrashLog,
    Shutdown,
}

impl RadioRequestType {
    /// Requests that may wait on the engine indefinitely. These are answered
    /// out of order so the connection stays responsive.
    pub fn may_wait(&self) -> bool {
        matches!(self, Self::ReceiveMessage)
    }
}

/// Component to create, with its user-facing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentRequest {
    RadioSource { frequency_mhz: f64 },
    RadioSink { frequency_mhz: f64 },
    DisplaySink,
    PlotDisplaySink { plot: PlotKind, frequency_mhz: f64 },
    MessageSource { bit_rate: u32 },
    MessageSink,
    SimpleFramer,
    SimpleDeframer,
    ManchesterEncoder,
    ManchesterDecoder,
    LowPassFilter { bandwidth_khz: f64 },
    BandPassFilter { low_khz: f64, high_khz: f64 },
    DecimationFilter {
        factor: u32,
        #[serde(default = "unity_gain")]
        gain: f64,
    },
    InterpolationFilter {
        factor: u32,
        #[serde(default = "unity_gain")]
        gain: f64,
    },
    SampleRateLimiter { sample_rate: u32 },
    OokModulator { bit_rate: u32, mod_freq_khz: u32 },
    OokDemodulator { bit_rate: u32 },
    BitRateSampler { bit_rate: u32 },
}

fn unity_gain() -> f64 {
    1.0
}

/// Response to a request, or an unsolicited notification when
/// `message_id` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadioResponse {
    pub message_id: Option<u32>,

    #[serde(flatten)]
    pub response: RadioResponseType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RadioResponseType {
    Success,
    Error { message: String },
    BoolValue { value: bool },
    StringValue { value: String },
    Message { text: String },
    Status { data: StatusReport },
    State { data: ControllerSnapshot },
    Diagnostics { data: Diagnostics },
    /// Notification: the control service is closing.
    Shutdown,
}

impl RadioRequest {
    pub fn request(message_id: u32, request: RadioRequestType) -> Self {
        Self {
            message_id: Some(message_id),
            request,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl RadioResponse {
    pub fn response(message_id: Option<u32>, response: RadioResponseType) -> Self {
        Self {
            message_id,
            response,
        }
    }

    pub fn notification(response: RadioResponseType) -> Self {
        Self {
            message_id: None,
            response,
        }
    }

    /// `Success` or `Error` depending on an api result.
    pub fn from_result(message_id: Option<u32>, result: Result<(), String>) -> Self {
        let response = match result {
            Ok(()) => RadioResponseType::Success,
            Err(message) => RadioResponseType::Error { message },
        };
        Self::response(message_id, response)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_from_host_json() {
        let json = br#"{"message_id":7,"type":"Create","name":"src","component":{"kind":"radio_source","frequency_mhz":433.92}}"#;
        let request = RadioRequest::from_bytes(json).unwrap();
        assert_eq!(request.message_id, Some(7));
        match request.request {
            RadioRequestType::Create { name, component } => {
                assert_eq!(name, "src");
                assert_eq!(
                    component,
                    ComponentRequest::RadioSource {
                        frequency_mhz: 433.92
                    }
                );
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn filter_gain_defaults_to_unity() {
        let json = br#"{"type":"Create","name":"decim","component":{"kind":"decimation_filter","factor":4}}"#;
        match RadioRequest::from_bytes(json).unwrap().request {
            RadioRequestType::Create { component, .. } => assert_eq!(
                component,
                ComponentRequest::DecimationFilter {
                    factor: 4,
                    gain: 1.0
                }
            ),
            other => panic!("unexpected request {:?}", other),
        }

        let json = br#"{"type":"Create","name":"fall","component":{"kind":"plot_display_sink","plot":"waterfall","frequency_mhz":433.0}}"#;
        assert!(RadioRequest::from_bytes(json).is_ok());
    }

    #[test]
    fn unit_requests_need_only_a_type() {
        let request = RadioRequest::from_bytes(br#"{"type":"Start"}"#).unwrap();
        assert_eq!(request.message_id, None);
        assert!(matches!(request.request, RadioRequestType::Start));
    }

    #[test]
    fn diagnostics_response_json() {
        let response = RadioResponse::response(
            Some(3),
            RadioResponseType::Diagnostics {
                data: Diagnostics {
                    crash_log_path: Some("/tmp/radio_crash.log".to_string()),
                    error_reporting: false,
                },
            },
        );
        let value: serde_json::Value =
            serde_json::from_slice(&response.to_bytes().unwrap()).unwrap();
        assert_eq!(value["type"], "Diagnostics");
        assert_eq!(value["data"]["crash_log_path"], "/tmp/radio_crash.log");
        assert_eq!(value["data"]["error_reporting"], false);

        let request = RadioRequest::from_bytes(br#"{"message_id":4,"type":"ClearCrashLog"}"#).unwrap();
        assert!(matches!(request.request, RadioRequestType::ClearCrashLog));
    }

    #[test]
    fn error_notification_json() {
        let notification = RadioResponse::notification(RadioResponseType::Error {
            message: "Component not found: rx".to_string(),
        });
        let value: serde_json::Value =
            serde_json::from_slice(&notification.to_bytes().unwrap()).unwrap();
        assert_eq!(value["type"], "Error");
        assert_eq!(value["message_id"], serde_json::Value::Null);
        assert_eq!(value["message"], "Component not found: rx");
    }
}
