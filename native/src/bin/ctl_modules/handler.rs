// Request handler invoked by the IPC serve loop.

use log::info;
use scratch_radio_control::api;
use scratch_radio_control::ipc::{
    ComponentRequest, RadioRequest, RadioRequestType, RadioResponse, RadioResponseType,
    RequestHandler,
};

pub struct CommandHandler;

impl RequestHandler for CommandHandler {
    async fn handle(&self, request: RadioRequest) -> RadioResponse {
        let message_id = request.message_id;

        match request.request {
            RadioRequestType::Reset => RadioResponse::from_result(message_id, api::reset()),
            RadioRequestType::Start => RadioResponse::from_result(message_id, api::start()),
            RadioRequestType::Stop => RadioResponse::from_result(message_id, api::stop()),
            RadioRequestType::IsRunning => RadioResponse::response(
                message_id,
                RadioResponseType::BoolValue {
                    value: api::is_running(),
                },
            ),

            RadioRequestType::Create { name, component } => {
                RadioResponse::from_result(message_id, create(&name, component))
            }
            RadioRequestType::Reconnect { name } => {
                RadioResponse::from_result(message_id, api::reconnect(&name))
            }
            RadioRequestType::Connect { producer, consumer } => RadioResponse::from_result(
                message_id,
                api::make_simple_connection(&producer, &consumer),
            ),

            RadioRequestType::SendMessage { text } => {
                RadioResponse::from_result(message_id, api::send_simple_message(&text))
            }
            RadioRequestType::ReceiveMessage => match api::receive_simple_message().await {
                Ok(text) => RadioResponse::response(message_id, RadioResponseType::Message { text }),
                Err(message) => {
                    RadioResponse::response(message_id, RadioResponseType::Error { message })
                }
            },

            RadioRequestType::GetStatus => RadioResponse::response(
                message_id,
                RadioResponseType::Status {
                    data: api::get_status(),
                },
            ),
            RadioRequestType::GetState => match api::get_state() {
                Ok(data) => RadioResponse::response(message_id, RadioResponseType::State { data }),
                Err(message) => {
                    RadioResponse::response(message_id, RadioResponseType::Error { message })
                }
            },
            RadioRequestType::GetVersion => RadioResponse::response(
                message_id,
                RadioResponseType::StringValue {
                    value: api::get_version(),
                },
            ),
            RadioRequestType::GetDiagnostics => RadioResponse::response(
                message_id,
                RadioResponseType::Diagnostics {
                    data: api::get_diagnostics(),
                },
            ),
            RadioRequestType::ClearCrashLog => {
                RadioResponse::from_result(message_id, api::clear_crash_log())
            }
            RadioRequestType::Shutdown => {
                info!("[IPC] Client requested shutdown");
                RadioResponse::response(message_id, RadioResponseType::Success)
            }
        }
    }
}

fn create(name: &str, component: ComponentRequest) -> Result<(), String> {
    match component {
        ComponentRequest::RadioSource { frequency_mhz } => {
            api::create_radio_source(name, frequency_mhz)
        }
        ComponentRequest::RadioSink { frequency_mhz } => api::create_radio_sink(name, frequency_mhz),
        ComponentRequest::DisplaySink => api::create_display_sink(name),
        ComponentRequest::PlotDisplaySink {
            plot,
            frequency_mhz,
        } => api::create_plot_display_sink(name, plot, frequency_mhz),
        ComponentRequest::MessageSource { bit_rate } => api::create_message_source(name, bit_rate),
        ComponentRequest::MessageSink => api::create_message_sink(name),
        ComponentRequest::SimpleFramer => api::create_simple_framer(name),
        ComponentRequest::SimpleDeframer => api::create_simple_deframer(name),
        ComponentRequest::ManchesterEncoder => api::create_manchester_encoder(name),
        ComponentRequest::ManchesterDecoder => api::create_manchester_decoder(name),
        ComponentRequest::LowPassFilter { bandwidth_khz } => {
            api::create_low_pass_filter(name, bandwidth_khz)
        }
        ComponentRequest::BandPassFilter { low_khz, high_khz } => {
            api::create_band_pass_filter(name, low_khz, high_khz)
        }
        ComponentRequest::DecimationFilter { factor, gain } => {
            api::create_decimation_filter(name, factor, gain)
        }
        ComponentRequest::InterpolationFilter { factor, gain } => {
            api::create_interpolation_filter(name, factor, gain)
        }
        ComponentRequest::SampleRateLimiter { sample_rate } => {
            api::create_sample_rate_limiter(name, sample_rate)
        }
        ComponentRequest::OokModulator {
            bit_rate,
            mod_freq_khz,
        } => api::create_ook_modulator(name, bit_rate, mod_freq_khz),
        ComponentRequest::OokDemodulator { bit_rate } => api::create_ook_demodulator(name, bit_rate),
        ComponentRequest::BitRateSampler { bit_rate } => {
            api::create_bit_rate_sampler(name, bit_rate)
        }
    }
}
