use super::params;
use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Port layout of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Output only.
    Source,
    /// One input, one output.
    Processor,
    /// Input only.
    Sink,
}

/// Plot style of a tuned display sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotKind {
    Spectrum,
    Waterfall,
}

impl PlotKind {
    fn keyword(self) -> &'static str {
        match self {
            Self::Spectrum => "SPECTRUM",
            Self::Waterfall => "WATERFALL",
        }
    }
}

/// Component type together with the engine-ready parameters it is created with.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentKind {
    RadioSource { frequency_hz: u64, sample_rate: u32 },
    RadioSink { frequency_hz: u64, sample_rate: u32 },
    DisplaySink,
    /// Display sink labelled with the tuning and sample rate of its input.
    PlotDisplaySink { plot: PlotKind, frequency_hz: u64, sample_rate: u32 },
    MessageSource { pipe: PathBuf, char_rate: u32 },
    MessageSink { pipe: PathBuf },
    SimpleFramer,
    SimpleDeframer,
    ManchesterEncoder,
    ManchesterDecoder,
    LowPassFilter { cutoff: f64 },
    BandPassFilter { low_cutoff: f64, high_cutoff: f64 },
    DecimationFilter { factor: u32, gain: f64 },
    InterpolationFilter { factor: u32, gain: f64 },
    /// Throttles byte streams to `sample_rate` samples per second.
    SampleRateLimiter { sample_rate: u32 },
    OokModulator { bit_rate: u32, divisor: u32, mod_frequency: u64 },
    OokDemodulator { bit_rate: u32, divisor: u32 },
    BitRateSampler { bit_rate: u32, divisor: u32 },
}

impl ComponentKind {
    pub fn radio_source(frequency_mhz: f64, sample_rate: u32) -> ControlResult<Self> {
        Ok(Self::RadioSource {
            frequency_hz: params::frequency_hz(frequency_mhz)?,
            sample_rate,
        })
    }

    pub fn radio_sink(frequency_mhz: f64, sample_rate: u32) -> ControlResult<Self> {
        Ok(Self::RadioSink {
            frequency_hz: params::frequency_hz(frequency_mhz)?,
            sample_rate,
        })
    }

    pub fn plot_display_sink(
        plot: PlotKind,
        frequency_mhz: f64,
        sample_rate: u32,
    ) -> ControlResult<Self> {
        Ok(Self::PlotDisplaySink {
            plot,
            frequency_hz: params::frequency_hz(frequency_mhz)?,
            sample_rate,
        })
    }

    pub fn message_source(pipe: PathBuf, bit_rate: u32) -> ControlResult<Self> {
        Ok(Self::MessageSource {
            pipe,
            char_rate: params::message_rate(bit_rate)?,
        })
    }

    pub fn low_pass_filter(bandwidth_khz: f64, sample_rate: u32) -> ControlResult<Self> {
        Ok(Self::LowPassFilter {
            cutoff: params::normalized_bandwidth(bandwidth_khz, sample_rate)?,
        })
    }

    pub fn band_pass_filter(low_khz: f64, high_khz: f64, sample_rate: u32) -> ControlResult<Self> {
        if low_khz >= high_khz {
            return Err(ControlError::InvalidParameter(format!(
                "band pass range {}..{} kHz",
                low_khz, high_khz
            )));
        }
        Ok(Self::BandPassFilter {
            low_cutoff: params::normalized_bandwidth(low_khz, sample_rate)?,
            high_cutoff: params::normalized_bandwidth(high_khz, sample_rate)?,
        })
    }

    pub fn decimation_filter(factor: u32, gain: f64) -> ControlResult<Self> {
        require_factor(factor)?;
        Ok(Self::DecimationFilter {
            factor,
            gain: params::gain(gain)?,
        })
    }

    pub fn interpolation_filter(factor: u32, gain: f64) -> ControlResult<Self> {
        require_factor(factor)?;
        Ok(Self::InterpolationFilter {
            factor,
            gain: params::gain(gain)?,
        })
    }

    pub fn sample_rate_limiter(sample_rate: u32) -> ControlResult<Self> {
        if sample_rate == 0 {
            return Err(ControlError::InvalidParameter(
                "sample rate limit must be greater than zero".to_string(),
            ));
        }
        Ok(Self::SampleRateLimiter { sample_rate })
    }

    pub fn ook_modulator(bit_rate: u32, mod_freq_khz: u32, sample_rate: u32) -> ControlResult<Self> {
        Ok(Self::OokModulator {
            bit_rate,
            divisor: params::sample_divisor(sample_rate, bit_rate)?,
            mod_frequency: params::modulation_frequency(mod_freq_khz, bit_rate)?,
        })
    }

    pub fn ook_demodulator(bit_rate: u32, sample_rate: u32) -> ControlResult<Self> {
        Ok(Self::OokDemodulator {
            bit_rate,
            divisor: params::sample_divisor(sample_rate, bit_rate)?,
        })
    }

    pub fn bit_rate_sampler(bit_rate: u32, sample_rate: u32) -> ControlResult<Self> {
        Ok(Self::BitRateSampler {
            bit_rate,
            divisor: params::sample_divisor(sample_rate, bit_rate)?,
        })
    }

    /// Type keyword used in `CREATE` commands.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RadioSource { .. } => "RADIO-SOURCE",
            Self::RadioSink { .. } => "RADIO-SINK",
            Self::DisplaySink | Self::PlotDisplaySink { .. } => "DISPLAY-SINK",
            Self::MessageSource { .. } => "MESSAGE-SOURCE",
            Self::MessageSink { .. } => "MESSAGE-SINK",
            Self::SimpleFramer => "SIMPLE-FRAMER",
            Self::SimpleDeframer => "SIMPLE-DEFRAMER",
            Self::ManchesterEncoder => "MANCHESTER-ENCODER",
            Self::ManchesterDecoder => "MANCHESTER-DECODER",
            Self::LowPassFilter { .. } => "LOW-PASS-FILTER",
            Self::BandPassFilter { .. } => "BAND-PASS-FILTER",
            Self::DecimationFilter { .. } => "DECIMATION-FILTER",
            Self::InterpolationFilter { .. } => "INTERPOLATION-FILTER",
            Self::SampleRateLimiter { .. } => "SAMPLE-RATE-LIMITER",
            Self::OokModulator { .. } => "OOK-MODULATOR",
            Self::OokDemodulator { .. } => "OOK-DEMODULATOR",
            Self::BitRateSampler { .. } => "BIT-RATE-SAMPLER",
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Self::RadioSource { .. } | Self::MessageSource { .. } => Role::Source,
            Self::RadioSink { .. }
            | Self::DisplaySink
            | Self::PlotDisplaySink { .. }
            | Self::MessageSink { .. } => Role::Sink,
            _ => Role::Processor,
        }
    }

    fn params(&self) -> Vec<String> {
        match self {
            Self::RadioSource {
                frequency_hz,
                sample_rate,
            }
            | Self::RadioSink {
                frequency_hz,
                sample_rate,
            } => vec![frequency_hz.to_string(), sample_rate.to_string()],
            Self::MessageSource { pipe, char_rate } => {
                vec![pipe.display().to_string(), char_rate.to_string()]
            }
            Self::MessageSink { pipe } => vec![pipe.display().to_string()],
            Self::LowPassFilter { cutoff } => vec![cutoff.to_string()],
            Self::BandPassFilter {
                low_cutoff,
                high_cutoff,
            } => vec![low_cutoff.to_string(), high_cutoff.to_string()],
            Self::PlotDisplaySink {
                plot,
                frequency_hz,
                sample_rate,
            } => vec![
                plot.keyword().to_string(),
                frequency_hz.to_string(),
                sample_rate.to_string(),
            ],
            Self::DecimationFilter { factor, gain } | Self::InterpolationFilter { factor, gain } => {
                vec![factor.to_string(), gain.to_string()]
            }
            // Only byte streams are throttled.
            Self::SampleRateLimiter { sample_rate } => vec!["b".to_string(), sample_rate.to_string()],
            Self::OokModulator {
                bit_rate,
                divisor,
                mod_frequency,
            } => vec![
                bit_rate.to_string(),
                divisor.to_string(),
                mod_frequency.to_string(),
            ],
            Self::OokDemodulator { bit_rate, divisor } | Self::BitRateSampler { bit_rate, divisor } => {
                vec![bit_rate.to_string(), divisor.to_string()]
            }
            Self::DisplaySink
            | Self::SimpleFramer
            | Self::SimpleDeframer
            | Self::ManchesterEncoder
            | Self::ManchesterDecoder => Vec::new(),
        }
    }
}

fn require_factor(factor: u32) -> ControlResult<()> {
    if factor == 0 {
        return Err(ControlError::InvalidParameter(
            "rate change factor must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// `CREATE <TYPE> <name> <params...>` for a named component.
pub struct CreateCommand<'a> {
    pub name: &'a str,
    pub kind: &'a ComponentKind,
}

impl fmt::Display for CreateCommand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE {} {}", self.kind.type_name(), self.name)?;
        for param in self.kind.params() {
            write!(f, " {}", param)?;
        }
        Ok(())
    }
}

/// Command wiring a producer's `out` port to a consumer's `in` port.
pub fn connect_command(producer: &str, consumer: &str) -> String {
    format!("CONNECT {} out {} in", producer, consumer)
}
