// Numeric parameter conventions shared with the radio engine.

use crate::error::{ControlError, ControlResult};

/// Tuning frequency in MHz to whole Hz.
pub fn frequency_hz(frequency_mhz: f64) -> ControlResult<u64> {
    if !frequency_mhz.is_finite() || frequency_mhz < 0.0 {
        return Err(ControlError::InvalidParameter(format!(
            "frequency {} MHz",
            frequency_mhz
        )));
    }
    Ok((frequency_mhz * 1e6).round() as u64)
}

/// Bandwidth in kHz as a fraction of the Nyquist rate for `sample_rate`.
pub fn normalized_bandwidth(bandwidth_khz: f64, sample_rate: u32) -> ControlResult<f64> {
    if !bandwidth_khz.is_finite() || bandwidth_khz < 0.0 {
        return Err(ControlError::InvalidParameter(format!(
            "bandwidth {} kHz",
            bandwidth_khz
        )));
    }
    Ok((bandwidth_khz * 2000.0) / sample_rate as f64)
}

/// Filter gain as a plain linear factor.
pub fn gain(gain: f64) -> ControlResult<f64> {
    if !gain.is_finite() {
        return Err(ControlError::InvalidParameter(format!("gain {}", gain)));
    }
    Ok(gain)
}

fn require_bit_rate(bit_rate: u32) -> ControlResult<()> {
    if bit_rate == 0 {
        return Err(ControlError::InvalidParameter(
            "bit rate must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Modulation frequency in kHz expressed in half-bit periods, truncated.
pub fn modulation_frequency(mod_freq_khz: u32, bit_rate: u32) -> ControlResult<u64> {
    require_bit_rate(bit_rate)?;
    Ok((u64::from(mod_freq_khz) * 1000) / (2 * u64::from(bit_rate)))
}

/// Samples per half bit at the engine sample rate.
pub fn sample_divisor(sample_rate: u32, bit_rate: u32) -> ControlResult<u32> {
    require_bit_rate(bit_rate)?;
    Ok((f64::from(sample_rate) / (2.0 * f64::from(bit_rate))).round() as u32)
}

/// Characters per second a message source must sustain for `bit_rate`.
pub fn message_rate(bit_rate: u32) -> ControlResult<u32> {
    require_bit_rate(bit_rate)?;
    Ok(bit_rate / 8)
}
