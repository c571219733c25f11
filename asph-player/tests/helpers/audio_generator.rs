//! Audio Test File Generation Utilities
//!
//! Deterministic WAV files with known characteristics for round-trip tests.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::Path;

/// Interleaved integer sine samples at `bits` full scale (half amplitude).
///
/// Each channel gets a different frequency so channel order is observable.
pub fn sine_samples(sample_rate: u32, bits: u16, channels: u16, frames: usize) -> Vec<i32> {
    let amplitude = ((1i64 << (bits - 1)) - 1) as f32 * 0.5;
    let mut samples = Vec::with_capacity(frames * channels as usize);
    for frame in 0..frames {
        for ch in 0..channels {
            let freq = 440.0 * (ch as f32 + 1.0);
            let t = frame as f32 / sample_rate as f32;
            samples.push(((2.0 * PI * freq * t).sin() * amplitude) as i32);
        }
    }
    samples
}

/// Generate an integer PCM WAV file containing a sine per channel
///
/// # Returns
/// The interleaved samples written
pub fn generate_sine_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    bits: u16,
    channels: u16,
    duration_ms: u64,
) -> Result<Vec<i32>, hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: bits,
        sample_format: SampleFormat::Int,
    };
    let frames = (sample_rate as u64 * duration_ms / 1000) as usize;
    let samples = sine_samples(sample_rate, bits, channels, frames);

    let mut writer = WavWriter::create(path, spec)?;
    for &s in &samples {
        match bits {
            8 => writer.write_sample(s as i8)?,
            16 => writer.write_sample(s as i16)?,
            _ => writer.write_sample(s)?,
        }
    }
    writer.finalize()?;
    Ok(samples)
}

/// Generate a 32-bit float WAV file from explicit samples
pub fn generate_float_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    samples: &[f32],
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    Ok(())
}
