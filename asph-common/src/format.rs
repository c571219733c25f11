//! PCM format descriptions and the target-format negotiation policy
//!
//! ASPH stores signed little-endian integer PCM only, limited to
//! 8 000–96 000 Hz, 8/16/24 bits and one or two channels. [`negotiate`] maps an
//! arbitrary source description onto that lattice; it is a pure function and
//! performs no I/O.

use crate::{Error, Result};
use std::time::Duration;

pub const MIN_SAMPLE_RATE: u32 = 8_000;
pub const MAX_SAMPLE_RATE: u32 = 96_000;
pub const MIN_BITS_PER_SAMPLE: u16 = 8;
pub const MAX_BITS_PER_SAMPLE: u16 = 24;
pub const MIN_CHANNELS: u16 = 1;
pub const MAX_CHANNELS: u16 = 2;

/// Bit depth substituted when a source header reports none
pub const FALLBACK_BITS_PER_SAMPLE: i32 = 16;

/// Source PCM description as reported by a decoder
///
/// Values are deliberately loose: WAV headers in the wild report fractional
/// rates, zero or negative bit depths and more than two channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceFormat {
    pub sample_rate_hz: f64,
    pub bits_per_sample: i32,
    pub channels: i32,
}

impl SourceFormat {
    pub fn new(sample_rate_hz: f64, bits_per_sample: i32, channels: i32) -> Self {
        Self {
            sample_rate_hz,
            bits_per_sample,
            channels,
        }
    }
}

/// Supported PCM format: signed little-endian integer samples, interleaved
///
/// Always satisfies `8000 <= rate <= 96000`, `bits ∈ {8, 16, 24}` and
/// `channels ∈ {1, 2}`; construct through [`PcmDescriptor::new`] or [`negotiate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PcmDescriptor {
    sample_rate_hz: u32,
    bits_per_sample: u16,
    channels: u16,
}

impl PcmDescriptor {
    /// Build a descriptor, rejecting values outside the supported lattice.
    ///
    /// # Errors
    /// `InvalidSourceFormat` naming the first offending field.
    pub fn new(sample_rate_hz: u32, bits_per_sample: u16, channels: u16) -> Result<Self> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate_hz) {
            return Err(Error::InvalidSourceFormat(format!(
                "sample rate {} Hz outside {}..={}",
                sample_rate_hz, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE
            )));
        }
        if !matches!(bits_per_sample, 8 | 16 | 24) {
            return Err(Error::InvalidSourceFormat(format!(
                "unsupported bit depth {}",
                bits_per_sample
            )));
        }
        if !(MIN_CHANNELS..=MAX_CHANNELS).contains(&channels) {
            return Err(Error::InvalidSourceFormat(format!(
                "unsupported channel count {}",
                channels
            )));
        }
        Ok(Self {
            sample_rate_hz,
            bits_per_sample,
            channels,
        })
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.bits_per_sample as usize / 8
    }

    /// Bytes per interleaved frame (one sample per channel)
    pub fn frame_size(&self) -> usize {
        self.bytes_per_sample() * self.channels as usize
    }

    pub fn bytes_per_second(&self) -> usize {
        self.sample_rate_hz as usize * self.frame_size()
    }

    /// Playback duration of `pcm_len` bytes in this format
    pub fn duration_of(&self, pcm_len: usize) -> Duration {
        let bps = self.bytes_per_second().max(1) as u128;
        Duration::from_millis((pcm_len as u128 * 1000 / bps) as u64)
    }
}

impl std::fmt::Display for PcmDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}Hz, {}-bit, {}ch",
            self.sample_rate_hz, self.bits_per_sample, self.channels
        )
    }
}

/// Compute the target PCM format for a source.
///
/// - Rate is clamped to `[8000, 96000]` and rounded to whole hertz.
/// - A non-positive bit depth becomes 16; depth is clamped to `[8, 24]`, rounded
///   to the nearest multiple of 8 (ties up) and capped at 24 again.
/// - Channels are clamped to `[1, 2]`.
///
/// # Errors
/// `InvalidSourceFormat` when the source rate or channel count is not positive.
pub fn negotiate(source: SourceFormat) -> Result<PcmDescriptor> {
    // NaN fails this comparison too
    if !(source.sample_rate_hz > 0.0) {
        return Err(Error::InvalidSourceFormat(format!(
            "invalid sample rate {}",
            source.sample_rate_hz
        )));
    }
    if source.channels <= 0 {
        return Err(Error::InvalidSourceFormat(format!(
            "invalid channel count {}",
            source.channels
        )));
    }

    let rate = source
        .sample_rate_hz
        .clamp(MIN_SAMPLE_RATE as f64, MAX_SAMPLE_RATE as f64)
        .round() as u32;

    let bits = if source.bits_per_sample <= 0 {
        FALLBACK_BITS_PER_SAMPLE
    } else {
        source.bits_per_sample
    };
    let bits = bits.clamp(MIN_BITS_PER_SAMPLE as i32, MAX_BITS_PER_SAMPLE as i32);
    let bits = ((bits + 4) / 8 * 8).min(MAX_BITS_PER_SAMPLE as i32) as u16;

    let channels = source
        .channels
        .clamp(MIN_CHANNELS as i32, MAX_CHANNELS as i32) as u16;

    Ok(PcmDescriptor {
        sample_rate_hz: rate,
        bits_per_sample: bits,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits_for(bits: i32) -> u16 {
        negotiate(SourceFormat::new(44_100.0, bits, 2))
            .unwrap()
            .bits_per_sample()
    }

    #[test]
    fn test_passthrough_for_supported_format() {
        let target = negotiate(SourceFormat::new(44_100.0, 16, 2)).unwrap();
        assert_eq!(target, PcmDescriptor::new(44_100, 16, 2).unwrap());
    }

    #[test]
    fn test_bit_depth_boundaries() {
        assert_eq!(bits_for(0), 16);
        assert_eq!(bits_for(-1), 16);
        assert_eq!(bits_for(4), 8);
        assert_eq!(bits_for(11), 8);
        assert_eq!(bits_for(12), 16);
        assert_eq!(bits_for(20), 24);
        assert_eq!(bits_for(28), 24);
        assert_eq!(bits_for(32), 24);
    }

    #[test]
    fn test_rate_and_channel_clamping() {
        let target = negotiate(SourceFormat::new(100_000.0, 16, 6)).unwrap();
        assert_eq!(target.sample_rate_hz(), 96_000);
        assert_eq!(target.channels(), 2);

        let target = negotiate(SourceFormat::new(4_000.0, 8, 1)).unwrap();
        assert_eq!(target.sample_rate_hz(), 8_000);
        assert_eq!(target.channels(), 1);

        let target = negotiate(SourceFormat::new(22_050.4, 16, 1)).unwrap();
        assert_eq!(target.sample_rate_hz(), 22_050);
    }

    #[test]
    fn test_unrepairable_sources_rejected() {
        for source in [
            SourceFormat::new(0.0, 16, 2),
            SourceFormat::new(-44_100.0, 16, 2),
            SourceFormat::new(f64::NAN, 16, 2),
            SourceFormat::new(44_100.0, 16, 0),
            SourceFormat::new(44_100.0, 16, -2),
        ] {
            assert!(
                matches!(negotiate(source), Err(Error::InvalidSourceFormat(_))),
                "{:?} should be rejected",
                source
            );
        }
    }

    #[test]
    fn test_descriptor_derived_sizes() {
        let fmt = PcmDescriptor::new(48_000, 24, 2).unwrap();
        assert_eq!(fmt.frame_size(), 6);
        assert_eq!(fmt.bytes_per_second(), 288_000);
        assert_eq!(fmt.duration_of(288_000 * 3), Duration::from_secs(3));
        assert_eq!(fmt.to_string(), "48000Hz, 24-bit, 2ch");
    }

    #[test]
    fn test_descriptor_new_rejects_off_lattice() {
        assert!(PcmDescriptor::new(7_999, 16, 2).is_err());
        assert!(PcmDescriptor::new(44_100, 12, 2).is_err());
        assert!(PcmDescriptor::new(44_100, 16, 3).is_err());
        assert!(PcmDescriptor::new(96_000, 8, 1).is_ok());
    }
}
