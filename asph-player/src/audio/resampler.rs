//! Sample rate conversion using rubato
//!
//! [`Resampler`] converts a whole buffer at once; it is only needed when a
//! source rate falls outside the supported range and negotiation clamped it.
//! [`StreamResampler`] converts audio pushed in pieces, for output devices
//! that cannot run at the record's rate.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Input frames per rubato call when streaming
pub const STREAM_CHUNK_FRAMES: usize = 1024;

/// Audio resampler wrapping rubato's polynomial fixed-input resampler.
pub struct Resampler;

impl Resampler {
    /// Resample interleaved audio between two rates.
    ///
    /// # Arguments
    /// - `input`: Interleaved samples in [-1.0, 1.0]
    /// - `input_rate`: Source rate in Hz
    /// - `output_rate`: Target rate in Hz
    /// - `channels`: Interleaved channel count
    ///
    /// # Returns
    /// Resampled interleaved audio. Equal rates return a copy.
    pub fn resample(
        input: &[f32],
        input_rate: u32,
        output_rate: u32,
        channels: u16,
    ) -> Result<Vec<f32>> {
        if input_rate == output_rate {
            debug!("Sample rate already at {}Hz, skipping resample", output_rate);
            return Ok(input.to_vec());
        }
        if channels == 0 || input_rate == 0 {
            return Err(Error::Decode(format!(
                "Cannot resample {} channels at {}Hz",
                channels, input_rate
            )));
        }

        let planar_input = Self::deinterleave(input, channels);
        let input_frames = planar_input[0].len();
        if input_frames == 0 {
            return Ok(Vec::new());
        }

        debug!(
            "Resampling {} frames from {}Hz to {}Hz ({} channels)",
            input_frames, input_rate, output_rate, channels
        );

        let mut resampler = FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0,
            PolynomialDegree::Septic,
            input_frames,
            channels as usize,
        )
        .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?;

        let planar_output = resampler
            .process(&planar_input, None)
            .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;

        Ok(Self::interleave(planar_output))
    }

    /// Convert interleaved samples to planar format.
    ///
    /// Input:  [L, R, L, R, ...]
    /// Output: [[L, L, ...], [R, R, ...]]
    fn deinterleave(samples: &[f32], channels: u16) -> Vec<Vec<f32>> {
        let num_channels = channels as usize;
        let num_frames = samples.len() / num_channels;
        let mut planar = vec![Vec::with_capacity(num_frames); num_channels];

        for frame in samples.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                planar[ch].push(sample);
            }
        }
        planar
    }

    /// Convert planar samples to interleaved format.
    fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
        let Some(first) = planar.first() else {
            return Vec::new();
        };
        let num_frames = first.len();
        let mut interleaved = Vec::with_capacity(num_frames * planar.len());
        for frame_idx in 0..num_frames {
            for channel in &planar {
                interleaved.push(channel[frame_idx]);
            }
        }
        interleaved
    }
}

/// Incremental resampler for interleaved audio.
///
/// Input is buffered until a full [`STREAM_CHUNK_FRAMES`] chunk is available,
/// so the filter state carries across `push` calls and chunk boundaries stay
/// continuous. [`StreamResampler::flush`] emits whatever is still buffered.
pub struct StreamResampler {
    inner: FastFixedIn<f32>,
    channels: usize,
    pending: Vec<Vec<f32>>,
}

impl StreamResampler {
    pub fn new(input_rate: u32, output_rate: u32, channels: u16) -> Result<Self> {
        if channels == 0 || input_rate == 0 || output_rate == 0 {
            return Err(Error::Decode(format!(
                "Cannot resample {} channels from {}Hz to {}Hz",
                channels, input_rate, output_rate
            )));
        }
        let inner = FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0,
            PolynomialDegree::Septic,
            STREAM_CHUNK_FRAMES,
            channels as usize,
        )
        .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?;
        debug!(
            "Streaming resampler {}Hz -> {}Hz ({} channels)",
            input_rate, output_rate, channels
        );
        Ok(Self {
            inner,
            channels: channels as usize,
            pending: vec![Vec::with_capacity(STREAM_CHUNK_FRAMES); channels as usize],
        })
    }

    /// Feed interleaved samples, returning any interleaved output ready so far
    pub fn push(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        for frame in input.chunks_exact(self.channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                self.pending[ch].push(sample);
            }
        }

        let mut output = Vec::new();
        while self.pending[0].len() >= STREAM_CHUNK_FRAMES {
            let chunk: Vec<Vec<f32>> = self
                .pending
                .iter_mut()
                .map(|channel| channel.drain(..STREAM_CHUNK_FRAMES).collect())
                .collect();
            let planar = self
                .inner
                .process(&chunk, None)
                .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;
            output.extend(Resampler::interleave(planar));
        }
        Ok(output)
    }

    /// Resample the buffered remainder
    pub fn flush(&mut self) -> Result<Vec<f32>> {
        if self.pending[0].is_empty() {
            return Ok(Vec::new());
        }
        let rest: Vec<Vec<f32>> = self.pending.iter_mut().map(std::mem::take).collect();
        let planar = self
            .inner
            .process_partial(Some(rest.as_slice()), None)
            .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;
        Ok(Resampler::interleave(planar))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deinterleave() {
        let planar = Resampler::deinterleave(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2);
        assert_eq!(planar, vec![vec![1.0, 3.0, 5.0], vec![2.0, 4.0, 6.0]]);
    }

    #[test]
    fn test_interleave() {
        let interleaved = Resampler::interleave(vec![vec![1.0, 3.0], vec![2.0, 4.0]]);
        assert_eq!(interleaved, vec![1.0, 2.0, 3.0, 4.0]);
        assert!(Resampler::interleave(Vec::new()).is_empty());
    }

    #[test]
    fn test_resample_same_rate() {
        let input = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(Resampler::resample(&input, 48_000, 48_000, 2).unwrap(), input);
    }

    #[test]
    fn test_resample_down_from_192k() {
        let input_rate = 192_000;
        let frames = 4_000;
        let input: Vec<f32> = (0..frames)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / input_rate as f32).sin() * 0.5)
            .collect();

        let output = Resampler::resample(&input, input_rate, 96_000, 1).unwrap();

        let expected = frames / 2;
        assert!(
            output.len() >= expected - 10 && output.len() <= expected + 10,
            "Expected ~{} frames, got {}",
            expected,
            output.len()
        );
    }

    #[test]
    fn test_resample_empty() {
        assert!(Resampler::resample(&[], 4_000, 8_000, 2).unwrap().is_empty());
    }

    #[test]
    fn test_stream_resampler_tracks_ratio_across_pushes() {
        let mut stream = StreamResampler::new(22_050, 44_100, 2).unwrap();
        let frames = 10_000;
        let input: Vec<f32> = (0..frames * 2)
            .map(|i| ((i / 2) as f32 * 0.01).sin() * 0.5)
            .collect();

        let mut output = Vec::new();
        // Uneven pieces that never line up with the internal chunk size
        for piece in input.chunks(2 * 700) {
            output.extend(stream.push(piece).unwrap());
        }
        output.extend(stream.flush().unwrap());

        assert_eq!(output.len() % 2, 0);
        let out_frames = output.len() / 2;
        assert!(
            out_frames >= 2 * frames - 2 * STREAM_CHUNK_FRAMES
                && out_frames <= 2 * (frames + STREAM_CHUNK_FRAMES),
            "got {} frames",
            out_frames
        );
        assert!(output.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_stream_resampler_buffers_small_input() {
        let mut stream = StreamResampler::new(44_100, 48_000, 1).unwrap();
        assert!(stream.push(&[0.1; 100]).unwrap().is_empty());
        assert!(!stream.flush().unwrap().is_empty());
        assert!(stream.flush().unwrap().is_empty());
    }

    #[test]
    fn test_stream_resampler_rejects_zero_rate() {
        assert!(StreamResampler::new(0, 48_000, 2).is_err());
    }
}
