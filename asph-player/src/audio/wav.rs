//! WAV input and output
//!
//! Reads integer or float WAV files with hound, converts the samples to a
//! negotiated [`PcmDescriptor`] and writes decoded records back out as
//! signed little-endian PCM WAV.
//!
//! Conversion rules:
//! - bit depth is rescaled by shifting (integer sources) or quantised (float sources)
//! - sources with more than two channels keep their first two channels
//! - resampling only happens when negotiation moved the rate

use crate::audio::resampler::Resampler;
use crate::error::{Error, Result};
use asph_common::{pcm, PcmDescriptor, SourceFormat};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::{Seek, Write};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone)]
enum Samples {
    Int(Vec<i32>),
    Float(Vec<f32>),
}

/// Fully decoded WAV file
#[derive(Debug, Clone)]
pub struct WavSource {
    spec: WavSpec,
    samples: Samples,
}

impl WavSource {
    /// Open and decode a WAV file.
    ///
    /// # Errors
    /// `Error::Wav` when the file is not a readable WAV file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let reader = WavReader::open(path.as_ref())?;
        Self::from_reader(reader)
    }

    fn from_reader<R: std::io::Read>(mut reader: WavReader<R>) -> Result<Self> {
        let spec = reader.spec();
        let samples = match spec.sample_format {
            SampleFormat::Int => Samples::Int(reader.samples::<i32>().collect::<std::result::Result<_, _>>()?),
            SampleFormat::Float => Samples::Float(reader.samples::<f32>().collect::<std::result::Result<_, _>>()?),
        };
        debug!(
            "Read WAV: {}Hz, {}-bit {:?}, {} channels",
            spec.sample_rate, spec.bits_per_sample, spec.sample_format, spec.channels
        );
        Ok(Self { spec, samples })
    }

    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    /// Format description to feed into negotiation
    pub fn source_format(&self) -> SourceFormat {
        SourceFormat::new(
            self.spec.sample_rate as f64,
            self.spec.bits_per_sample as i32,
            self.spec.channels as i32,
        )
    }

    /// Produce interleaved PCM bytes in `target` format.
    pub fn convert(&self, target: &PcmDescriptor) -> Result<Vec<u8>> {
        let src_channels = self.spec.channels as usize;
        let dst_channels = target.channels() as usize;
        if src_channels == 0 || dst_channels > src_channels {
            return Err(Error::Decode(format!(
                "Cannot map {} source channels to {}",
                src_channels, dst_channels
            )));
        }

        let bits = target.bits_per_sample();
        let rate_changes = self.spec.sample_rate != target.sample_rate_hz();

        let samples: Vec<i32> = match &self.samples {
            Samples::Int(ints) if !rate_changes => {
                let from = self.spec.bits_per_sample;
                select_channels(ints, src_channels, dst_channels)
                    .into_iter()
                    .map(|s| rescale(s, from, bits))
                    .collect()
            }
            samples => {
                let floats = match samples {
                    Samples::Int(ints) => {
                        let from = self.spec.bits_per_sample;
                        select_channels(ints, src_channels, dst_channels)
                            .into_iter()
                            .map(|s| pcm::to_f32(s, from))
                            .collect()
                    }
                    Samples::Float(floats) => select_channels(floats, src_channels, dst_channels),
                };
                Resampler::resample(
                    &floats,
                    self.spec.sample_rate,
                    target.sample_rate_hz(),
                    target.channels(),
                )?
                .into_iter()
                .map(|s| pcm::from_f32(s, bits))
                .collect()
            }
        };

        Ok(pcm::pack_samples(&samples, bits))
    }
}

/// Keep the first `dst` channels of every frame
fn select_channels<T: Copy>(samples: &[T], src: usize, dst: usize) -> Vec<T> {
    if src == dst {
        return samples.to_vec();
    }
    samples
        .chunks_exact(src)
        .flat_map(|frame| frame[..dst].iter().copied())
        .collect()
}

/// Move a sample between integer bit depths
fn rescale(sample: i32, from_bits: u16, to_bits: u16) -> i32 {
    if to_bits >= from_bits {
        sample << (to_bits - from_bits)
    } else {
        sample >> (from_bits - to_bits)
    }
}

/// Write PCM in `format` as a WAV stream.
pub fn write_wav<W: Write + Seek>(writer: W, format: &PcmDescriptor, pcm_bytes: &[u8]) -> Result<()> {
    let spec = WavSpec {
        channels: format.channels(),
        sample_rate: format.sample_rate_hz(),
        bits_per_sample: format.bits_per_sample(),
        sample_format: SampleFormat::Int,
    };
    let mut wav = WavWriter::new(writer, spec)?;
    let samples = pcm::unpack_samples(pcm_bytes, format.bits_per_sample());
    match format.bits_per_sample() {
        8 => {
            for s in samples {
                wav.write_sample(s as i8)?;
            }
        }
        16 => {
            for s in samples {
                wav.write_sample(s as i16)?;
            }
        }
        _ => {
            for s in samples {
                wav.write_sample(s)?;
            }
        }
    }
    wav.finalize()?;
    Ok(())
}
