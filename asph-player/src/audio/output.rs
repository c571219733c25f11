//! Audio output using cpal
//!
//! [`CpalSink`] adapts cpal's callback-driven stream to the blocking
//! [`OutputSink`] interface: `write` converts PCM frames to f32 and pushes them
//! into a lock-free ring buffer, and the device callback pops from the other end.
//! An empty ring produces silence rather than an error.
//!
//! When the device cannot run at the record's rate its default config is used
//! and frames are resampled to the device rate on their way into the ring.

use crate::audio::resampler::StreamResampler;
use crate::audio::sink::{GainControl, OutputSink};
use crate::error::{Error, Result};
use asph_common::{pcm, PcmDescriptor};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig,
    SupportedStreamConfigRange,
};
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Lower end of the master gain range; treated as silence
pub const GAIN_MIN_DB: f32 = -80.0;
/// Upper end of the master gain range
pub const GAIN_MAX_DB: f32 = 6.0;

/// Sleep between attempts while the ring buffer is full or draining
const POLL_INTERVAL: Duration = Duration::from_millis(5);
/// Give up when the device makes no progress for this long
const STALL_TIMEOUT: Duration = Duration::from_secs(2);
/// Extra wait after the ring empties so the device plays its last period
const DRAIN_TAIL: Duration = Duration::from_millis(100);

fn db_to_linear(db: f32) -> f32 {
    if db <= GAIN_MIN_DB {
        0.0
    } else {
        10f32.powf(db / 20.0)
    }
}

/// Master gain in decibels, shared with the audio callback
#[derive(Debug, Clone)]
pub struct DeviceGain {
    db_bits: Arc<AtomicU32>,
}

impl DeviceGain {
    fn new() -> Self {
        Self {
            db_bits: Arc::new(AtomicU32::new(0f32.to_bits())),
        }
    }

    fn linear(&self) -> f32 {
        db_to_linear(f32::from_bits(self.db_bits.load(Ordering::Relaxed)))
    }
}

impl GainControl for DeviceGain {
    fn min(&self) -> f32 {
        GAIN_MIN_DB
    }

    fn max(&self) -> f32 {
        GAIN_MAX_DB
    }

    fn value(&self) -> f32 {
        f32::from_bits(self.db_bits.load(Ordering::Relaxed))
    }

    fn set_value(&mut self, value: f32) {
        let clamped = value.clamp(GAIN_MIN_DB, GAIN_MAX_DB);
        self.db_bits.store(clamped.to_bits(), Ordering::Relaxed);
    }
}

/// Output sink backed by a cpal stream.
pub struct CpalSink {
    device_name: String,
    format: PcmDescriptor,
    out_channels: usize,
    /// Present when the device runs at a different rate than the record
    resampler: Option<StreamResampler>,
    producer: HeapProd<f32>,
    stream: Option<Stream>,
    gain: DeviceGain,
    /// Stream error flag - set by audio callback on error
    error_flag: Arc<AtomicBool>,
    /// Samples consumed by the callback
    played: Arc<AtomicU64>,
    /// Samples pushed by `write`
    queued: u64,
    scratch: Vec<f32>,
}

impl CpalSink {
    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();
        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open an output device for `format` and start its stream.
    ///
    /// # Arguments
    /// - `format`: PCM format that will be written
    /// - `device_name`: Optional device name (None = default device)
    /// - `buffer_ms`: Ring buffer depth
    ///
    /// # Fallback Behavior
    /// If the named device is not found, the default device is used.
    pub fn open(format: PcmDescriptor, device_name: Option<&str>, buffer_ms: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = Self::select_device(&host, device_name)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let (config, sample_format) = Self::select_config(&device, &format)?;
        let out_channels = config.channels as usize;
        let device_rate = config.sample_rate.0;

        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}",
            device_rate, config.channels, sample_format
        );

        let resampler = if device_rate != format.sample_rate_hz() {
            info!(
                "Resampling {}Hz to device rate {}Hz",
                format.sample_rate_hz(),
                device_rate
            );
            Some(StreamResampler::new(
                format.sample_rate_hz(),
                device_rate,
                config.channels,
            )?)
        } else {
            None
        };

        let capacity = ((device_rate as u64 * out_channels as u64 * buffer_ms as u64)
            / 1000)
            .max(1024) as usize;
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();

        let gain = DeviceGain::new();
        let error_flag = Arc::new(AtomicBool::new(false));
        let played = Arc::new(AtomicU64::new(0));

        let callback_state = CallbackState {
            consumer,
            gain: gain.clone(),
            played: Arc::clone(&played),
        };
        let stream = match sample_format {
            SampleFormat::F32 => {
                build_stream::<f32>(&device, &config, callback_state, Arc::clone(&error_flag))?
            }
            SampleFormat::I16 => {
                build_stream::<i16>(&device, &config, callback_state, Arc::clone(&error_flag))?
            }
            SampleFormat::U16 => {
                build_stream::<u16>(&device, &config, callback_state, Arc::clone(&error_flag))?
            }
            SampleFormat::I32 => {
                build_stream::<i32>(&device, &config, callback_state, Arc::clone(&error_flag))?
            }
            other => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;
        info!("Audio stream started on '{}' ({})", device_name, format);

        Ok(Self {
            device_name,
            format,
            out_channels,
            resampler,
            producer,
            stream: Some(stream),
            gain,
            error_flag,
            played,
            queued: 0,
            scratch: Vec::new(),
        })
    }

    fn select_device(host: &cpal::Host, device_name: Option<&str>) -> Result<Device> {
        if let Some(name) = device_name {
            let mut devices = host
                .output_devices()
                .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;
            if let Some(dev) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                info!("Found requested audio device: {}", name);
                return Ok(dev);
            }
            warn!("Requested device '{}' not found, falling back to default device", name);
        }
        host.default_output_device()
            .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))
    }

    /// Pick a stream config for `format`, falling back to the device default.
    fn select_config(device: &Device, format: &PcmDescriptor) -> Result<(StreamConfig, SampleFormat)> {
        let ranges = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?;
        if let Some(best) = pick_config(ranges, format.sample_rate_hz(), format.channels()) {
            return Ok(best);
        }

        warn!(
            "Device has no config for {}Hz with {} channel(s), using its default",
            format.sample_rate_hz(),
            format.channels()
        );
        let default = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;
        Ok((default.config(), default.sample_format()))
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Check if an audio stream error has occurred.
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }

    fn check_stream(&self) -> Result<()> {
        if self.has_error() {
            return Err(Error::AudioOutput("Audio stream reported an error".to_string()));
        }
        Ok(())
    }

    /// Convert whole frames into device-layout f32 samples at the device rate
    fn fill_scratch(&mut self, pcm_bytes: &[u8]) -> Result<()> {
        let src_channels = self.format.channels() as usize;
        let samples = pcm::unpack_samples(pcm_bytes, self.format.bits_per_sample());
        self.scratch.clear();
        for frame in samples.chunks_exact(src_channels) {
            for ch in 0..self.out_channels {
                let value = match frame.get(ch) {
                    Some(&s) => s,
                    None if src_channels == 1 => frame[0],
                    None => 0,
                };
                self.scratch.push(pcm::to_f32(value, self.format.bits_per_sample()));
            }
        }
        if let Some(resampler) = self.resampler.as_mut() {
            self.scratch = resampler.push(&self.scratch)?;
        }
        Ok(())
    }

    /// Push samples into the ring, waiting while the device catches up
    fn push_samples(&mut self, samples: &[f32]) -> Result<()> {
        let mut offset = 0;
        let mut last_progress = Instant::now();
        while offset < samples.len() {
            self.check_stream()?;
            let pushed = self.producer.push_slice(&samples[offset..]);
            if pushed > 0 {
                offset += pushed;
                last_progress = Instant::now();
                continue;
            }
            if last_progress.elapsed() > STALL_TIMEOUT {
                return Err(Error::AudioOutput("Audio device stopped consuming samples".to_string()));
            }
            thread::sleep(POLL_INTERVAL);
        }
        self.queued += samples.len() as u64;
        Ok(())
    }
}

/// Choose among supported ranges for a PCM rate and channel count.
///
/// Only ranges containing `rate` with at least `channels` channels qualify.
/// The exact channel count wins, then the narrowest wider layout; f32 samples
/// win ties.
fn pick_config<I>(ranges: I, rate: u32, channels: u16) -> Option<(StreamConfig, SampleFormat)>
where
    I: IntoIterator<Item = SupportedStreamConfigRange>,
{
    ranges
        .into_iter()
        .filter(|c| {
            c.min_sample_rate().0 <= rate
                && c.max_sample_rate().0 >= rate
                && c.channels() >= channels
                && matches!(
                    c.sample_format(),
                    SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16
                )
        })
        .min_by_key(|c| {
            (
                c.channels() - channels,
                u8::from(c.sample_format() != SampleFormat::F32),
            )
        })
        .map(|range| {
            let sample_format = range.sample_format();
            (range.with_sample_rate(cpal::SampleRate(rate)).config(), sample_format)
        })
}

impl OutputSink for CpalSink {
    fn write(&mut self, pcm_bytes: &[u8]) -> Result<usize> {
        let frame_size = self.format.frame_size();
        let accepted = pcm_bytes.len() - pcm_bytes.len() % frame_size;
        if accepted == 0 {
            return Ok(0);
        }
        self.fill_scratch(&pcm_bytes[..accepted])?;

        let scratch = std::mem::take(&mut self.scratch);
        let pushed = self.push_samples(&scratch);
        self.scratch = scratch;
        pushed?;
        Ok(accepted)
    }

    fn drain(&mut self) -> Result<()> {
        if let Some(resampler) = self.resampler.as_mut() {
            let tail = resampler.flush()?;
            self.push_samples(&tail)?;
        }
        let mut last_played = self.played.load(Ordering::Acquire);
        let mut last_progress = Instant::now();
        while last_played < self.queued {
            self.check_stream()?;
            thread::sleep(POLL_INTERVAL);
            let played = self.played.load(Ordering::Acquire);
            if played != last_played {
                last_played = played;
                last_progress = Instant::now();
            } else if last_progress.elapsed() > STALL_TIMEOUT {
                warn!("Audio device stopped draining, abandoning remaining samples");
                return Ok(());
            }
        }
        thread::sleep(DRAIN_TAIL);
        debug!("Audio output drained");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            info!("Stopping audio stream");
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
        }
        Ok(())
    }

    fn gain_control(&mut self) -> Option<&mut dyn GainControl> {
        Some(&mut self.gain)
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// State moved into the device callback
struct CallbackState {
    consumer: HeapCons<f32>,
    gain: DeviceGain,
    played: Arc<AtomicU64>,
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut state: CallbackState,
    error_flag: Arc<AtomicBool>,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let gain = state.gain.linear();
                let mut popped = 0u64;
                for sample in data.iter_mut() {
                    *sample = match state.consumer.try_pop() {
                        Some(value) => {
                            popped += 1;
                            T::from_sample((value * gain).clamp(-1.0, 1.0))
                        }
                        None => T::EQUILIBRIUM,
                    };
                }
                state.played.fetch_add(popped, Ordering::Release);
            },
            move |err| {
                error!("Audio stream error: {}", err);
                error_flag.store(true, Ordering::SeqCst);
            },
            None,
        )
        .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
}
