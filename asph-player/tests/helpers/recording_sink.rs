//! In-memory output sink
//!
//! Records every accepted byte, gain change and lifecycle call so playback can
//! be verified without audio hardware. Hooks fire once when the total number of
//! recorded bytes first reaches their threshold, which lets tests inject
//! commands at a known point of the stream. A sink built with
//! [`RecordingSink::accept_at_most`] takes only part of each write, like a
//! device whose buffer is nearly full.

use asph_player::audio::{GainControl, OutputSink};
use std::sync::{Arc, Mutex};

pub const TEST_GAIN_MIN: f32 = -80.0;
pub const TEST_GAIN_MAX: f32 = 6.0;

/// Everything the sink observed
#[derive(Debug, Default)]
pub struct Recording {
    pub bytes: Vec<u8>,
    pub writes: usize,
    pub gains: Vec<f32>,
    pub drained: bool,
    pub closed: bool,
}

struct RecordingGain {
    value: f32,
    recording: Arc<Mutex<Recording>>,
}

impl GainControl for RecordingGain {
    fn min(&self) -> f32 {
        TEST_GAIN_MIN
    }

    fn max(&self) -> f32 {
        TEST_GAIN_MAX
    }

    fn value(&self) -> f32 {
        self.value
    }

    fn set_value(&mut self, value: f32) {
        self.value = value;
        self.recording.lock().unwrap().gains.push(value);
    }
}

type Hook = Box<dyn FnMut() + Send>;

pub struct RecordingSink {
    frame_size: usize,
    recording: Arc<Mutex<Recording>>,
    gain: RecordingGain,
    hooks: Vec<(usize, Hook)>,
    max_write: Option<usize>,
}

impl RecordingSink {
    pub fn new(frame_size: usize) -> Self {
        let recording = Arc::new(Mutex::new(Recording::default()));
        Self {
            frame_size,
            gain: RecordingGain {
                value: 0.0,
                recording: Arc::clone(&recording),
            },
            recording,
            hooks: Vec::new(),
            max_write: None,
        }
    }

    /// Shared handle to the recording
    pub fn recording(&self) -> Arc<Mutex<Recording>> {
        Arc::clone(&self.recording)
    }

    /// Accept at most `limit` bytes per write, rounded down to whole frames
    /// but never below one frame
    pub fn accept_at_most(mut self, limit: usize) -> Self {
        self.max_write = Some(limit);
        self
    }

    /// Run `hook` once after at least `threshold` bytes have been recorded
    pub fn on_bytes(mut self, threshold: usize, hook: impl FnMut() + Send + 'static) -> Self {
        self.hooks.push((threshold, Box::new(hook)));
        self
    }
}

impl OutputSink for RecordingSink {
    fn write(&mut self, pcm: &[u8]) -> asph_player::Result<usize> {
        let offered = match self.max_write {
            Some(limit) => pcm.len().min(limit.max(self.frame_size)),
            None => pcm.len(),
        };
        let accepted = offered - offered % self.frame_size;
        let total = {
            let mut recording = self.recording.lock().unwrap();
            recording.bytes.extend_from_slice(&pcm[..accepted]);
            recording.writes += 1;
            recording.bytes.len()
        };

        let mut i = 0;
        while i < self.hooks.len() {
            if self.hooks[i].0 <= total {
                let (_, mut hook) = self.hooks.remove(i);
                hook();
            } else {
                i += 1;
            }
        }
        Ok(accepted)
    }

    fn drain(&mut self) -> asph_player::Result<()> {
        self.recording.lock().unwrap().drained = true;
        Ok(())
    }

    fn close(&mut self) -> asph_player::Result<()> {
        self.recording.lock().unwrap().closed = true;
        Ok(())
    }

    fn gain_control(&mut self) -> Option<&mut dyn GainControl> {
        Some(&mut self.gain)
    }
}
