//! Output sink abstraction
//!
//! The playback loop pushes raw PCM bytes to an [`OutputSink`]. Sinks accept
//! whole frames only and may block until the device has room.

use crate::error::Result;

/// Gain control with a queryable native range
///
/// Ranges are device specific (for example decibels for a master gain).
pub trait GainControl {
    fn min(&self) -> f32;
    fn max(&self) -> f32;
    fn value(&self) -> f32;
    fn set_value(&mut self, value: f32);

    /// Map a volume in `[0, 1]` linearly onto the native range
    fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        let (min, max) = (self.min(), self.max());
        self.set_value(min + (max - min) * volume);
    }
}

/// Destination for decoded PCM
pub trait OutputSink {
    /// Write PCM bytes, returning how many were accepted.
    ///
    /// Implementations accept a whole number of frames and may block while the
    /// device buffer is full.
    fn write(&mut self, pcm: &[u8]) -> Result<usize>;

    /// Block until everything written so far has been played
    fn drain(&mut self) -> Result<()>;

    /// Release the device
    fn close(&mut self) -> Result<()>;

    /// Optional gain control
    fn gain_control(&mut self) -> Option<&mut dyn GainControl> {
        None
    }
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn write(&mut self, pcm: &[u8]) -> Result<usize> {
        (**self).write(pcm)
    }

    fn drain(&mut self) -> Result<()> {
        (**self).drain()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn gain_control(&mut self) -> Option<&mut dyn GainControl> {
        (**self).gain_control()
    }
}
