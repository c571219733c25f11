//! Transport state shared between the playback loop and the control listener
//!
//! Every field is an independent atomic. Readers may observe a fresh value of
//! one field next to a stale value of another; nothing here needs a
//! multi-field transaction.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

/// Volume change applied by a single volume command
pub const VOLUME_STEP: f32 = 0.1;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Lock-free transport fields for one playback invocation
#[derive(Debug)]
pub struct TransportState {
    stopped: AtomicBool,
    paused: AtomicBool,
    /// f32 bit pattern
    volume: AtomicU32,
    position: AtomicUsize,
}

/// Handle passed to both the playback loop and the control listener
pub type SharedTransport = Arc<TransportState>;

impl Default for TransportState {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportState {
    /// Playing from position 0 at full volume
    pub fn new() -> Self {
        Self {
            stopped: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            volume: AtomicU32::new(1.0f32.to_bits()),
            position: AtomicUsize::new(0),
        }
    }

    pub fn shared() -> SharedTransport {
        Arc::new(Self::new())
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Request stop. Never cleared within an invocation.
    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    /// Flip pause, returning the new value
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Acquire))
    }

    /// Store a volume clamped to `[0, 1]`
    pub fn set_volume(&self, volume: f32) {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.volume.store(volume.to_bits(), Ordering::Release);
    }

    /// Add `delta` to the volume and return the clamped result.
    ///
    /// Read-modify-write via compare-exchange so concurrent steps are not lost.
    pub fn adjust_volume(&self, delta: f32) -> f32 {
        let mut current = self.volume.load(Ordering::Acquire);
        loop {
            let next = (f32::from_bits(current) + delta).clamp(0.0, 1.0);
            match self.volume.compare_exchange_weak(
                current,
                next.to_bits(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn position(&self) -> usize {
        self.position.load(Ordering::Acquire)
    }

    pub fn set_position(&self, position: usize) {
        self.position.store(position, Ordering::Release);
    }

    /// Move the position by `delta` bytes, clamped to `[0, limit]`.
    ///
    /// Returns the new position.
    pub fn seek_by(&self, delta: isize, limit: usize) -> usize {
        let mut current = self.position.load(Ordering::Acquire);
        loop {
            let next = if delta < 0 {
                current.saturating_sub(delta.unsigned_abs())
            } else {
                current.saturating_add(delta as usize).min(limit)
            };
            match self.position.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    /// Coarse state derived from the flags
    pub fn state(&self) -> PlaybackState {
        if self.is_stopped() {
            PlaybackState::Stopped
        } else if self.is_paused() {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_initial_state() {
        let transport = TransportState::new();
        assert_eq!(transport.state(), PlaybackState::Playing);
        assert_eq!(transport.volume(), 1.0);
        assert_eq!(transport.position(), 0);
    }

    #[test]
    fn test_stop_wins_over_pause() {
        let transport = TransportState::new();
        transport.set_paused(true);
        assert_eq!(transport.state(), PlaybackState::Paused);
        transport.request_stop();
        assert_eq!(transport.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_toggle_pause() {
        let transport = TransportState::new();
        assert!(transport.toggle_pause());
        assert!(transport.is_paused());
        assert!(!transport.toggle_pause());
        assert!(!transport.is_paused());
    }

    #[test]
    fn test_volume_clamps() {
        let transport = TransportState::new();
        assert_eq!(transport.adjust_volume(VOLUME_STEP), 1.0);
        transport.set_volume(0.05);
        assert_eq!(transport.adjust_volume(-VOLUME_STEP), 0.0);
        transport.set_volume(f32::NAN);
        assert_eq!(transport.volume(), 0.0);
        transport.set_volume(7.0);
        assert_eq!(transport.volume(), 1.0);
    }

    #[test]
    fn test_seek_clamps_both_ends() {
        let transport = TransportState::new();
        transport.set_position(100);
        assert_eq!(transport.seek_by(-1_000, 500), 0);
        assert_eq!(transport.seek_by(300, 500), 300);
        assert_eq!(transport.seek_by(1_000, 500), 500);
    }

    #[test]
    fn test_concurrent_volume_steps_are_not_lost() {
        let transport = TransportState::shared();
        transport.set_volume(0.0);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let t = Arc::clone(&transport);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        t.adjust_volume(0.0001);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!((transport.volume() - 0.4).abs() < 1e-3);
    }
}
