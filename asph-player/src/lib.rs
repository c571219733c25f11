//! # AudioSphere Player Library (asph-player)
//!
//! File operations and realtime playback for ASPH containers.
//!
//! **Purpose:** Convert WAV files to and from ASPH, and stream decoded PCM to
//! an audio device under interactive transport control.
//!
//! **Architecture:** hound + rubato on the way in, a cpal-backed sink fed by a
//! lock-free ring buffer on the way out, and a playback loop sharing atomic
//! transport state with a command listener.

pub mod audio;
pub mod error;
pub mod playback;
pub mod transcode;

pub use error::{Error, Result};
pub use transcode::{decode_file, encode_file, load_track, EncodeReport, Track};
