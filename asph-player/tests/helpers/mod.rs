//! Test helper modules for asph-player integration tests
//!
//! Provides reusable test infrastructure components:
//! - audio_generator: deterministic WAV fixtures written with hound
//! - recording_sink: in-memory OutputSink that records everything played

#![allow(dead_code)]

pub mod audio_generator;
pub mod recording_sink;

pub use audio_generator::{generate_float_wav, generate_sine_wav, sine_samples};
pub use recording_sink::{Recording, RecordingSink, TEST_GAIN_MAX, TEST_GAIN_MIN};
