//! Playback controller, transport state and command channel

pub mod command;
pub mod controller;
pub mod progress;
pub mod state;

pub use command::{run_listener, spawn_stdin_listener, Command};
pub use controller::{PlaybackOptions, PlaybackOutcome, PlaybackSummary, Player};
pub use state::{PlaybackState, SharedTransport, TransportState};
