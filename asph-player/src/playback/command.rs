//! Transport commands and the control listener
//!
//! The listener turns line-buffered character input into [`Command`]s and
//! feeds them into a bounded queue. The playback loop drains the queue at its
//! check-points. Stop is additionally written straight into the transport so
//! it is seen even if the queue is full.

use crate::playback::state::SharedTransport;
use std::io::BufRead;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Transport command vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePause,
    VolumeUp,
    VolumeDown,
    SeekForward,
    SeekBackward,
    Stop,
}

impl Command {
    /// Map one input character; unrecognized characters yield `None`
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'p' | 'P' => Some(Command::TogglePause),
            '+' | '=' => Some(Command::VolumeUp),
            '-' => Some(Command::VolumeDown),
            'f' | 'F' => Some(Command::SeekForward),
            'b' | 'B' => Some(Command::SeekBackward),
            'q' | 'Q' => Some(Command::Stop),
            _ => None,
        }
    }

    /// Every command in a line of input, in order
    pub fn parse_line(line: &str) -> Vec<Self> {
        line.chars().filter_map(Self::from_char).collect()
    }
}

/// Read commands from `reader` until stop, end of input or a closed queue.
///
/// # Arguments
/// - `reader`: Line-buffered input (stdin in the CLI)
/// - `tx`: Bounded command queue consumed by the playback loop
/// - `transport`: Shared state; stop is stored here directly
///
/// Must run on a plain thread: it blocks on input and on the queue.
pub fn run_listener<R: BufRead>(mut reader: R, tx: mpsc::Sender<Command>, transport: SharedTransport) {
    let mut line = String::new();
    while !transport.is_stopped() {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => {
                debug!("Command input closed");
                return;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to read command input: {}", e);
                return;
            }
        }

        for command in Command::parse_line(&line) {
            if command == Command::Stop {
                transport.request_stop();
            }
            if tx.blocking_send(command).is_err() {
                debug!("Command queue closed, listener exiting");
                return;
            }
            if command == Command::Stop {
                return;
            }
        }
    }
}

/// Spawn a listener on stdin.
///
/// The thread is detached in practice: a blocked stdin read cannot be
/// cancelled, so callers never join it.
pub fn spawn_stdin_listener(
    tx: mpsc::Sender<Command>,
    transport: SharedTransport,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("asph-commands".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            run_listener(stdin.lock(), tx, transport);
        })
}
