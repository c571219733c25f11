//! Playback controller
//!
//! Streams a decoded PCM buffer to an [`OutputSink`] in fixed-size chunks.
//! Commands queued by the control listener are applied at two check-points:
//! before every chunk and on every pause poll. Position is only written here,
//! so the loop never races the listener for it.

use crate::audio::sink::OutputSink;
use crate::error::{Error, Result};
use crate::playback::command::Command;
use crate::playback::progress::{self, ProgressWriter};
use crate::playback::state::{SharedTransport, VOLUME_STEP};
use asph_common::config::PlaybackConfig;
use asph_common::{InnerRecord, PcmDescriptor};
use std::io::Write;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Nominal bytes copied to the sink per iteration
pub const CHUNK_BYTES: usize = 4096;

/// Offset applied by one seek command
pub const SEEK_SECONDS: usize = 10;

/// Loop behavior knobs
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackOptions {
    /// Restart from the beginning at end of buffer
    pub looping: bool,
    /// Sleep between checks while paused
    pub pause_poll: Duration,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self::from_config(&PlaybackConfig::default())
    }
}

impl PlaybackOptions {
    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self {
            looping: config.looping,
            pause_poll: config.pause_poll(),
        }
    }
}

/// How a playback invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// A stop was requested
    Stopped,
    /// End of buffer reached without looping
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub outcome: PlaybackOutcome,
    /// Times playback wrapped back to the start
    pub loops: u32,
    /// Position when the loop exited
    pub position: usize,
}

/// Playback of one decoded record
pub struct Player {
    pcm: Vec<u8>,
    format: PcmDescriptor,
    transport: SharedTransport,
    options: PlaybackOptions,
}

impl Player {
    pub fn new(record: InnerRecord, transport: SharedTransport, options: PlaybackOptions) -> Self {
        Self {
            pcm: record.pcm,
            format: record.format,
            transport,
            options,
        }
    }

    pub fn transport(&self) -> &SharedTransport {
        &self.transport
    }

    pub fn format(&self) -> &PcmDescriptor {
        &self.format
    }

    pub fn total_len(&self) -> usize {
        self.pcm.len()
    }

    pub fn duration(&self) -> Duration {
        self.format.duration_of(self.pcm.len())
    }

    /// Elapsed time implied by the current position
    pub fn elapsed(&self) -> Duration {
        self.format.duration_of(self.transport.position().min(self.pcm.len()))
    }

    /// [`CHUNK_BYTES`] rounded down to whole frames (at least one frame)
    pub fn chunk_size(&self) -> usize {
        let frame = self.format.frame_size();
        (CHUNK_BYTES / frame).max(1) * frame
    }

    /// Bytes moved by one seek command
    pub fn seek_step(&self) -> usize {
        self.format.bytes_per_second() * SEEK_SECONDS
    }

    /// Play without drawing progress.
    pub fn run<S: OutputSink>(
        &self,
        sink: &mut S,
        commands: &mut mpsc::Receiver<Command>,
    ) -> Result<PlaybackSummary> {
        let mut silent = ProgressWriter::new(std::io::sink(), Duration::MAX);
        self.run_with_progress(sink, commands, &mut silent)
    }

    /// Play until stopped or (without looping) the end of the buffer.
    ///
    /// Drains the sink before returning in both cases.
    ///
    /// # Errors
    /// Sink failures, or a sink that stops accepting data.
    pub fn run_with_progress<S: OutputSink, W: Write>(
        &self,
        sink: &mut S,
        commands: &mut mpsc::Receiver<Command>,
        progress: &mut ProgressWriter<W>,
    ) -> Result<PlaybackSummary> {
        let total = self.pcm.len();
        let chunk = self.chunk_size();
        let mut loops = 0u32;

        info!(
            "Playback started: {} ({:.1}s, loop {})",
            self.format,
            self.duration().as_secs_f64(),
            if self.options.looping { "on" } else { "off" }
        );
        self.apply_volume(sink);

        let outcome = loop {
            self.apply_pending(commands);

            if self.transport.is_stopped() {
                break PlaybackOutcome::Stopped;
            }

            if self.transport.is_paused() {
                self.draw_progress(progress);
                thread::sleep(self.options.pause_poll);
                continue;
            }

            let position = self.transport.position();
            if position >= total {
                if self.options.looping && total > 0 {
                    loops += 1;
                    debug!("End of buffer, looping ({})", loops);
                    self.transport.set_position(0);
                    continue;
                }
                break PlaybackOutcome::Finished;
            }

            let end = (position + chunk).min(total);
            let accepted = sink.write(&self.pcm[position..end])?;
            if accepted == 0 {
                return Err(Error::Playback(format!(
                    "Output accepted no data at position {}",
                    position
                )));
            }
            self.transport.set_position(position + accepted);
            self.apply_volume(sink);
            self.draw_progress(progress);
        };

        let _ = progress.draw(&self.progress_line());
        let _ = progress.finish();

        sink.drain()?;
        let position = self.transport.position();
        info!("Playback {:?} at byte {} after {} loop(s)", outcome, position, loops);
        Ok(PlaybackSummary {
            outcome,
            loops,
            position,
        })
    }

    fn apply_pending(&self, commands: &mut mpsc::Receiver<Command>) {
        while let Ok(command) = commands.try_recv() {
            self.apply(command);
        }
    }

    /// Apply one command to the transport
    pub fn apply(&self, command: Command) {
        let transport = &self.transport;
        match command {
            Command::TogglePause => {
                let paused = transport.toggle_pause();
                info!("{}", if paused { "Paused" } else { "Resumed" });
            }
            Command::VolumeUp => {
                let volume = transport.adjust_volume(VOLUME_STEP);
                info!("Volume: {:.0}%", volume * 100.0);
            }
            Command::VolumeDown => {
                let volume = transport.adjust_volume(-VOLUME_STEP);
                info!("Volume: {:.0}%", volume * 100.0);
            }
            Command::SeekForward => {
                let position = transport.seek_by(self.seek_step() as isize, self.pcm.len());
                debug!("Seek forward to byte {}", position);
            }
            Command::SeekBackward => {
                let position = transport.seek_by(-(self.seek_step() as isize), self.pcm.len());
                debug!("Seek backward to byte {}", position);
            }
            Command::Stop => {
                transport.request_stop();
                info!("Stop requested");
            }
        }
    }

    fn apply_volume<S: OutputSink>(&self, sink: &mut S) {
        if let Some(gain) = sink.gain_control() {
            gain.set_volume(self.transport.volume());
        }
    }

    fn progress_line(&self) -> String {
        progress::render(self.elapsed(), self.duration(), self.options.looping)
    }

    fn draw_progress<W: Write>(&self, progress: &mut ProgressWriter<W>) {
        // Progress is cosmetic; a closed terminal must not end playback
        let _ = progress.update(&self.progress_line());
    }
}
