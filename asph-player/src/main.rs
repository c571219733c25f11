//! AudioSphere CLI (asph) - Main entry point
//!
//! Encodes WAV files into ASPH containers, decodes them back, edits the
//! metadata trailer and plays containers with keyboard transport control.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use asph_common::config::AsphConfig;
use asph_common::{metadata, FORMAT_VERSION};
use asph_player::audio::CpalSink;
use asph_player::audio::OutputSink;
use asph_player::playback::progress::{format_clock, ProgressWriter};
use asph_player::playback::{
    spawn_stdin_listener, PlaybackOptions, PlaybackOutcome, Player, TransportState,
};
use asph_player::transcode;
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for asph
#[derive(Parser, Debug)]
#[command(name = "asph")]
#[command(about = "AudioSphere encoder, decoder and player")]
#[command(version)]
struct Args {
    /// Configuration file (overrides ASPH_CONFIG and the per-user file)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a WAV file into an ASPH file
    Encode { input: PathBuf, output: PathBuf },
    /// Decode an ASPH file into a WAV file
    Decode { input: PathBuf, output: PathBuf },
    /// Play an ASPH file
    Play {
        input: PathBuf,
        /// Restart from the beginning at the end of the track
        #[arg(long = "loop")]
        looping: bool,
        /// Output device name
        #[arg(short, long)]
        device: Option<String>,
    },
    /// Append a title/artist/album trailer to a file
    Metadata {
        file: PathBuf,
        title: String,
        artist: String,
        album: Option<String>,
    },
    /// Show format and metadata of an ASPH file
    Info { file: PathBuf },
    /// List audio output devices
    Devices,
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AsphConfig::resolve(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging.level);
    config.log_adjustments();
    debug!("Configuration: {:?}", config);

    match args.command {
        Command::Encode { input, output } => {
            let report = transcode::encode_file(&input, &output)
                .with_context(|| format!("Failed to encode {}", input.display()))?;
            println!("Encoded {} -> {}", input.display(), output.display());
            println!("{}", report);
        }
        Command::Decode { input, output } => {
            transcode::decode_file(&input, &output)
                .with_context(|| format!("Failed to decode {}", input.display()))?;
            println!("Successfully decoded {} to {}", input.display(), output.display());
        }
        Command::Play {
            input,
            looping,
            device,
        } => {
            let device = device.or_else(|| config.playback.device.clone());
            play(&config, &input, looping || config.playback.looping, device).await?;
        }
        Command::Metadata {
            file,
            title,
            artist,
            album,
        } => {
            metadata::write(&file, &title, &artist, album.as_deref().unwrap_or(""))
                .with_context(|| format!("Failed to add metadata to {}", file.display()))?;
            println!("Metadata successfully added to {}", file.display());
        }
        Command::Info { file } => info_command(&file)?,
        Command::Devices => {
            for name in CpalSink::list_devices().context("Failed to list audio devices")? {
                println!("{}", name);
            }
        }
        Command::Version => {
            println!("AudioSphere {}", env!("CARGO_PKG_VERSION"));
            println!("ASPH format version {}", FORMAT_VERSION);
        }
    }

    Ok(())
}

/// Install the tracing subscriber; `RUST_LOG` overrides the configured level
fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("asph={level},asph_player={level},asph_common={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn play(
    config: &AsphConfig,
    input: &Path,
    looping: bool,
    device: Option<String>,
) -> Result<()> {
    // Decode fully before the device is opened
    let track = transcode::load_track(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    println!("Now Playing: {}", track.title());
    println!("Artist: {}", track.artist());
    println!("Album: {}", track.album());
    println!("Format: {}", track.record.format);
    println!("Controls: p pause/resume, +/- volume, f/b seek 10s, q stop");

    let transport = TransportState::shared();
    let (tx, mut rx) = mpsc::channel(config.playback.command_queue_depth);
    spawn_stdin_listener(tx, transport.clone()).context("Failed to start command listener")?;

    let on_signal = transport.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, stopping playback");
                on_signal.request_stop();
            }
            Err(e) => warn!("Failed to install Ctrl+C handler: {}", e),
        }
    });

    let options = PlaybackOptions {
        looping,
        ..PlaybackOptions::from_config(&config.playback)
    };
    let format = track.record.format;
    let buffer_ms = config.playback.buffer_ms;
    let progress_interval = config.playback.progress_interval();
    let player = Player::new(track.record, transport, options);

    // cpal streams are not Send, so the sink lives entirely on the blocking thread
    let summary = tokio::task::spawn_blocking(move || -> asph_player::Result<_> {
        let mut sink = CpalSink::open(format, device.as_deref(), buffer_ms)?;
        let mut progress = ProgressWriter::new(std::io::stdout(), progress_interval);
        let summary = player.run_with_progress(&mut sink, &mut rx, &mut progress);
        sink.close()?;
        summary
    })
    .await
    .context("Playback task failed")?
    .context("Playback failed")?;

    match summary.outcome {
        PlaybackOutcome::Stopped => println!("Playback stopped."),
        PlaybackOutcome::Finished => println!("Playback ended."),
    }
    Ok(())
}

fn info_command(file: &Path) -> Result<()> {
    let track = transcode::load_track(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let format = &track.record.format;

    println!("File:        {}", file.display());
    println!("Size:        {} bytes", track.file_size);
    println!("Version:     {}", track.record.version);
    println!("Sample rate: {}Hz", format.sample_rate_hz());
    println!("Bit depth:   {}-bit", format.bits_per_sample());
    println!("Channels:    {}", format.channels());
    println!("Duration:    {}", format_clock(track.duration()));
    if track.metadata.is_empty() {
        println!("Metadata:    none");
    } else {
        println!("Title:       {}", track.title());
        println!("Artist:      {}", track.artist());
        println!("Album:       {}", track.album());
    }
    Ok(())
}
