//! File-level operations: WAV to ASPH, ASPH to WAV, loading tracks for playback
//!
//! Outputs are written to a temporary file next to the destination and renamed
//! into place on success, so a failed operation never leaves a partial file.

use crate::audio::wav::{write_wav, WavSource};
use crate::error::{Error, Result};
use asph_common::{metadata, negotiate, ContainerCodec, InnerRecord, PcmDescriptor, TrackMetadata, FORMAT_VERSION};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Statistics from a successful encode
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeReport {
    pub version: u8,
    pub format: PcmDescriptor,
    /// Size of the input WAV file
    pub original_size: u64,
    /// Size of the written ASPH file
    pub encoded_size: u64,
}

impl EncodeReport {
    /// Encoded size as a percentage of the original
    pub fn ratio_percent(&self) -> f64 {
        self.encoded_size as f64 / self.original_size.max(1) as f64 * 100.0
    }
}

impl fmt::Display for EncodeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ASPH version: {}", self.version)?;
        writeln!(f, "Audio format:")?;
        writeln!(f, "  Sample rate: {}Hz", self.format.sample_rate_hz())?;
        writeln!(f, "  Bit depth:   {}-bit", self.format.bits_per_sample())?;
        writeln!(f, "  Channels:    {}", self.format.channels())?;
        writeln!(f, "File statistics:")?;
        writeln!(f, "  Original size:     {} bytes", self.original_size)?;
        writeln!(f, "  Encoded size:      {} bytes", self.encoded_size)?;
        write!(f, "  Compression ratio: {:.1}%", self.ratio_percent())
    }
}

/// Encode a WAV file into an ASPH file.
///
/// # Errors
/// - `Error::Wav` when the input is not a readable WAV file
/// - `InvalidSourceFormat` when the WAV header has no usable rate or channels
/// - `Error::Io` when the output cannot be written
pub fn encode_file(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<EncodeReport> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let source = WavSource::open(input)?;
    let format = negotiate(source.source_format())?;
    debug!("Negotiated {} from {:?}", format, source.spec());

    let pcm = source.convert(&format)?;
    let encoded = ContainerCodec::default().encode(&pcm, &format, FORMAT_VERSION)?;
    write_atomic(output, |file| {
        file.write_all(&encoded)?;
        Ok(())
    })?;

    let report = EncodeReport {
        version: FORMAT_VERSION,
        format,
        original_size: std::fs::metadata(input)?.len(),
        encoded_size: encoded.len() as u64,
    };
    info!(
        "Encoded {} -> {} ({}, {:.1}% of original)",
        input.display(),
        output.display(),
        format,
        report.ratio_percent()
    );
    Ok(report)
}

/// Decode an ASPH file (trailer ignored) into a PCM WAV file.
pub fn decode_file(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<InnerRecord> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let bytes = std::fs::read(input)?;
    let record = ContainerCodec::default().decode(&bytes)?;

    write_atomic(output, |file| {
        let mut writer = BufWriter::new(file);
        write_wav(&mut writer, &record.format, &record.pcm)?;
        writer.flush()?;
        Ok(())
    })?;

    info!(
        "Decoded {} -> {} ({}, {} frames)",
        input.display(),
        output.display(),
        record.format,
        record.frames()
    );
    Ok(record)
}

/// Write through `fill` into a temporary file beside `path`, then rename.
fn write_atomic<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut tmp = NamedTempFile::new_in(&dir)?;
    fill(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// A decoded track with its trailer metadata
#[derive(Debug, Clone)]
pub struct Track {
    pub path: PathBuf,
    pub record: InnerRecord,
    pub metadata: TrackMetadata,
    /// Size of the file on disk
    pub file_size: u64,
}

impl Track {
    /// Title from the trailer, else the file name
    pub fn title(&self) -> String {
        self.metadata.title.clone().unwrap_or_else(|| {
            self.path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }

    pub fn artist(&self) -> &str {
        self.metadata.artist.as_deref().unwrap_or("Unknown")
    }

    pub fn album(&self) -> &str {
        self.metadata.album.as_deref().unwrap_or("Unknown")
    }

    pub fn duration(&self) -> Duration {
        self.record.format.duration_of(self.record.pcm.len())
    }
}

/// Read, decrypt and decode an ASPH file along with its metadata.
///
/// Fails before any output device is touched.
pub fn load_track(path: impl AsRef<Path>) -> Result<Track> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let record = ContainerCodec::default().decode(&bytes)?;
    let metadata = metadata::read_asph_bytes(&bytes);
    debug!("Loaded {} ({}, {} bytes PCM)", path.display(), record.format, record.pcm.len());
    Ok(Track {
        path: path.to_path_buf(),
        record,
        metadata,
        file_size: bytes.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(metadata: TrackMetadata) -> Track {
        let format = PcmDescriptor::new(8_000, 8, 1).unwrap();
        Track {
            path: PathBuf::from("/music/song.asph"),
            record: InnerRecord {
                version: FORMAT_VERSION,
                format,
                pcm: vec![0; 16_000],
            },
            metadata,
            file_size: 0,
        }
    }

    #[test]
    fn test_track_defaults() {
        let t = track(TrackMetadata::default());
        assert_eq!(t.title(), "song.asph");
        assert_eq!(t.artist(), "Unknown");
        assert_eq!(t.album(), "Unknown");
        assert_eq!(t.duration(), Duration::from_secs(2));
    }

    #[test]
    fn test_track_uses_trailer() {
        let t = track(TrackMetadata {
            title: Some("T".to_string()),
            artist: Some("A".to_string()),
            album: None,
        });
        assert_eq!(t.title(), "T");
        assert_eq!(t.artist(), "A");
        assert_eq!(t.album(), "Unknown");
    }

    #[test]
    fn test_ratio_guards_zero_original() {
        let report = EncodeReport {
            version: FORMAT_VERSION,
            format: PcmDescriptor::new(8_000, 8, 1).unwrap(),
            original_size: 0,
            encoded_size: 10,
        };
        assert_eq!(report.ratio_percent(), 1000.0);
        assert!(report.to_string().contains("Compression ratio: 1000.0%"));
    }

    #[test]
    fn test_write_atomic_leaves_nothing_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.bin");
        let result = write_atomic(&target, |file| {
            file.write_all(b"partial")?;
            Err(Error::Decode("boom".to_string()))
        });
        assert!(result.is_err());
        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
