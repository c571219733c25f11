//! Title/artist/album trailer
//!
//! A fixed 512-byte block appended after the container:
//!
//! ```text
//! title_len: u32 | title | artist_len: u32 | artist | album_len: u32 | album | zero padding
//! ```
//!
//! The trailer sits outside the encrypted payload, so it can be read or
//! rewritten without the cipher key. Writing appends a new trailer without
//! removing an earlier one; every call grows the file by exactly 512 bytes
//! and readers only ever see the last block.

use crate::container;
use crate::endian::{put_u32_le, ByteReader};
use crate::{Error, Result};
use std::path::Path;
use tracing::{debug, info};

/// Trailer size in bytes
pub const TRAILER_SIZE: usize = 512;

/// Parsed trailer fields; absent or empty fields are `None`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
}

impl TrackMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none() && self.album.is_none()
    }
}

/// Build a trailer block.
///
/// # Errors
/// `MetadataTooLarge` when the three length-prefixed fields exceed 512 bytes.
pub fn encode_trailer(title: &str, artist: &str, album: &str) -> Result<Vec<u8>> {
    let fields = [title.as_bytes(), artist.as_bytes(), album.as_bytes()];
    let required: usize = fields.iter().map(|f| 4 + f.len()).sum();
    if required > TRAILER_SIZE {
        return Err(Error::MetadataTooLarge {
            required,
            limit: TRAILER_SIZE,
        });
    }

    let mut block = Vec::with_capacity(TRAILER_SIZE);
    for field in fields {
        put_u32_le(&mut block, field.len() as u32);
        block.extend_from_slice(field);
    }
    block.resize(TRAILER_SIZE, 0);
    Ok(block)
}

/// Best-effort parse of the last [`TRAILER_SIZE`] bytes of `file_bytes`.
///
/// Fields are read in order; the first length that overruns the block or the
/// first field that is not valid UTF-8 ends parsing, keeping what was read.
pub fn parse_trailer(file_bytes: &[u8]) -> TrackMetadata {
    let mut meta = TrackMetadata::default();
    if file_bytes.len() < TRAILER_SIZE {
        return meta;
    }

    let mut reader = ByteReader::new(&file_bytes[file_bytes.len() - TRAILER_SIZE..]);
    for slot in [&mut meta.title, &mut meta.artist, &mut meta.album] {
        let Some(len) = reader.read_u32_le() else {
            break;
        };
        let Some(raw) = reader.take(len as usize) else {
            debug!("Metadata field length {} overruns trailer, stopping", len);
            break;
        };
        match std::str::from_utf8(raw) {
            Ok(text) if !text.is_empty() => *slot = Some(text.to_string()),
            Ok(_) => {}
            Err(_) => {
                debug!("Metadata field is not valid UTF-8, stopping");
                break;
            }
        }
    }
    meta
}

/// Append a trailer to the file at `path`, rewriting it in place.
///
/// The trailer is validated before the file is touched.
pub fn write(path: impl AsRef<Path>, title: &str, artist: &str, album: &str) -> Result<()> {
    let path = path.as_ref();
    let trailer = encode_trailer(title, artist, album)?;
    let mut bytes = std::fs::read(path)?;
    bytes.extend_from_slice(&trailer);
    std::fs::write(path, &bytes)?;
    info!("Metadata successfully added to {}", path.display());
    Ok(())
}

/// Read the trailer of any file; files shorter than the trailer have none.
pub fn read(path: impl AsRef<Path>) -> Result<TrackMetadata> {
    let bytes = std::fs::read(path)?;
    Ok(parse_trailer(&bytes))
}

/// Read the trailer of an ASPH file image, ignoring the encrypted payload.
///
/// When nothing follows the outer record there is no trailer, even if the file
/// is long enough to hold one. Images whose framing cannot be parsed fall back
/// to [`parse_trailer`].
pub fn read_asph_bytes(file_bytes: &[u8]) -> TrackMetadata {
    match container::outer_record_len(file_bytes) {
        Some(len) if file_bytes.len() - len < TRAILER_SIZE => TrackMetadata::default(),
        _ => parse_trailer(file_bytes),
    }
}

/// [`read_asph_bytes`] for a path
pub fn read_asph(path: impl AsRef<Path>) -> Result<TrackMetadata> {
    let bytes = std::fs::read(path)?;
    Ok(read_asph_bytes(&bytes))
}
