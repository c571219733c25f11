//! ASPH container codec
//!
//! On-disk layout (little-endian):
//!
//! ```text
//! outer:  "ASPH" | encrypted_len: u32 | AES-CBC(GZIP(inner)): encrypted_len bytes
//! inner:  "ASPH" | version: u8 | sample_rate: u32 | bits: u32 | channels: u32 | pcm...
//! ```
//!
//! Anything after the encrypted payload (the metadata trailer) is ignored by
//! the codec. Encoding always runs serialize → compress → encrypt → frame;
//! decoding is the exact inverse and validates every boundary.

use crate::crypto::{self, CipherKeys};
use crate::endian::{put_u32_le, ByteReader};
use crate::error::MagicLocation;
use crate::format::PcmDescriptor;
use crate::{Error, Result};
use tracing::{debug, warn};

/// Magic bytes at the start of both records
pub const MAGIC: [u8; 4] = *b"ASPH";

/// Version written by this codec
pub const FORMAT_VERSION: u8 = 4;

/// Version written by the fixed 44.1 kHz / 16-bit / stereo encoder
pub const LEGACY_VERSION: u8 = 1;

/// Outer header size: magic + length
pub const OUTER_HEADER_LEN: usize = 8;

/// Inner header size: magic + version + three format fields
pub const INNER_HEADER_LEN: usize = 17;

/// Decrypted, decompressed record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerRecord {
    /// Version byte found in the record; informational only
    pub version: u8,
    pub format: PcmDescriptor,
    /// Interleaved PCM, always a whole number of frames
    pub pcm: Vec<u8>,
}

impl InnerRecord {
    pub fn frames(&self) -> usize {
        self.pcm.len() / self.format.frame_size()
    }

    /// Serialize to the inner byte layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(INNER_HEADER_LEN + self.pcm.len());
        out.extend_from_slice(&MAGIC);
        out.push(self.version);
        put_u32_le(&mut out, self.format.sample_rate_hz());
        put_u32_le(&mut out, self.format.bits_per_sample() as u32);
        put_u32_le(&mut out, self.format.channels() as u32);
        out.extend_from_slice(&self.pcm);
        out
    }

    /// Parse the inner byte layout
    ///
    /// # Errors
    /// - `BadMagic` (inner) when the first four bytes are not "ASPH"
    /// - `CorruptPayload` for a short header, off-lattice format fields or a
    ///   PCM length that is not a whole number of frames
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        let magic = reader
            .take(4)
            .ok_or_else(|| Error::CorruptPayload("record shorter than magic".to_string()))?;
        if magic != MAGIC {
            return Err(Error::BadMagic {
                location: MagicLocation::Inner,
            });
        }

        let header = (|| {
            Some((
                reader.read_u8()?,
                reader.read_u32_le()?,
                reader.read_u32_le()?,
                reader.read_u32_le()?,
            ))
        })();
        let (version, rate, bits, channels) = header
            .ok_or_else(|| Error::CorruptPayload("incomplete ASPH header".to_string()))?;

        let format = match (u16::try_from(bits), u16::try_from(channels)) {
            (Ok(b), Ok(c)) => PcmDescriptor::new(rate, b, c).ok(),
            _ => None,
        }
        .ok_or_else(|| {
            Error::CorruptPayload(format!(
                "unsupported format fields: {} Hz, {} bits, {} channels",
                rate, bits, channels
            ))
        })?;

        let pcm = reader.rest();
        if pcm.len() % format.frame_size() != 0 {
            return Err(Error::CorruptPayload(format!(
                "PCM length {} is not a multiple of frame size {}",
                pcm.len(),
                format.frame_size()
            )));
        }

        Ok(Self {
            version,
            format,
            pcm: pcm.to_vec(),
        })
    }
}

/// Container encoder/decoder bound to a key pair and an expected version
#[derive(Debug, Clone)]
pub struct ContainerCodec {
    keys: CipherKeys,
    expected_version: u8,
}

impl Default for ContainerCodec {
    fn default() -> Self {
        Self {
            keys: CipherKeys::EMBEDDED,
            expected_version: FORMAT_VERSION,
        }
    }
}

impl ContainerCodec {
    pub fn new(keys: CipherKeys, expected_version: u8) -> Self {
        Self {
            keys,
            expected_version,
        }
    }

    pub fn expected_version(&self) -> u8 {
        self.expected_version
    }

    /// Build a complete ASPH file image.
    ///
    /// # Errors
    /// - `InvalidPcmLength` if `pcm` is not a whole number of frames
    /// - `Compression` if the compressor fails
    pub fn encode(&self, pcm: &[u8], format: &PcmDescriptor, version: u8) -> Result<Vec<u8>> {
        if pcm.len() % format.frame_size() != 0 {
            return Err(Error::InvalidPcmLength {
                len: pcm.len(),
                frame_size: format.frame_size(),
            });
        }

        let record = InnerRecord {
            version,
            format: *format,
            pcm: pcm.to_vec(),
        };
        let inner = record.to_bytes();
        let compressed = crypto::compress(&inner)?;
        let encrypted = crypto::encrypt(&self.keys, &compressed);

        let encrypted_len = u32::try_from(encrypted.len()).map_err(|_| {
            Error::Compression(format!(
                "encrypted payload of {} bytes exceeds the 32-bit length field",
                encrypted.len()
            ))
        })?;

        let mut out = Vec::with_capacity(OUTER_HEADER_LEN + encrypted.len());
        out.extend_from_slice(&MAGIC);
        put_u32_le(&mut out, encrypted_len);
        out.extend_from_slice(&encrypted);

        debug!(
            "Encoded {} PCM bytes ({}) into {} byte container (inner {}, compressed {})",
            pcm.len(),
            format,
            out.len(),
            inner.len(),
            compressed.len()
        );
        Ok(out)
    }

    /// Decode a file image into its inner record.
    ///
    /// A version byte different from the expected one is logged and decoding
    /// continues with the format fields stored in the record.
    pub fn decode(&self, file_bytes: &[u8]) -> Result<InnerRecord> {
        let encrypted = outer_payload(file_bytes)?;
        let compressed = crypto::decrypt(&self.keys, encrypted)?;
        let inner = crypto::decompress(&compressed)?;
        let record = InnerRecord::parse(&inner)?;

        if record.version != self.expected_version {
            warn!(
                "ASPH version mismatch: file has version {}, codec expects {}",
                record.version, self.expected_version
            );
        }

        debug!(
            "Decoded ASPH v{} record: {}, {} frames",
            record.version,
            record.format,
            record.frames()
        );
        Ok(record)
    }
}

/// Validate the outer framing and return the encrypted payload slice.
///
/// # Errors
/// `BadMagic` (outer), `TruncatedLength` or `TruncatedPayload`.
pub fn outer_payload(file_bytes: &[u8]) -> Result<&[u8]> {
    let mut reader = ByteReader::new(file_bytes);
    match reader.take(4) {
        Some(magic) if magic == MAGIC => {}
        _ => {
            return Err(Error::BadMagic {
                location: MagicLocation::Outer,
            })
        }
    }
    let expected = reader.read_u32_le().ok_or(Error::TruncatedLength)? as usize;
    let available = reader.remaining();
    reader
        .take(expected)
        .ok_or(Error::TruncatedPayload { expected, available })
}

/// Total length of the outer record (header plus payload), if the framing is intact
pub fn outer_record_len(file_bytes: &[u8]) -> Option<usize> {
    outer_payload(file_bytes)
        .ok()
        .map(|payload| OUTER_HEADER_LEN + payload.len())
}

/// Encode with the embedded keys
pub fn encode(pcm: &[u8], format: &PcmDescriptor, version: u8) -> Result<Vec<u8>> {
    ContainerCodec::default().encode(pcm, format, version)
}

/// Decode with the embedded keys, expecting [`FORMAT_VERSION`]
pub fn decode(file_bytes: &[u8]) -> Result<InnerRecord> {
    ContainerCodec::default().decode(file_bytes)
}
