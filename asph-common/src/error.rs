//! Common error types for ASPH
//!
//! Every container, negotiation and metadata failure surfaces as one of these
//! variants. Callers that need to react to the broad class of a failure (for
//! example to print a different hint for "wrong key" versus "not an ASPH file")
//! use [`Error::kind`].

use thiserror::Error;

/// Common result type for ASPH operations
pub type Result<T> = std::result::Result<T, Error>;

/// Where a magic check failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicLocation {
    /// Unencrypted magic at the start of the file
    Outer,
    /// Magic at the start of the decrypted, decompressed record
    Inner,
}

impl std::fmt::Display for MagicLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MagicLocation::Outer => write!(f, "outer"),
            MagicLocation::Inner => write!(f, "inner"),
        }
    }
}

/// Broad failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing magic, truncated header or payload, non-WAV input
    Format,
    /// Decryption or padding failure
    Crypto,
    /// Invalid source parameters or metadata that does not fit
    Validation,
    /// Filesystem failures
    Io,
}

/// Common error types across ASPH crates
#[derive(Error, Debug)]
pub enum Error {
    /// Magic bytes did not read "ASPH"
    #[error("Invalid file format: {location} magic mismatch (expected \"ASPH\")")]
    BadMagic { location: MagicLocation },

    /// Fewer than four bytes available for the encrypted length field
    #[error("Unexpected end of file while reading encrypted length")]
    TruncatedLength,

    /// Fewer payload bytes than the length field announced
    #[error("Unexpected end of file while reading encrypted payload: expected {expected} bytes, found {available}")]
    TruncatedPayload { expected: usize, available: usize },

    /// AES-CBC decryption or padding removal failed
    #[error("Decryption failed (wrong key or corrupted file)")]
    DecryptionFailed,

    /// Decrypted bytes did not decompress or did not form a valid record
    #[error("Corrupt payload: {0}")]
    CorruptPayload(String),

    /// Source PCM description cannot be repaired by clamping
    #[error("Invalid source format: {0}")]
    InvalidSourceFormat(String),

    /// PCM byte length is not a whole number of frames
    #[error("PCM length {len} is not a multiple of the frame size {frame_size}")]
    InvalidPcmLength { len: usize, frame_size: usize },

    /// Title, artist and album do not fit in the trailer
    #[error("Metadata size exceeds reserved space: {required} bytes needed, {limit} available")]
    MetadataTooLarge { required: usize, limit: usize },

    /// Compressor failure while encoding
    #[error("Compression error: {0}")]
    Compression(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BadMagic { .. }
            | Error::TruncatedLength
            | Error::TruncatedPayload { .. }
            | Error::CorruptPayload(_)
            | Error::Compression(_) => ErrorKind::Format,
            Error::DecryptionFailed => ErrorKind::Crypto,
            Error::InvalidSourceFormat(_)
            | Error::InvalidPcmLength { .. }
            | Error::MetadataTooLarge { .. }
            | Error::Config(_) => ErrorKind::Validation,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}
