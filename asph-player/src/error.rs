//! Error types for asph-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for asph-player
#[derive(Error, Debug)]
pub enum Error {
    /// Container, negotiation, metadata or config failures
    #[error(transparent)]
    Container(#[from] asph_common::Error),

    /// WAV reading or writing errors
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Sample conversion or resampling errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Playback loop errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Failure class following the container taxonomy
    ///
    /// WAV parsing failures count as format errors; device and playback
    /// failures have no container class.
    pub fn kind(&self) -> Option<asph_common::ErrorKind> {
        match self {
            Error::Container(e) => Some(e.kind()),
            Error::Wav(hound::Error::IoError(_)) | Error::Io(_) => {
                Some(asph_common::ErrorKind::Io)
            }
            Error::Wav(_) => Some(asph_common::ErrorKind::Format),
            Error::Decode(_) => Some(asph_common::ErrorKind::Format),
            Error::AudioOutput(_) | Error::Playback(_) => None,
        }
    }
}

/// Convenience Result type using asph-player Error
pub type Result<T> = std::result::Result<T, Error>;
