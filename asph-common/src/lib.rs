//! # ASPH Common Library
//!
//! Shared code for the AudioSphere tools:
//! - Error taxonomy
//! - Little-endian helpers and PCM sample layout
//! - Target format negotiation
//! - Cipher and compressor adapters
//! - Container codec (outer/inner records)
//! - Metadata trailer
//! - Configuration loading

pub mod config;
pub mod container;
pub mod crypto;
pub mod endian;
pub mod error;
pub mod format;
pub mod metadata;
pub mod pcm;

pub use container::{ContainerCodec, InnerRecord, FORMAT_VERSION, LEGACY_VERSION};
pub use error::{Error, ErrorKind, Result};
pub use format::{negotiate, PcmDescriptor, SourceFormat};
pub use metadata::TrackMetadata;
