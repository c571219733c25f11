//! Fixed-parameter cipher and compressor adapters
//!
//! AES-128-CBC with PKCS#7 padding, and GZIP framing around DEFLATE. The key and
//! IV are format constants shared by every file this tool has ever produced;
//! the container offers confidentiality against casual inspection only. There
//! is no authentication tag, so tampering is detected only when it happens to
//! break padding, decompression or the inner magic.

use crate::{Error, Result};
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use tracing::debug;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Embedded AES-128 key
pub const EMBEDDED_KEY: [u8; 16] = [
    0x21, 0x43, 0x65, 0x87, 0x09, 0xBA, 0xDC, 0xFE, 0x13, 0x57, 0x9B, 0xDF, 0x02, 0x46, 0x8A, 0xCE,
];

/// Embedded CBC initialisation vector
pub const EMBEDDED_IV: [u8; 16] = [
    0x12, 0x34, 0x56, 0x78, 0x90, 0xAB, 0xCD, 0xEF, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88,
];

/// Upper bound on a decompressed inner record (1 GiB)
pub const MAX_DECOMPRESSED_LEN: u64 = 1 << 30;

/// Key and IV pair used by the container cipher
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CipherKeys {
    pub key: [u8; 16],
    pub iv: [u8; 16],
}

impl CipherKeys {
    pub const EMBEDDED: CipherKeys = CipherKeys {
        key: EMBEDDED_KEY,
        iv: EMBEDDED_IV,
    };
}

impl Default for CipherKeys {
    fn default() -> Self {
        Self::EMBEDDED
    }
}

impl std::fmt::Debug for CipherKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let embedded = *self == Self::EMBEDDED;
        f.debug_struct("CipherKeys")
            .field("embedded", &embedded)
            .finish_non_exhaustive()
    }
}

/// Encrypt with AES-128-CBC and PKCS#7 padding
pub fn encrypt(keys: &CipherKeys, plaintext: &[u8]) -> Vec<u8> {
    Aes128CbcEnc::new(&keys.key.into(), &keys.iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypt AES-128-CBC ciphertext and strip PKCS#7 padding
///
/// # Errors
/// `DecryptionFailed` when the length is not a whole number of blocks or the
/// padding is invalid.
pub fn decrypt(keys: &CipherKeys, ciphertext: &[u8]) -> Result<Vec<u8>> {
    Aes128CbcDec::new(&keys.key.into(), &keys.iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| Error::DecryptionFailed)
}

/// GZIP-compress a complete buffer at the default level
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| Error::Compression(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| Error::Compression(e.to_string()))?;
    debug!("Compressed {} bytes to {}", data.len(), compressed.len());
    Ok(compressed)
}

/// Decompress a GZIP buffer, refusing output larger than [`MAX_DECOMPRESSED_LEN`]
///
/// # Errors
/// `CorruptPayload` for malformed streams or oversized output.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    decompress_with_limit(data, MAX_DECOMPRESSED_LEN)
}

pub(crate) fn decompress_with_limit(data: &[u8], limit: u64) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(data)
        .take(limit + 1)
        .read_to_end(&mut out)
        .map_err(|e| Error::CorruptPayload(format!("decompression failed: {}", e)))?;
    if out.len() as u64 > limit {
        return Err(Error::CorruptPayload(format!(
            "decompressed record exceeds {} bytes",
            limit
        )));
    }
    Ok(out)
}
