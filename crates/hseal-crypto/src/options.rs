//! Codec configuration

use serde::{Deserialize, Serialize};

use crate::encoding::{CookieEncoding, TextEncoding};
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::KdfParams;
use crate::TAG_SIZE;

/// Default plaintext chunk size for the chunked streaming codec
pub const DEFAULT_STREAM_CHUNK_SIZE: usize = 4096;

/// Largest plaintext chunk the chunked streaming codec buffers (16 MiB).
pub const MAX_STREAM_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Default plaintext chunk size for the framed codec
pub const DEFAULT_FRAME_CHUNK_SIZE: usize = 16 * 1024;

/// Largest framed chunk whose sealed length still fits the 2-byte prefix.
pub const MAX_FRAME_CHUNK_SIZE: usize = u16::MAX as usize - TAG_SIZE;

/// Optional behaviours shared by all codecs (loaded from the `[codec]` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    /// Run Argon2id over (secret, salt) instead of using the secret as the key (default: false)
    pub slow_kdf: bool,
    /// Argon2id cost profile used when `slow_kdf` is set
    pub kdf: KdfParams,
    /// Encoding of envelope and signature text (default: base64)
    pub text_encoding: TextEncoding,
    /// Plaintext bytes per chunk in the chunked streaming codec (default: 4096)
    pub stream_chunk_size: usize,
    /// Cookie text encoding: "base64" (URL-safe, unpadded) or "hex"
    pub cookie_encoding: CookieEncoding,
    /// Plaintext bytes per frame in the framed codec (default: 16384)
    pub frame_chunk_size: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            slow_kdf: false,
            kdf: KdfParams::default(),
            text_encoding: TextEncoding::default(),
            stream_chunk_size: DEFAULT_STREAM_CHUNK_SIZE,
            cookie_encoding: CookieEncoding::default(),
            frame_chunk_size: DEFAULT_FRAME_CHUNK_SIZE,
        }
    }
}

impl CodecOptions {
    /// Reject chunk sizes the wire formats cannot carry.
    pub fn validate(&self) -> CryptoResult<()> {
        if self.stream_chunk_size == 0 || self.stream_chunk_size > MAX_STREAM_CHUNK_SIZE {
            return Err(CryptoError::Config(format!(
                "stream_chunk_size must be between 1 and {MAX_STREAM_CHUNK_SIZE}, got {}",
                self.stream_chunk_size
            )));
        }
        if self.frame_chunk_size == 0 || self.frame_chunk_size > MAX_FRAME_CHUNK_SIZE {
            return Err(CryptoError::Config(format!(
                "frame_chunk_size must be between 1 and {MAX_FRAME_CHUNK_SIZE}, got {}",
                self.frame_chunk_size
            )));
        }
        Ok(())
    }
}
