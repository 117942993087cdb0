//! hseal-crypto: layered authenticated encryption for HybridSeal
//!
//! Architecture: two independent AEAD layers per unit of data, AES-256-GCM
//! innermost and a ChaCha20-Poly1305 family cipher outermost.
//!
//! Codecs:
//! ```text
//! envelope  Salt(16) ‖ OuterNonce(12) ‖ ChaCha20-Poly1305( InnerNonce(12) ‖ AES-256-GCM(pt) )
//!           + detached HMAC-SHA256 signature over the whole envelope
//! chunked   Salt(16) ‖ Cascade(chunk₁) ‖ … ‖ Cascade(chunkₙ) ‖ HMAC-SHA256 trailer(32)
//! cookie    Nonce1(12) ‖ Nonce2(24) ‖ XChaCha20-Poly1305( AES-256-GCM(value) )
//! framed    { Len(2, BE) ‖ Nonce(12) ‖ ChaCha20-Poly1305( AES-256-CTR(chunk) ) }*
//! ```
//!
//! Keys and passwords are always passed in explicitly; nothing in this crate
//! reads the process environment.

pub mod cascade;
pub mod chunked;
pub mod cookie;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod framed;
pub mod kdf;
pub mod options;
pub mod primitives;
pub mod sign;

pub use cascade::{decrypt, encrypt};
pub use chunked::{decrypt_stream, encrypt_stream, StreamSummary};
pub use cookie::{decrypt_cookie, encrypt_cookie};
pub use encoding::{CookieEncoding, TextEncoding};
pub use envelope::{decrypt_data, encrypt_data, verify_ciphertext, SealedData};
pub use error::{CryptoError, CryptoResult};
pub use framed::FramedCodec;
pub use kdf::{derive_key, encode_key, generate_key, generate_salt, DerivedKey, KdfParams};
pub use options::CodecOptions;
pub use sign::{sign, verify, Signature};

/// Size of a cipher key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of the per-operation KDF salt
pub const SALT_SIZE: usize = 16;

/// Nonce size shared by AES-256-GCM and ChaCha20-Poly1305 (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Nonce size of XChaCha20-Poly1305 (192-bit)
pub const XNONCE_SIZE: usize = 24;

/// Size of a GCM / Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of an HMAC-SHA256 signature
pub const SIGNATURE_SIZE: usize = 32;

/// Bytes one cascade adds on top of its plaintext: two nonces and two tags.
pub const CASCADE_OVERHEAD: usize = 2 * (NONCE_SIZE + TAG_SIZE);
