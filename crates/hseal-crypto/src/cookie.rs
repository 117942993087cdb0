//! Compact two-layer encryption for cookie values
//!
//! Cookie format (binary, before text encoding):
//! ```text
//! [12 bytes: AES-GCM nonce][24 bytes: XChaCha nonce]
//! XChaCha20-Poly1305( AES-256-GCM(value) [16-byte tag] ) [16-byte tag]
//! ```
//!
//! The key arrives as standard base64 text and must decode to exactly 32
//! bytes. A key that does not decode is an error, never a fallback.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::encoding::{CookieEncoding, TextEncoding};
use crate::error::{CryptoError, CryptoResult};
use crate::primitives::{block_open, block_seal, random_nonce, xstream_open, xstream_seal};
use crate::{KEY_SIZE, NONCE_SIZE, XNONCE_SIZE};

const HEADER_SIZE: usize = NONCE_SIZE + XNONCE_SIZE;

/// Encrypt a cookie value and render it in `encoding`.
pub fn encrypt_cookie(
    value: &[u8],
    key: &SecretString,
    encoding: CookieEncoding,
) -> CryptoResult<String> {
    let key = decode_key(key)?;

    let inner_nonce = random_nonce::<NONCE_SIZE>();
    let outer_nonce = random_nonce::<XNONCE_SIZE>();

    let inner = block_seal(&key, &inner_nonce, value)?;
    let outer = xstream_seal(&key, &outer_nonce, &inner)?;

    let mut raw = Vec::with_capacity(HEADER_SIZE + outer.len());
    raw.extend_from_slice(&inner_nonce);
    raw.extend_from_slice(&outer_nonce);
    raw.extend_from_slice(&outer);

    Ok(TextEncoding::from(encoding).encode(&raw))
}

/// Decode and decrypt a cookie produced by [`encrypt_cookie`].
///
/// `InvalidKey` if the key is unusable, `InvalidCookie` if the text does not
/// decode or is too short to hold both nonces, `InvalidCiphertext` if either
/// layer fails to authenticate.
pub fn decrypt_cookie(
    text: &str,
    key: &SecretString,
    encoding: CookieEncoding,
) -> CryptoResult<Vec<u8>> {
    let key = decode_key(key)?;

    let raw = TextEncoding::from(encoding)
        .decode(text)
        .ok_or(CryptoError::InvalidCookie)?;
    if raw.len() < HEADER_SIZE {
        return Err(CryptoError::InvalidCookie);
    }

    let (inner_nonce, rest) = raw.split_at(NONCE_SIZE);
    let (outer_nonce, ciphertext) = rest.split_at(XNONCE_SIZE);
    let inner_nonce: &[u8; NONCE_SIZE] = inner_nonce
        .try_into()
        .map_err(|_| CryptoError::InvalidCookie)?;
    let outer_nonce: &[u8; XNONCE_SIZE] = outer_nonce
        .try_into()
        .map_err(|_| CryptoError::InvalidCookie)?;

    let inner = xstream_open(&key, outer_nonce, ciphertext)?;
    block_open(&key, inner_nonce, &inner)
}

fn decode_key(key: &SecretString) -> CryptoResult<Zeroizing<[u8; KEY_SIZE]>> {
    let decoded = Zeroizing::new(
        STANDARD
            .decode(key.expose_secret().trim())
            .map_err(|_| CryptoError::InvalidKey("cookie key is not valid base64".into()))?,
    );
    let bytes: [u8; KEY_SIZE] = decoded.as_slice().try_into().map_err(|_| {
        CryptoError::InvalidKey(format!(
            "cookie key decodes to {} bytes, {KEY_SIZE} required",
            decoded.len()
        ))
    })?;
    Ok(Zeroizing::new(bytes))
}
