//! Signed envelopes for small values
//!
//! Envelope format (binary, before text encoding):
//! ```text
//! [16 bytes: salt][cascade ciphertext]
//! ```
//! The signature is HMAC-SHA256 over the whole envelope under a signing key
//! that is independent of the encryption secret. Decryption only starts once
//! the signature has verified.

use secrecy::SecretSlice;

use crate::cascade;
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{derive_key, generate_salt};
use crate::options::CodecOptions;
use crate::sign::{sign, verify};
use crate::{encoding::TextEncoding, SALT_SIZE};

/// Text-encoded envelope plus its detached signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedData {
    pub envelope: String,
    pub signature: String,
}

/// Encrypt `plaintext` into a salted, signed envelope.
///
/// A fresh salt is drawn per call; with `opts.slow_kdf` the key is derived via
/// Argon2id over `(secret, salt)`, otherwise `secret` is the key.
pub fn encrypt_data(
    plaintext: &[u8],
    secret: &SecretSlice<u8>,
    sign_key: &SecretSlice<u8>,
    opts: &CodecOptions,
) -> CryptoResult<SealedData> {
    let salt = generate_salt();
    let key = derive_key(&salt, opts.slow_kdf, secret, &opts.kdf)?;
    let ciphertext = cascade::encrypt(plaintext, &key)?;

    let mut envelope = Vec::with_capacity(SALT_SIZE + ciphertext.len());
    envelope.extend_from_slice(&salt);
    envelope.extend_from_slice(&ciphertext);

    let signature = sign(&envelope, sign_key);

    tracing::debug!(
        plaintext_len = plaintext.len(),
        envelope_len = envelope.len(),
        slow_kdf = opts.slow_kdf,
        "sealed envelope"
    );

    Ok(SealedData {
        envelope: opts.text_encoding.encode(&envelope),
        signature: opts.text_encoding.encode(&signature),
    })
}

/// Verify the envelope's signature, then decrypt it.
///
/// Fails with `InvalidSignature` (without touching the ciphertext) when the
/// signature does not match, and with `InvalidCiphertext` when the envelope is
/// malformed or does not authenticate under the derived key.
pub fn decrypt_data(
    envelope: &str,
    signature: &str,
    secret: &SecretSlice<u8>,
    sign_key: &SecretSlice<u8>,
    opts: &CodecOptions,
) -> CryptoResult<Vec<u8>> {
    let envelope = opts
        .text_encoding
        .decode(envelope)
        .ok_or(CryptoError::InvalidCiphertext)?;
    let signature = opts
        .text_encoding
        .decode(signature)
        .ok_or(CryptoError::InvalidSignature)?;

    if !verify(&envelope, &signature, sign_key) {
        tracing::debug!(envelope_len = envelope.len(), "envelope signature mismatch");
        return Err(CryptoError::InvalidSignature);
    }

    if envelope.len() < SALT_SIZE {
        return Err(CryptoError::InvalidCiphertext);
    }
    let (salt, ciphertext) = envelope.split_at(SALT_SIZE);
    let salt: &[u8; SALT_SIZE] = salt
        .try_into()
        .map_err(|_| CryptoError::InvalidCiphertext)?;

    let key = derive_key(salt, opts.slow_kdf, secret, &opts.kdf)?;
    let plaintext = cascade::decrypt(ciphertext, &key)?;

    tracing::debug!(plaintext_len = plaintext.len(), "opened envelope");
    Ok(plaintext)
}

/// Check an envelope's signature without decrypting anything.
///
/// Text that fails to decode counts as a mismatch.
pub fn verify_ciphertext(
    envelope: &str,
    signature: &str,
    sign_key: &SecretSlice<u8>,
    encoding: TextEncoding,
) -> bool {
    match (encoding.decode(envelope), encoding.decode(signature)) {
        (Some(envelope), Some(signature)) => verify(&envelope, &signature, sign_key),
        _ => false,
    }
}
