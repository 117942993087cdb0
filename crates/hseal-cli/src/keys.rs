//! Key material from the process environment
//!
//! This is the only place the environment is read; everything below is handed
//! to the engine as explicit parameters.

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hseal_crypto::DerivedKey;
use secrecy::{ExposeSecret, SecretSlice, SecretString};

/// Standard-base64 bytes from `$var`.
pub fn secret_from_env(var: &str) -> Result<SecretSlice<u8>> {
    let text = SecretString::from(
        std::env::var(var).with_context(|| format!("environment variable {var} is not set"))?,
    );
    decode(var, &text).map(SecretSlice::from)
}

/// A raw cipher key (at least 32 bytes) from `$var`.
pub fn key_from_env(var: &str) -> Result<DerivedKey> {
    let text = SecretString::from(
        std::env::var(var).with_context(|| format!("environment variable {var} is not set"))?,
    );
    decode(var, &text).map(DerivedKey::from_bytes)
}

/// Cookie key text from `$var`, left encoded.
pub fn text_from_env(var: &str) -> Result<SecretString> {
    std::env::var(var)
        .map(SecretString::from)
        .with_context(|| format!("environment variable {var} is not set"))
}

fn decode(var: &str, text: &SecretString) -> Result<Vec<u8>> {
    let bytes = STANDARD
        .decode(text.expose_secret().trim())
        .with_context(|| format!("{var} is not valid base64"))?;
    if bytes.is_empty() {
        bail!("{var} is empty");
    }
    Ok(bytes)
}
