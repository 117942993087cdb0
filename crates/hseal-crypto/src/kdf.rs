//! Key derivation: secret + salt → cipher key, fast path or Argon2id

use argon2::{Algorithm, Argon2, Params, Version};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretSlice};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::{KEY_SIZE, SALT_SIZE};

/// Symmetric key material handed to the AEAD layers.
///
/// On the fast path this is the caller's secret verbatim, so its length is
/// whatever the caller supplied; [`DerivedKey::cipher_key`] enforces the
/// 32-byte minimum. Zeroized on drop.
#[derive(Clone)]
pub struct DerivedKey {
    bytes: Vec<u8>,
}

impl DerivedKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The 256-bit key the ciphers run under: the leading 32 bytes.
    pub fn cipher_key(&self) -> CryptoResult<&[u8; KEY_SIZE]> {
        self.bytes
            .get(..KEY_SIZE)
            .and_then(|k| k.try_into().ok())
            .ok_or_else(|| {
                CryptoError::InvalidKey(format!(
                    "key is {} bytes, at least {KEY_SIZE} required",
                    self.bytes.len()
                ))
            })
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("len", &self.bytes.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Argon2id cost profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 1)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 1,
            parallelism: 4,
        }
    }
}

/// Derive the cipher key for one operation.
///
/// With `use_slow_path == false` the secret is returned unchanged and `salt`
/// is ignored. Otherwise Argon2id runs over `(secret, salt)` with `params`
/// and yields 32 bytes.
pub fn derive_key(
    salt: &[u8; SALT_SIZE],
    use_slow_path: bool,
    secret: &SecretSlice<u8>,
    params: &KdfParams,
) -> CryptoResult<DerivedKey> {
    if !use_slow_path {
        return Ok(DerivedKey::from_bytes(secret.expose_secret().to_vec()));
    }

    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| CryptoError::Kdf(format!("invalid Argon2id params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = vec![0u8; KEY_SIZE];
    argon2
        .hash_password_into(secret.expose_secret(), salt, &mut key)
        .map_err(|e| CryptoError::Kdf(format!("Argon2id failed: {e}")))?;

    tracing::trace!(
        mem_cost_kib = params.mem_cost_kib,
        time_cost = params.time_cost,
        "derived key via Argon2id"
    );
    Ok(DerivedKey::from_bytes(key))
}

/// Fresh random salt for one single-shot or stream operation.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Generate a random 256-bit key.
pub fn generate_key() -> DerivedKey {
    let mut bytes = vec![0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    DerivedKey::from_bytes(bytes)
}

/// Standard base64 form of a key, as the cookie codec expects it.
pub fn encode_key(key: &DerivedKey) -> String {
    STANDARD.encode(key.as_bytes())
}
