//! Detached HMAC-SHA256 signatures

use hmac::digest::{Key, KeyInit};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretSlice};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::SIGNATURE_SIZE;

/// SHA-256 block size; HMAC keys are normalised to exactly this length.
const BLOCK_SIZE: usize = 64;

pub type HmacSha256 = Hmac<Sha256>;

/// A 256-bit keyed-hash signature.
pub type Signature = [u8; SIGNATURE_SIZE];

/// Start an incremental HMAC under `sign_key`.
///
/// Keys longer than a block are hashed first and shorter ones are
/// zero-padded (RFC 2104), so every key length yields a block-sized key.
pub(crate) fn new_mac(sign_key: &[u8]) -> HmacSha256 {
    let mut block = Zeroizing::new([0u8; BLOCK_SIZE]);
    if sign_key.len() > BLOCK_SIZE {
        block[..SIGNATURE_SIZE].copy_from_slice(&Sha256::digest(sign_key));
    } else {
        block[..sign_key.len()].copy_from_slice(sign_key);
    }
    <HmacSha256 as KeyInit>::new(Key::<HmacSha256>::from_slice(&block[..]))
}

pub(crate) fn finish(mac: HmacSha256) -> Signature {
    let mut output = [0u8; SIGNATURE_SIZE];
    output.copy_from_slice(&mac.finalize().into_bytes());
    output
}

/// HMAC-SHA256 of `data` under `sign_key`.
pub fn sign(data: &[u8], sign_key: &SecretSlice<u8>) -> Signature {
    let mut mac = new_mac(sign_key.expose_secret());
    mac.update(data);
    finish(mac)
}

/// Recompute the signature over `data` and compare it in constant time.
///
/// A signature of the wrong length is rejected without comparing.
pub fn verify(data: &[u8], signature: &[u8], sign_key: &SecretSlice<u8>) -> bool {
    let mut mac = new_mac(sign_key.expose_secret());
    mac.update(data);
    mac.verify_slice(signature).is_ok()
}
