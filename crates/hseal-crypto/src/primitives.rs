//! Primitive adapters: fixed-profile AEAD seal/open and the AES-256-CTR keystream
//!
//! Every `seal_*_layer` helper draws a fresh random nonce and returns
//! `[nonce][ciphertext][16-byte tag]`; the matching `open_*_layer` splits that
//! layout back apart and rejects anything shorter than nonce + tag.

use aes_gcm::aes::cipher::BlockEncrypt;
use aes_gcm::aes::{Aes256, Block};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm,
};
use chacha20poly1305::{aead::Payload, ChaCha20Poly1305, XChaCha20Poly1305, XNonce};
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::{KEY_SIZE, NONCE_SIZE, TAG_SIZE, XNONCE_SIZE};

const AES_BLOCK_SIZE: usize = 16;

/// A fresh random nonce of `N` bytes.
pub fn random_nonce<const N: usize>() -> [u8; N] {
    let mut nonce = [0u8; N];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}

// ── AES-256-GCM (block-AEAD) ─────────────────────────────────────────────────

pub fn block_seal(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> CryptoResult<Vec<u8>> {
    Aes256Gcm::new(key.into())
        .encrypt(nonce.into(), plaintext)
        // Only reachable past the GCM message length limit.
        .map_err(|_| CryptoError::InvalidCiphertext)
}

pub fn block_open(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> CryptoResult<Vec<u8>> {
    Aes256Gcm::new(key.into())
        .decrypt(nonce.into(), ciphertext)
        .map_err(|_| CryptoError::InvalidCiphertext)
}

// ── ChaCha20-Poly1305 (stream-AEAD) ──────────────────────────────────────────

pub fn stream_seal(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    ChaCha20Poly1305::new(key.into())
        .encrypt(nonce.into(), Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::InvalidCiphertext)
}

pub fn stream_open(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    ChaCha20Poly1305::new(key.into())
        .decrypt(nonce.into(), Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::InvalidCiphertext)
}

// ── XChaCha20-Poly1305 (extended-nonce stream-AEAD) ──────────────────────────

pub fn xstream_seal(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; XNONCE_SIZE],
    plaintext: &[u8],
) -> CryptoResult<Vec<u8>> {
    XChaCha20Poly1305::new(key.into())
        .encrypt(XNonce::from_slice(nonce), plaintext)
        .map_err(|_| CryptoError::InvalidCiphertext)
}

pub fn xstream_open(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; XNONCE_SIZE],
    ciphertext: &[u8],
) -> CryptoResult<Vec<u8>> {
    XChaCha20Poly1305::new(key.into())
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::InvalidCiphertext)
}

// ── Nonce-prefixed layers ────────────────────────────────────────────────────

/// AES-256-GCM with a fresh nonce. Returns `[12-byte nonce][ciphertext][tag]`.
pub fn seal_block_layer(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let nonce = random_nonce::<NONCE_SIZE>();
    let ciphertext = block_seal(key, &nonce, plaintext)?;
    Ok(prefix_nonce(&nonce, ciphertext))
}

pub fn open_block_layer(key: &[u8; KEY_SIZE], sealed: &[u8]) -> CryptoResult<Vec<u8>> {
    let (nonce, ciphertext) = split_nonce(sealed)?;
    block_open(key, nonce, ciphertext)
}

/// ChaCha20-Poly1305 with a fresh nonce. Returns `[12-byte nonce][ciphertext][tag]`.
pub fn seal_stream_layer(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let nonce = random_nonce::<NONCE_SIZE>();
    let ciphertext = stream_seal(key, &nonce, plaintext, &[])?;
    Ok(prefix_nonce(&nonce, ciphertext))
}

pub fn open_stream_layer(key: &[u8; KEY_SIZE], sealed: &[u8]) -> CryptoResult<Vec<u8>> {
    let (nonce, ciphertext) = split_nonce(sealed)?;
    stream_open(key, nonce, ciphertext, &[])
}

fn prefix_nonce(nonce: &[u8; NONCE_SIZE], ciphertext: Vec<u8>) -> Vec<u8> {
    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(nonce);
    result.extend_from_slice(&ciphertext);
    result
}

fn split_nonce(sealed: &[u8]) -> CryptoResult<(&[u8; NONCE_SIZE], &[u8])> {
    if sealed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::InvalidCiphertext);
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
    let nonce = nonce
        .try_into()
        .map_err(|_| CryptoError::InvalidCiphertext)?;
    Ok((nonce, ciphertext))
}

// ── AES-256-CTR keystream ────────────────────────────────────────────────────

/// XOR `data` in place with the AES-256-CTR keystream for `(key, nonce)`.
///
/// Counter blocks are `nonce(12) ‖ counter(4, big-endian)` starting at zero.
/// Applying the same keystream twice restores the input. Inputs needing more
/// than 2^32 - 1 blocks are rejected rather than wrapping the counter.
pub(crate) fn apply_keystream(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    data: &mut [u8],
) -> CryptoResult<()> {
    keystream_blocks(data.len())?;

    let cipher = Aes256::new(key.into());
    for (counter, chunk) in (0u32..).zip(data.chunks_mut(AES_BLOCK_SIZE)) {
        let mut block = Block::default();
        block[..NONCE_SIZE].copy_from_slice(nonce);
        block[NONCE_SIZE..].copy_from_slice(&counter.to_be_bytes());
        cipher.encrypt_block(&mut block);
        for (byte, pad) in chunk.iter_mut().zip(block.iter()) {
            *byte ^= pad;
        }
    }
    Ok(())
}

fn keystream_blocks(len: usize) -> CryptoResult<u32> {
    u32::try_from(len.div_ceil(AES_BLOCK_SIZE)).map_err(|_| CryptoError::InvalidCiphertext)
}
