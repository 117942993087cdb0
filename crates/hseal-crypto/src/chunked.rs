//! Chunked streaming: the cascade applied to fixed-size chunks of a stream
//!
//! Stream format (binary):
//! ```text
//! [16 bytes: salt][cascade(chunk 0)][cascade(chunk 1)]…[32 bytes: HMAC-SHA256 trailer]
//! ```
//!
//! Every chunk but the last holds exactly `stream_chunk_size` plaintext bytes,
//! so every ciphertext chunk but the last is `stream_chunk_size + 56` bytes
//! and no per-chunk length is stored. The trailer is a running HMAC under the
//! signing key over the salt and every ciphertext chunk in order.
//!
//! Decryption writes plaintext chunk by chunk as each one authenticates, and
//! only checks the trailer after the last chunk. A chunk that fails its AEAD
//! check aborts immediately, but truncation at a chunk boundary or chunk
//! reordering is only reported by the trailer at end of stream. Callers that
//! must not act on unauthenticated output should buffer it until
//! [`decrypt_stream`] returns `Ok`.

use std::io::{ErrorKind, Read, Write};

use hmac::Mac;
use secrecy::{ExposeSecret, SecretSlice};

use crate::cascade;
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{derive_key, generate_salt, DerivedKey};
use crate::options::CodecOptions;
use crate::sign::{finish, new_mac, HmacSha256};
use crate::{CASCADE_OVERHEAD, SALT_SIZE, SIGNATURE_SIZE};

/// Counters reported by both stream directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub chunks: u64,
    pub plaintext_bytes: u64,
    pub ciphertext_bytes: u64,
}

/// Encrypt everything readable from `input` into `output`.
pub fn encrypt_stream<R: Read, W: Write>(
    mut input: R,
    mut output: W,
    secret: &SecretSlice<u8>,
    sign_key: &SecretSlice<u8>,
    opts: &CodecOptions,
) -> CryptoResult<StreamSummary> {
    opts.validate()?;

    let salt = generate_salt();
    let key = derive_key(&salt, opts.slow_kdf, secret, &opts.kdf)?;
    let mut mac = new_mac(sign_key.expose_secret());

    output.write_all(&salt)?;
    mac.update(&salt);

    let mut summary = StreamSummary {
        ciphertext_bytes: SALT_SIZE as u64,
        ..StreamSummary::default()
    };
    let mut buf = vec![0u8; opts.stream_chunk_size];
    loop {
        let n = read_full(&mut input, &mut buf)?;
        if n == 0 {
            break;
        }

        let chunk = cascade::encrypt(&buf[..n], &key)?;
        output.write_all(&chunk)?;
        mac.update(&chunk);

        summary.chunks += 1;
        summary.plaintext_bytes += n as u64;
        summary.ciphertext_bytes += chunk.len() as u64;

        if n < buf.len() {
            break;
        }
    }

    output.write_all(&finish(mac))?;
    output.flush()?;
    summary.ciphertext_bytes += SIGNATURE_SIZE as u64;

    tracing::debug!(
        chunks = summary.chunks,
        plaintext_bytes = summary.plaintext_bytes,
        "encrypted chunked stream"
    );
    Ok(summary)
}

/// Decrypt a stream produced by [`encrypt_stream`], writing plaintext as each
/// chunk authenticates.
///
/// Returns `InvalidCiphertext` as soon as a chunk fails, or `InvalidSignature`
/// after the full stream has been consumed if the trailer does not match.
pub fn decrypt_stream<R: Read, W: Write>(
    mut input: R,
    mut output: W,
    secret: &SecretSlice<u8>,
    sign_key: &SecretSlice<u8>,
    opts: &CodecOptions,
) -> CryptoResult<StreamSummary> {
    opts.validate()?;

    let mut salt = [0u8; SALT_SIZE];
    input.read_exact(&mut salt).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => CryptoError::InvalidCiphertext,
        _ => CryptoError::Io(e),
    })?;
    let key = derive_key(&salt, opts.slow_kdf, secret, &opts.kdf)?;
    let mut mac = new_mac(sign_key.expose_secret());
    mac.update(&salt);

    let mut summary = StreamSummary {
        ciphertext_bytes: SALT_SIZE as u64,
        ..StreamSummary::default()
    };

    // A full chunk is only consumed once a trailer's worth of bytes follows it,
    // so the trailer never reaches the chunk decryptor.
    let chunk_len = opts
        .stream_chunk_size
        .checked_add(CASCADE_OVERHEAD)
        .ok_or_else(|| CryptoError::Config("stream_chunk_size too large".into()))?;
    let mut window = vec![0u8; chunk_len + SIGNATURE_SIZE];
    let mut filled = read_full(&mut input, &mut window)?;

    while filled == window.len() {
        decrypt_chunk(&window[..chunk_len], &key, &mut mac, &mut output, &mut summary)?;
        window.copy_within(chunk_len.., 0);
        filled = SIGNATURE_SIZE + read_full(&mut input, &mut window[SIGNATURE_SIZE..])?;
    }

    if filled < SIGNATURE_SIZE {
        return Err(CryptoError::InvalidCiphertext);
    }
    let (last, trailer) = window[..filled].split_at(filled - SIGNATURE_SIZE);
    if !last.is_empty() {
        decrypt_chunk(last, &key, &mut mac, &mut output, &mut summary)?;
    }
    output.flush()?;
    summary.ciphertext_bytes += SIGNATURE_SIZE as u64;

    if mac.verify_slice(trailer).is_err() {
        tracing::debug!(chunks = summary.chunks, "chunked stream trailer mismatch");
        return Err(CryptoError::InvalidSignature);
    }

    tracing::debug!(
        chunks = summary.chunks,
        plaintext_bytes = summary.plaintext_bytes,
        "decrypted chunked stream"
    );
    Ok(summary)
}

fn decrypt_chunk<W: Write>(
    chunk: &[u8],
    key: &DerivedKey,
    mac: &mut HmacSha256,
    output: &mut W,
    summary: &mut StreamSummary,
) -> CryptoResult<()> {
    mac.update(chunk);
    let plaintext = cascade::decrypt(chunk, key).inspect_err(|_| {
        tracing::debug!(chunk = summary.chunks, "chunk failed to authenticate");
    })?;
    output.write_all(&plaintext)?;

    summary.chunks += 1;
    summary.plaintext_bytes += plaintext.len() as u64;
    summary.ciphertext_bytes += chunk.len() as u64;
    Ok(())
}

/// Read until `buf` is full or the reader is exhausted; returns bytes read.
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
