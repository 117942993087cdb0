//! Framed hybrid streams: AES-256-CTR then ChaCha20-Poly1305 per chunk
//!
//! Frame format (binary), repeated until end of input:
//! ```text
//! [2 bytes: sealed length, big-endian][12 bytes: nonce][sealed length bytes: ciphertext + tag]
//! AAD = frame_index (8 bytes, big-endian)
//! ```
//!
//! Each chunk is first XORed with the AES-256-CTR keystream under the block
//! key (counter block = nonce ‖ 32-bit counter), then sealed with
//! ChaCha20-Poly1305 under the stream key with the same fresh nonce. The two
//! keys are independent, so sharing the nonce across them does not repeat a
//! (key, nonce) pair. The frame index in the AAD rejects reordered frames.
//!
//! Frames carry no end-of-stream marker. Dropping whole trailing frames at a
//! frame boundary therefore decrypts cleanly to a shorter plaintext, with no
//! error. Callers that must detect truncation should keep the digest from
//! [`FramedCodec::digest`] and check it with [`FramedCodec::verify_digest`]
//! before decrypting.
//!
//! The optional detached digest is HMAC-SHA256 over the raw framed bytes.
//! [`FramedCodec::decrypt`] does not consult it.

use std::io::{ErrorKind, Read, Write};

use hmac::Mac;
use secrecy::{ExposeSecret, SecretSlice};
use zeroize::Zeroizing;

use crate::chunked::{read_full, StreamSummary};
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::DerivedKey;
use crate::options::{CodecOptions, DEFAULT_FRAME_CHUNK_SIZE, MAX_FRAME_CHUNK_SIZE};
use crate::primitives::{apply_keystream, random_nonce, stream_open, stream_seal};
use crate::sign::{finish, new_mac, HmacSha256, Signature};
use crate::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};

const LEN_PREFIX_SIZE: usize = 2;
const DIGEST_READ_SIZE: usize = 64 * 1024;

/// A long-lived codec bound to one block key, one stream key and, once
/// [`enable_hmac`](Self::enable_hmac) is called, one digest key.
pub struct FramedCodec {
    block_key: Zeroizing<[u8; KEY_SIZE]>,
    stream_key: Zeroizing<[u8; KEY_SIZE]>,
    hmac_key: Option<Zeroizing<Vec<u8>>>,
    chunk_size: usize,
}

impl FramedCodec {
    /// Codec with the default 16 KiB chunk size.
    pub fn new(block_key: &DerivedKey, stream_key: &DerivedKey) -> CryptoResult<Self> {
        Self::build(block_key, stream_key, DEFAULT_FRAME_CHUNK_SIZE)
    }

    /// Codec with the chunk size from `opts.frame_chunk_size`.
    pub fn with_options(
        block_key: &DerivedKey,
        stream_key: &DerivedKey,
        opts: &CodecOptions,
    ) -> CryptoResult<Self> {
        opts.validate()?;
        Self::build(block_key, stream_key, opts.frame_chunk_size)
    }

    fn build(
        block_key: &DerivedKey,
        stream_key: &DerivedKey,
        chunk_size: usize,
    ) -> CryptoResult<Self> {
        if chunk_size == 0 || chunk_size > MAX_FRAME_CHUNK_SIZE {
            return Err(CryptoError::Config(format!(
                "frame chunk size must be between 1 and {MAX_FRAME_CHUNK_SIZE}"
            )));
        }
        Ok(Self {
            block_key: Zeroizing::new(*block_key.cipher_key()?),
            stream_key: Zeroizing::new(*stream_key.cipher_key()?),
            hmac_key: None,
            chunk_size,
        })
    }

    /// Attach the key used by [`digest`](Self::digest) and
    /// [`verify_digest`](Self::verify_digest). Replaces any earlier key.
    pub fn enable_hmac(&mut self, hmac_key: &SecretSlice<u8>) {
        self.hmac_key = Some(Zeroizing::new(hmac_key.expose_secret().to_vec()));
    }

    pub fn hmac_enabled(&self) -> bool {
        self.hmac_key.is_some()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Encrypt `input` into a sequence of frames. Empty input yields no frames.
    pub fn encrypt<R: Read, W: Write>(
        &self,
        mut input: R,
        mut output: W,
    ) -> CryptoResult<StreamSummary> {
        let mut summary = StreamSummary::default();
        let mut buf = vec![0u8; self.chunk_size];

        loop {
            let n = read_full(&mut input, &mut buf)?;
            if n == 0 {
                break;
            }

            let nonce = random_nonce::<NONCE_SIZE>();
            let mut chunk = Zeroizing::new(buf[..n].to_vec());
            apply_keystream(&self.block_key, &nonce, &mut chunk)?;
            let sealed = stream_seal(
                &self.stream_key,
                &nonce,
                &chunk,
                &summary.chunks.to_be_bytes(),
            )?;

            // chunk_size <= MAX_FRAME_CHUNK_SIZE keeps this within u16.
            let len = u16::try_from(sealed.len())
                .map_err(|_| CryptoError::Config("frame exceeds 65535 bytes".into()))?;
            output.write_all(&len.to_be_bytes())?;
            output.write_all(&nonce)?;
            output.write_all(&sealed)?;

            summary.chunks += 1;
            summary.plaintext_bytes += n as u64;
            summary.ciphertext_bytes += (LEN_PREFIX_SIZE + NONCE_SIZE + sealed.len()) as u64;

            if n < buf.len() {
                break;
            }
        }
        output.flush()?;

        tracing::debug!(
            frames = summary.chunks,
            plaintext_bytes = summary.plaintext_bytes,
            "encrypted framed stream"
        );
        Ok(summary)
    }

    /// Decrypt frames from `input`, writing each chunk's plaintext as soon as
    /// it authenticates.
    ///
    /// Clean end of input between frames ends the stream. Input that stops
    /// inside a frame fails with `UnexpectedEof`; a frame that does not open
    /// fails with `InvalidCiphertext`.
    pub fn decrypt<R: Read, W: Write>(
        &self,
        mut input: R,
        mut output: W,
    ) -> CryptoResult<StreamSummary> {
        let mut summary = StreamSummary::default();
        let mut sealed = Vec::new();

        loop {
            let mut len_buf = [0u8; LEN_PREFIX_SIZE];
            match read_full(&mut input, &mut len_buf)? {
                0 => break,
                LEN_PREFIX_SIZE => {}
                _ => return Err(CryptoError::UnexpectedEof),
            }
            let len = u16::from_be_bytes(len_buf) as usize;

            let mut nonce = [0u8; NONCE_SIZE];
            read_exact_frame(&mut input, &mut nonce)?;
            sealed.resize(len, 0);
            read_exact_frame(&mut input, &mut sealed)?;

            if len < TAG_SIZE {
                return Err(CryptoError::InvalidCiphertext);
            }

            let mut chunk = Zeroizing::new(
                stream_open(
                    &self.stream_key,
                    &nonce,
                    &sealed,
                    &summary.chunks.to_be_bytes(),
                )
                .inspect_err(|_| {
                    tracing::debug!(frame = summary.chunks, "frame failed to authenticate");
                })?,
            );
            apply_keystream(&self.block_key, &nonce, &mut chunk)?;
            output.write_all(&chunk)?;

            summary.chunks += 1;
            summary.plaintext_bytes += chunk.len() as u64;
            summary.ciphertext_bytes += (LEN_PREFIX_SIZE + NONCE_SIZE + len) as u64;
        }
        output.flush()?;

        tracing::debug!(
            frames = summary.chunks,
            plaintext_bytes = summary.plaintext_bytes,
            "decrypted framed stream"
        );
        Ok(summary)
    }

    /// HMAC-SHA256 over every byte of `input` under the key from
    /// [`enable_hmac`](Self::enable_hmac).
    pub fn digest<R: Read>(&self, input: R) -> CryptoResult<Signature> {
        Ok(finish(self.mac_over(input)?))
    }

    /// Recompute the digest of `input` and compare it with `expected` in
    /// constant time.
    pub fn verify_digest<R: Read>(&self, input: R, expected: &[u8]) -> CryptoResult<bool> {
        Ok(self.mac_over(input)?.verify_slice(expected).is_ok())
    }

    fn mac_over<R: Read>(&self, mut input: R) -> CryptoResult<HmacSha256> {
        let key = self.hmac_key.as_ref().ok_or(CryptoError::DigestKeyMissing)?;
        let mut mac = new_mac(key);

        let mut buf = vec![0u8; DIGEST_READ_SIZE];
        loop {
            let n = read_full(&mut input, &mut buf)?;
            mac.update(&buf[..n]);
            if n < buf.len() {
                break;
            }
        }
        Ok(mac)
    }
}

impl std::fmt::Debug for FramedCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramedCodec")
            .field("keys", &"[REDACTED]")
            .field("hmac_enabled", &self.hmac_enabled())
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

fn read_exact_frame<R: Read>(input: &mut R, buf: &mut [u8]) -> CryptoResult<()> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => CryptoError::UnexpectedEof,
        _ => CryptoError::Io(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::generate_key;
    use std::io::Cursor;

    fn codec(chunk_size: usize) -> FramedCodec {
        let opts = CodecOptions {
            frame_chunk_size: chunk_size,
            ..CodecOptions::default()
        };
        FramedCodec::with_options(&generate_key(), &generate_key(), &opts).unwrap()
    }

    fn seal(codec: &FramedCodec, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        codec.encrypt(Cursor::new(data), &mut out).unwrap();
        out
    }

    fn open(codec: &FramedCodec, data: &[u8]) -> CryptoResult<Vec<u8>> {
        let mut out = Vec::new();
        codec.decrypt(Cursor::new(data), &mut out)?;
        Ok(out)
    }

    #[test]
    fn test_roundtrip_various_sizes() {
        let c = codec(32);
        for len in [0usize, 1, 31, 32, 33, 64, 100] {
            let data: Vec<u8> = (0..len).map(|i| i as u8).collect();
            assert_eq!(open(&c, &seal(&c, &data)).unwrap(), data, "len {len}");
        }
    }

    #[test]
    fn test_frame_layout() {
        let c = codec(10);
        let framed = seal(&c, &[0u8; 25]);

        // 10 + 10 + 5 plaintext bytes → three frames
        let frame = |pt: usize| LEN_PREFIX_SIZE + NONCE_SIZE + pt + TAG_SIZE;
        assert_eq!(framed.len(), frame(10) * 2 + frame(5));
        assert_eq!(u16::from_be_bytes([framed[0], framed[1]]) as usize, 10 + TAG_SIZE);
    }

    #[test]
    fn test_block_key_participates() {
        // Same stream key, different block key: the AEAD opens but the
        // keystream does not cancel.
        let stream_key = generate_key();
        let a = FramedCodec::new(&generate_key(), &stream_key).unwrap();
        let b = FramedCodec::new(&generate_key(), &stream_key).unwrap();

        let framed = seal(&a, b"known plaintext");
        let opened = open(&b, &framed).unwrap();
        assert_ne!(opened, b"known plaintext");
    }

    #[test]
    fn test_empty_input_is_empty_stream() {
        let c = codec(16);
        assert!(seal(&c, b"").is_empty());
        assert!(open(&c, b"").unwrap().is_empty());
    }

    #[test]
    fn test_truncation_is_unexpected_eof() {
        let c = codec(16);
        let framed = seal(&c, &[7u8; 40]);

        // Cut inside the length prefix, nonce, and ciphertext of the last frame.
        let first = LEN_PREFIX_SIZE + NONCE_SIZE + 16 + TAG_SIZE;
        for cut in [1, first + 1, first + 5, framed.len() - 1] {
            assert!(
                matches!(open(&c, &framed[..cut]), Err(CryptoError::UnexpectedEof)),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn test_tampering_rejected() {
        let c = codec(16);
        let framed = seal(&c, b"tamper with any byte after the length prefix");
        for i in LEN_PREFIX_SIZE..framed.len() {
            let mut bad = framed.clone();
            bad[i] ^= 0x10;
            assert!(open(&c, &bad).is_err(), "byte {i}");
        }
    }

    #[test]
    fn test_reordered_frames_rejected() {
        let c = codec(8);
        let framed = seal(&c, &[1u8; 16]);
        let half = framed.len() / 2;
        let mut swapped = framed[half..].to_vec();
        swapped.extend_from_slice(&framed[..half]);
        assert!(matches!(open(&c, &swapped), Err(CryptoError::InvalidCiphertext)));
    }

    #[test]
    fn test_wrong_keys_rejected() {
        let framed = seal(&codec(16), b"secret");
        assert!(matches!(
            open(&codec(16), &framed),
            Err(CryptoError::InvalidCiphertext)
        ));
    }

    #[test]
    fn test_short_declared_length() {
        let c = codec(16);
        let mut frame = vec![0u8, 3];
        frame.extend_from_slice(&[0u8; NONCE_SIZE + 3]);
        assert!(matches!(open(&c, &frame), Err(CryptoError::InvalidCiphertext)));
    }

    #[test]
    fn test_digest_requires_key() {
        let c = codec(16);
        assert!(matches!(
            c.digest(Cursor::new(b"x")),
            Err(CryptoError::DigestKeyMissing)
        ));
    }

    #[test]
    fn test_digest_detects_changes() {
        let mut c = codec(16);
        c.enable_hmac(&SecretSlice::from(b"digest key".to_vec()));
        assert!(c.hmac_enabled());

        let framed = seal(&c, &[3u8; 100]);
        let digest = c.digest(Cursor::new(&framed)).unwrap();
        assert!(c.verify_digest(Cursor::new(&framed), &digest).unwrap());

        let mut bad = framed.clone();
        bad[50] ^= 1;
        assert!(!c.verify_digest(Cursor::new(&bad), &digest).unwrap());
        assert_ne!(c.digest(Cursor::new(&bad)).unwrap(), digest);
    }

    #[test]
    fn test_dropped_trailing_frame_only_caught_by_digest() {
        let mut c = codec(16);
        c.enable_hmac(&SecretSlice::from(b"digest key".to_vec()));
        let framed = seal(&c, &[4u8; 48]);
        let digest = c.digest(Cursor::new(&framed)).unwrap();

        let frame_len = LEN_PREFIX_SIZE + NONCE_SIZE + 16 + TAG_SIZE;
        let truncated = &framed[..framed.len() - frame_len];
        assert_eq!(open(&c, truncated).unwrap(), vec![4u8; 32]);
        assert!(!c.verify_digest(Cursor::new(truncated), &digest).unwrap());
    }

    #[test]
    fn test_digest_matches_one_shot_hmac() {
        let mut c = codec(16);
        let key = SecretSlice::from(b"k".to_vec());
        c.enable_hmac(&key);
        let data = vec![9u8; DIGEST_READ_SIZE * 2 + 17];
        assert_eq!(
            c.digest(Cursor::new(&data)).unwrap(),
            crate::sign::sign(&data, &key)
        );
    }

    #[test]
    fn test_chunk_size_bounds() {
        let (a, b) = (generate_key(), generate_key());
        for bad in [0, MAX_FRAME_CHUNK_SIZE + 1] {
            let opts = CodecOptions {
                frame_chunk_size: bad,
                ..CodecOptions::default()
            };
            assert!(matches!(
                FramedCodec::with_options(&a, &b, &opts),
                Err(CryptoError::Config(_))
            ));
        }

        let c = codec(MAX_FRAME_CHUNK_SIZE);
        let data = vec![5u8; MAX_FRAME_CHUNK_SIZE + 1];
        let framed = seal(&c, &data);
        assert_eq!(u16::from_be_bytes([framed[0], framed[1]]), u16::MAX);
        assert_eq!(open(&c, &framed).unwrap(), data);
    }

    #[test]
    fn test_short_keys_rejected() {
        let short = DerivedKey::from_bytes(vec![0u8; 8]);
        assert!(matches!(
            FramedCodec::new(&short, &generate_key()),
            Err(CryptoError::InvalidKey(_))
        ));
    }
}
