//! Single-shot two-layer cascade
//!
//! Cascade format (binary):
//! ```text
//! [12 bytes: outer nonce] ChaCha20-Poly1305(
//!     [12 bytes: inner nonce] AES-256-GCM(plaintext) [16-byte tag]
//! ) [16-byte tag]
//! ```
//!
//! AES-256-GCM is always the inner layer and ChaCha20-Poly1305 the outer one.
//! Both layers run under the same 256-bit key with independent random nonces.

use crate::error::CryptoResult;
use crate::kdf::DerivedKey;
use crate::primitives::{open_block_layer, open_stream_layer, seal_block_layer, seal_stream_layer};

/// Encrypt `plaintext` through both layers.
///
/// Returns `[outer nonce][outer ciphertext + tag]`, `CASCADE_OVERHEAD` (56)
/// bytes longer than the input.
pub fn encrypt(plaintext: &[u8], key: &DerivedKey) -> CryptoResult<Vec<u8>> {
    let key = key.cipher_key()?;
    let inner = seal_block_layer(key, plaintext)?;
    seal_stream_layer(key, &inner)
}

/// Strip the outer ChaCha20-Poly1305 layer, then the inner AES-256-GCM layer.
///
/// Fails with `InvalidCiphertext` when either layer is shorter than nonce + tag
/// or does not authenticate.
pub fn decrypt(ciphertext: &[u8], key: &DerivedKey) -> CryptoResult<Vec<u8>> {
    let key = key.cipher_key()?;
    let inner = open_stream_layer(key, ciphertext)?;
    open_block_layer(key, &inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CryptoError;
    use crate::kdf::generate_key;
    use crate::{CASCADE_OVERHEAD, NONCE_SIZE, TAG_SIZE};
    use proptest::prelude::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = generate_key();
        let plaintext = b"hello, cascaded world!";

        let encrypted = encrypt(plaintext, &key).unwrap();
        let decrypted = decrypt(&encrypted, &key).unwrap();

        assert_eq!(&decrypted, plaintext);
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let key = generate_key();
        let encrypted = encrypt(b"", &key).unwrap();
        assert_eq!(encrypted.len(), CASCADE_OVERHEAD);
        assert_eq!(decrypt(&encrypted, &key).unwrap(), b"");
    }

    #[test]
    fn test_encrypted_size() {
        let key = generate_key();
        let encrypted = encrypt(&[0u8; 1000], &key).unwrap();

        // outer nonce (12) + inner nonce (12) + plaintext (1000) + 2 tags (32)
        assert_eq!(encrypted.len(), 1000 + 2 * (NONCE_SIZE + TAG_SIZE));
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let encrypted = encrypt(b"secret data", &generate_key()).unwrap();
        assert!(matches!(
            decrypt(&encrypted, &generate_key()),
            Err(CryptoError::InvalidCiphertext)
        ));
    }

    #[test]
    fn test_short_ciphertext_rejected_at_each_layer() {
        let key = generate_key();
        for len in 0..NONCE_SIZE + TAG_SIZE {
            assert!(matches!(
                decrypt(&vec![0u8; len], &key),
                Err(CryptoError::InvalidCiphertext)
            ));
        }

        // A valid outer layer wrapping an inner layer that is too short.
        let outer_only = seal_stream_layer(key.cipher_key().unwrap(), &[1u8; 5]).unwrap();
        assert!(matches!(
            decrypt(&outer_only, &key),
            Err(CryptoError::InvalidCiphertext)
        ));
    }

    #[test]
    fn test_short_key_rejected() {
        let key = DerivedKey::from_bytes(vec![1u8; 16]);
        assert!(matches!(encrypt(b"x", &key), Err(CryptoError::InvalidKey(_))));
    }

    #[test]
    fn test_fresh_nonces_per_call() {
        let key = generate_key();
        let a = encrypt(b"same", &key).unwrap();
        let b = encrypt(b"same", &key).unwrap();
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn roundtrip_any_plaintext(data in proptest::collection::vec(any::<u8>(), 0..=2048)) {
            let key = generate_key();
            let encrypted = encrypt(&data, &key).unwrap();
            prop_assert_eq!(encrypted.len(), data.len() + CASCADE_OVERHEAD);
            prop_assert_eq!(decrypt(&encrypted, &key).unwrap(), data);
        }

        #[test]
        fn any_bit_flip_is_rejected(
            data in proptest::collection::vec(any::<u8>(), 0..=256),
            pos in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let key = generate_key();
            let mut encrypted = encrypt(&data, &key).unwrap();
            let i = pos.index(encrypted.len());
            encrypted[i] ^= 1 << bit;
            prop_assert!(decrypt(&encrypted, &key).is_err());
        }
    }
}
