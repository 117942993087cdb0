use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Every failure the engine reports.
///
/// Variants never carry key material or plaintext. All of them are fatal to
/// the operation that produced them; callers should reject the input rather
/// than retry with another key or mode.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Structurally too short, or an AEAD layer failed to authenticate.
    #[error("invalid ciphertext")]
    InvalidCiphertext,

    #[error("invalid signature")]
    InvalidSignature,

    /// The cookie text did not decode, or is too short to hold both nonces.
    #[error("invalid cookie")]
    InvalidCookie,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A frame's declared length could not be read in full.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    #[error("digest requested but no HMAC key is enabled")]
    DigestKeyMissing,

    #[error("key derivation failed: {0}")]
    Kdf(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CryptoError {
    /// True for outcomes that mean "this input was not produced by the holder
    /// of the key", as opposed to I/O or configuration problems.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            CryptoError::InvalidCiphertext
                | CryptoError::InvalidSignature
                | CryptoError::InvalidCookie
                | CryptoError::UnexpectedEof
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_failures_classified() {
        assert!(CryptoError::InvalidCiphertext.is_authentication_failure());
        assert!(CryptoError::InvalidSignature.is_authentication_failure());
        assert!(CryptoError::InvalidCookie.is_authentication_failure());
        assert!(!CryptoError::InvalidKey("short".into()).is_authentication_failure());
        assert!(!CryptoError::DigestKeyMissing.is_authentication_failure());
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err: CryptoError = io.into();
        assert!(matches!(err, CryptoError::Io(_)));
        assert!(err.to_string().contains("closed"));
    }
}
