//! Text encodings applied at the outermost boundary of the envelope and cookie codecs

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Encoding of envelope and signature text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// Standard alphabet, padded
    #[default]
    Base64,
    /// URL-safe alphabet, unpadded
    Base64Url,
    Hex,
}

impl TextEncoding {
    pub fn encode(self, data: &[u8]) -> String {
        match self {
            TextEncoding::Base64 => STANDARD.encode(data),
            TextEncoding::Base64Url => URL_SAFE_NO_PAD.encode(data),
            TextEncoding::Hex => hex::encode(data),
        }
    }

    /// `None` when `text` is not valid in this encoding.
    pub fn decode(self, text: &str) -> Option<Vec<u8>> {
        match self {
            TextEncoding::Base64 => STANDARD.decode(text).ok(),
            TextEncoding::Base64Url => URL_SAFE_NO_PAD.decode(text).ok(),
            TextEncoding::Hex => hex::decode(text).ok(),
        }
    }
}

/// Encoding of cookie text. `base64` here means the URL-safe unpadded
/// alphabet, since the value ends up in a header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookieEncoding {
    #[default]
    Base64,
    Hex,
}

impl From<CookieEncoding> for TextEncoding {
    fn from(encoding: CookieEncoding) -> Self {
        match encoding {
            CookieEncoding::Base64 => TextEncoding::Base64Url,
            CookieEncoding::Hex => TextEncoding::Hex,
        }
    }
}
