//! Text transport for sealed envelopes
//!
//! Envelope bytes become text either as base64url (generic channels) or as
//! Base61 (alphanumeric-only channels such as QR text). The text may then be
//! wrapped as a link, `prefix + text + "/"`, so that chat and mail clients
//! make it clickable.
//!
//! Unwrapping is lenient: the prefix is searched for anywhere in the input,
//! the payload runs to the next `/` or the end, and all whitespace inside it
//! is dropped (mail clients like to hard-wrap long lines). Input without the
//! prefix is treated as a bare token.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use crate::base61;
use crate::error::CryptoResult;

/// Default link prefix
pub const DEFAULT_URL_PREFIX: &str = "cryptext://m/";

/// URL-safe alphabet, unpadded on encode, padding optional on decode.
const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Base64Url,
    Base61,
}

impl TextEncoding {
    pub fn encode(self, data: &[u8]) -> String {
        match self {
            Self::Base64Url => BASE64URL.encode(data),
            Self::Base61 => base61::encode(data),
        }
    }

    pub fn decode(self, text: &str) -> CryptoResult<Vec<u8>> {
        match self {
            Self::Base64Url => Ok(BASE64URL.decode(text)?),
            Self::Base61 => base61::decode(text),
        }
    }

    /// Every encoding, in the order [`crate::session::open_text`] tries them.
    pub const ALL: [TextEncoding; 2] = [TextEncoding::Base64Url, TextEncoding::Base61];
}

/// `prefix + token + "/"`
pub fn wrap_url(prefix: &str, token: &str) -> String {
    format!("{prefix}{token}/")
}

/// Extract the token from arbitrary text.
///
/// With the prefix present, the token is everything after it up to the next
/// `/` (or the end), whitespace removed. Without it, the whole input is the
/// token, whitespace removed.
pub fn unwrap_url(prefix: &str, text: &str) -> String {
    let token = match text.find(prefix) {
        Some(start) if !prefix.is_empty() => {
            let rest = &text[start + prefix.len()..];
            rest.split('/').next().unwrap_or(rest)
        }
        _ => text,
    };
    token.chars().filter(|c| !c.is_whitespace()).collect()
}
