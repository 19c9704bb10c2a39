//! Seal/open pipeline
//!
//! ```text
//! seal: text → pack → envelope → base64url | Base61 → [link wrap]
//! open: input → unwrap → decode (each encoding) → envelope (each key) → unpack
//! ```
//!
//! Stored keys are keysets and use the keyset envelope. Passwords derive a
//! single cascade key and use the salted envelope.

use secrecy::SecretString;
use thiserror::Error;

use crate::envelope::CascadeEnvelope;
use crate::error::{CryptoError, CryptoResult, DecryptError};
use crate::kdf::{derive_password_key, KdfParams, PasswordMode};
use crate::keys::{Keyset, SecretKey};
use crate::packer::{unpack, Message, Packer};
use crate::transport::{unwrap_url, wrap_url, TextEncoding, DEFAULT_URL_PREFIX};

/// Failure to open a message.
#[derive(Debug, Error)]
pub enum OpenError {
    /// No candidate key opened the input. Malformed text, tampering and wrong
    /// keys are not told apart.
    #[error("message could not be decrypted with any available key")]
    Failed,

    /// The message authenticated but uses a feature this build lacks.
    #[error("message uses an unsupported feature: {0}")]
    Unsupported(&'static str),

    /// Programmer or configuration error, such as a key of the wrong length.
    #[error(transparent)]
    Config(CryptoError),
}

/// How sealed messages are rendered as text.
#[derive(Debug, Clone)]
pub struct SealOptions {
    pub encoding: TextEncoding,
    pub wrap_url: bool,
    pub url_prefix: String,
    pub compression_level: u32,
}

impl Default for SealOptions {
    fn default() -> Self {
        Self {
            encoding: TextEncoding::Base64Url,
            wrap_url: true,
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
            compression_level: crate::packer::DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

/// Password derivation settings for password-sealed messages.
#[derive(Debug, Clone, Default)]
pub struct PasswordParams {
    pub mode: PasswordMode,
    pub kdf: KdfParams,
}

/// A successfully opened message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opened {
    /// Identifier of the key that verified the message.
    pub key_id: String,
    pub message: Message,
}

impl Opened {
    /// Text to show the recipient. A revocation names the revoked key.
    pub fn display_text(&self) -> String {
        match &self.message {
            Message::Text(text) => text.clone(),
            Message::KeyRevoked => format!(
                "[key '{}' has been revoked by its owner; stop using it]",
                self.key_id
            ),
        }
    }
}

/// Seal `text` under a stored keyset.
pub fn seal_text(text: &str, keys: &Keyset, opts: &SealOptions) -> CryptoResult<String> {
    let payload = Packer::new(opts.compression_level).pack(text)?;
    let sealed = CascadeEnvelope::cascade().encrypt(&payload, keys)?;
    Ok(render(&sealed, opts))
}

/// Seal a revocation notice for `keys`.
pub fn seal_revocation(keys: &Keyset, opts: &SealOptions) -> CryptoResult<String> {
    let payload = Packer::new(opts.compression_level).pack_revocation();
    let sealed = CascadeEnvelope::cascade().encrypt(&payload, keys)?;
    Ok(render(&sealed, opts))
}

/// Seal `text` under a password-derived key.
pub fn seal_with_password(
    text: &str,
    password: &SecretString,
    params: &PasswordParams,
    opts: &SealOptions,
) -> CryptoResult<String> {
    let key = derive_password_key(password, params.mode, &params.kdf);
    let payload = Packer::new(opts.compression_level).pack(text)?;
    let sealed = CascadeEnvelope::cascade().encrypt_salted(&payload, &key)?;
    Ok(render(&sealed, opts))
}

/// Open `input` with the first candidate keyset that verifies it.
///
/// Candidates are `(key id, keyset)` pairs, tried in order for every
/// transport decoding of the input.
pub fn open_text<'a, I>(input: &str, candidates: I, url_prefix: &str) -> Result<Opened, OpenError>
where
    I: IntoIterator<Item = (&'a str, &'a Keyset)>,
{
    let candidates: Vec<(&str, &Keyset)> = candidates.into_iter().collect();
    let envelope = CascadeEnvelope::cascade();

    for sealed in decodings(input, url_prefix) {
        for &(key_id, keys) in &candidates {
            match envelope.decrypt(&sealed, keys) {
                Ok(payload) => {
                    tracing::debug!(key_id, "message verified");
                    return finish(key_id, &payload);
                }
                Err(DecryptError::Failed) => continue,
                Err(DecryptError::Config(e)) => return Err(OpenError::Config(e)),
            }
        }
    }
    tracing::debug!(candidates = candidates.len(), "no candidate key verified");
    Err(OpenError::Failed)
}

/// Open a password-sealed message.
pub fn open_with_password(
    input: &str,
    password: &SecretString,
    params: &PasswordParams,
    url_prefix: &str,
) -> Result<Opened, OpenError> {
    let key = derive_password_key(password, params.mode, &params.kdf);
    open_with_key(input, &key, url_prefix)
}

/// Open a salted-envelope message with an already derived key.
pub fn open_with_key(input: &str, key: &SecretKey, url_prefix: &str) -> Result<Opened, OpenError> {
    let envelope = CascadeEnvelope::cascade();
    for sealed in decodings(input, url_prefix) {
        match envelope.decrypt_salted(&sealed, key) {
            Ok(payload) => return finish("password", &payload),
            Err(DecryptError::Failed) => continue,
            Err(DecryptError::Config(e)) => return Err(OpenError::Config(e)),
        }
    }
    Err(OpenError::Failed)
}

fn render(sealed: &[u8], opts: &SealOptions) -> String {
    let token = opts.encoding.encode(sealed);
    if opts.wrap_url {
        wrap_url(&opts.url_prefix, &token)
    } else {
        token
    }
}

/// Every distinct byte string the input decodes to.
fn decodings(input: &str, url_prefix: &str) -> Vec<Vec<u8>> {
    let token = unwrap_url(url_prefix, input);
    let mut out: Vec<Vec<u8>> = Vec::new();
    for encoding in TextEncoding::ALL {
        match encoding.decode(&token) {
            Ok(bytes) if !out.contains(&bytes) => {
                tracing::trace!(?encoding, len = bytes.len(), "candidate decoding");
                out.push(bytes);
            }
            Ok(_) => {}
            Err(e) => tracing::trace!(?encoding, "not decodable: {e}"),
        }
    }
    out
}

fn finish(key_id: &str, payload: &[u8]) -> Result<Opened, OpenError> {
    match unpack(payload) {
        Ok(message) => Ok(Opened {
            key_id: key_id.to_string(),
            message,
        }),
        Err(CryptoError::Unimplemented(feature)) => Err(OpenError::Unsupported(feature)),
        Err(_) => Err(OpenError::Failed),
    }
}
