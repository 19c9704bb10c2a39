//! Tagged message payloads
//!
//! The plaintext placed inside an envelope is one type byte followed by a
//! body whose meaning the type byte fixes:
//!
//! | Type             | Byte   | Body                         |
//! | --               | --     | --                           |
//! | `Plaintext`      | `0x00` | UTF-8 text                   |
//! | `GzipPlaintext`  | `0x01` | gzip stream of UTF-8 text    |
//! | `KeyReplacement` | `0x02` | reserved, not implemented    |
//! | `KeyRevoke`      | `0x03` | empty                        |
//!
//! Text is gzip-compressed only when that is strictly smaller than the raw
//! UTF-8 bytes.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};

/// Upper bound on an inflated GZIP body (16 MiB).
pub const MAX_UNPACKED_SIZE: usize = 16 * 1024 * 1024;

/// Default gzip level
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Plaintext = 0x00,
    GzipPlaintext = 0x01,
    KeyReplacement = 0x02,
    KeyRevoke = 0x03,
}

impl MessageType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MessageType {
    type Error = CryptoError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Plaintext),
            0x01 => Ok(Self::GzipPlaintext),
            0x02 => Ok(Self::KeyReplacement),
            0x03 => Ok(Self::KeyRevoke),
            other => Err(CryptoError::UnknownMessageType(other)),
        }
    }
}

/// A decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    /// The sender has revoked the key this payload was encrypted with.
    KeyRevoked,
}

/// Packs text into tagged payloads.
#[derive(Debug, Clone)]
pub struct Packer {
    level: u32,
}

impl Default for Packer {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}

impl Packer {
    /// `level` is a gzip level, 0..=9.
    pub fn new(level: u32) -> Self {
        Self { level: level.min(9) }
    }

    /// Tag `text` as plaintext or gzip, whichever is strictly smaller.
    pub fn pack(&self, text: &str) -> CryptoResult<Zeroizing<Vec<u8>>> {
        let raw = text.as_bytes();
        let compressed = Zeroizing::new(self.gzip(raw)?);

        let (kind, body): (MessageType, &[u8]) = if compressed.len() < raw.len() {
            (MessageType::GzipPlaintext, compressed.as_slice())
        } else {
            (MessageType::Plaintext, raw)
        };
        tracing::debug!(
            kind = ?kind,
            raw = raw.len(),
            compressed = compressed.len(),
            "packed message"
        );

        let mut out = Zeroizing::new(Vec::with_capacity(1 + body.len()));
        out.push(kind.as_u8());
        out.extend_from_slice(body);
        Ok(out)
    }

    /// Payload announcing that the encrypting key is revoked.
    pub fn pack_revocation(&self) -> Vec<u8> {
        vec![MessageType::KeyRevoke.as_u8()]
    }

    /// Key replacement is reserved in the format but has no body layout yet.
    pub fn pack_key_replacement(&self) -> CryptoResult<Vec<u8>> {
        Err(CryptoError::Unimplemented("key replacement"))
    }

    fn gzip(&self, raw: &[u8]) -> CryptoResult<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(raw)?;
        Ok(encoder.finish()?)
    }
}

/// Interpret a tagged payload.
///
/// Unknown type bytes and undecodable bodies are errors. A key-replacement
/// payload fails with [`CryptoError::Unimplemented`], never as another type.
pub fn unpack(payload: &[u8]) -> CryptoResult<Message> {
    let (&tag, body) = payload.split_first().ok_or(CryptoError::EmptyPayload)?;
    match MessageType::try_from(tag)? {
        MessageType::Plaintext => Ok(Message::Text(String::from_utf8(body.to_vec())?)),
        MessageType::GzipPlaintext => {
            let raw = gunzip(body)?;
            Ok(Message::Text(String::from_utf8(raw)?))
        }
        MessageType::KeyRevoke if body.is_empty() => Ok(Message::KeyRevoked),
        MessageType::KeyRevoke => Err(CryptoError::UnexpectedBody {
            kind: "key revocation",
            len: body.len(),
        }),
        MessageType::KeyReplacement => Err(CryptoError::Unimplemented("key replacement")),
    }
}

fn gunzip(body: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(body)
        .take(MAX_UNPACKED_SIZE as u64 + 1)
        .read_to_end(&mut out)?;
    if out.len() > MAX_UNPACKED_SIZE {
        return Err(CryptoError::TooLarge(MAX_UNPACKED_SIZE));
    }
    Ok(out)
}
