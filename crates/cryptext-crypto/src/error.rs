use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors raised inside the cryptographic core.
///
/// Most of these never reach a message recipient directly: the envelope and
/// the seal/open pipeline fold every per-message failure into
/// [`DecryptError::Failed`] / [`crate::session::OpenError::Failed`].
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key for {algorithm}: expected {expected} bytes, got {actual}")]
    InvalidKey {
        algorithm: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("cascade sub-ciphers disagree on block size: {first} vs {other}")]
    BlockSizeMismatch { first: usize, other: usize },

    #[error("{0} used before init")]
    NotInitialized(&'static str),

    #[error("data length {actual} is not valid here (block size {block_size})")]
    DataLength { actual: usize, block_size: usize },

    #[error("bad padding")]
    BadPadding,

    #[error("envelope too short: {0} bytes")]
    Truncated(usize),

    #[error("unknown message type byte 0x{0:02x}")]
    UnknownMessageType(u8),

    #[error("empty payload")]
    EmptyPayload,

    #[error("{kind} payload must have an empty body, got {len} bytes")]
    UnexpectedBody { kind: &'static str, len: usize },

    #[error("{0} is not implemented")]
    Unimplemented(&'static str),

    #[error("invalid Base61 symbol {symbol:?} at position {position}")]
    InvalidSymbol { symbol: char, position: usize },

    #[error("invalid Base61 group of {0} symbols")]
    InvalidGroup(usize),

    #[error("base64 decode: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("compression: {0}")]
    Compression(#[from] std::io::Error),

    #[error("decompressed body exceeds {0} bytes")]
    TooLarge(usize),

    #[error("payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("key derivation: {0}")]
    Kdf(String),
}

/// Outcome of a failed envelope decryption.
///
/// `Failed` deliberately covers malformed input, tampering and wrong keys
/// alike. Do not split it.
#[derive(Debug, Error)]
pub enum DecryptError {
    #[error("decryption failed")]
    Failed,

    /// Programmer or configuration error: the supplied key cannot be used
    /// with this engine family at all.
    #[error(transparent)]
    Config(CryptoError),
}
