use thiserror::Error;

pub type CryptextResult<T> = Result<T, CryptextError>;

#[derive(Debug, Error)]
pub enum CryptextError {
    #[error("config error: {0}")]
    Config(String),

    #[error("key store error: {0}")]
    Store(String),

    #[error("no key with id or name '{0}'")]
    KeyNotFound(String),

    #[error("key sealing error: {0}")]
    Seal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
