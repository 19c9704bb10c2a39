//! cryptext-crypto: authenticated, compressed, text-transportable messages
//!
//! Pipeline: text → tag + gzip → IV + CBC + CBC-MAC (cascade cipher) → base64url | Base61 → link
//!
//! Key shapes:
//! ```text
//! Cascade key (96 bytes) = AES-256 key || Twofish-256 key || Serpent-256 key
//!
//! Stored key:  shared secret (32 random bytes, Base61 + checksum for QR)
//!   ├── text key (HKDF-SHA256, info="cryptext/text-key") → CBC
//!   └── auth key (HKDF-SHA256, info="cryptext/auth-key") → CBC-MAC
//!
//! Password:    PBKDF2-HMAC-SHA256 → one cascade key for CBC and CBC-MAC (salted envelope)
//! ```

pub mod base61;
pub mod cascade;
pub mod cbc;
pub mod checksum;
pub mod engine;
pub mod envelope;
mod error;
pub mod kdf;
pub mod keys;
pub mod packer;
pub mod rng;
pub mod session;
pub mod transport;

pub use cascade::CascadeCipher;
pub use engine::{BlockCipher, CipherFactory};
pub use envelope::{CascadeEnvelope, Envelope};
pub use error::{CryptoError, CryptoResult, DecryptError};
pub use kdf::{derive_cascade_key, derive_key, derive_password_key, KdfParams, PasswordMode};
pub use keys::{derive_keyset, generate_keyset, generate_secret, Keyset, SecretKey};
pub use packer::{unpack, Message, MessageType, Packer};
pub use session::{
    open_text, open_with_key, open_with_password, seal_revocation, seal_text, seal_with_password,
    OpenError, Opened, PasswordParams, SealOptions,
};
pub use transport::{unwrap_url, wrap_url, TextEncoding, DEFAULT_URL_PREFIX};

/// Cipher block size in bytes (128-bit)
pub const BLOCK_SIZE: usize = 16;

/// Size of one cascade stage key (256-bit)
pub const SUBKEY_SIZE: usize = 32;

/// Size of a full cascade key: three stage keys
pub const CASCADE_KEY_SIZE: usize = 3 * SUBKEY_SIZE;

/// CBC-MAC tag size: half a block
pub const MAC_SIZE: usize = BLOCK_SIZE / 2;

/// Random salt in the salted envelope
pub const SALT_SIZE: usize = 8;

/// Shared secret size for generated keys
pub const SECRET_SIZE: usize = 32;
