//! Key derivation: password → cipher key via PBKDF2-HMAC-SHA256
//!
//! Two modes:
//! - single: one PBKDF2 run with a fixed salt, producing exactly the key
//!   length the target cipher needs
//! - cascade: three PBKDF2 runs over the same password with one fixed salt
//!   per stage cipher, concatenated in cascade sub-key order
//!
//! Both are deterministic so the recipient can re-derive the same key from a
//! shared password. The salts are public domain separators, not secrets.

use pbkdf2::pbkdf2_hmac;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::keys::SecretKey;
use crate::SUBKEY_SIZE;

/// Recommended minimum PBKDF2 iteration count.
pub const MIN_ITERATIONS: u32 = 100_000;

/// Salt for single-key derivation.
pub const SINGLE_KEY_SALT: &[u8] = b"cryptext/password-key/v1";

/// Per-stage salts for cascade derivation, in sub-key order.
pub const CASCADE_SALTS: [&[u8]; 3] = [
    b"cryptext/cascade/aes",
    b"cryptext/cascade/twofish",
    b"cryptext/cascade/serpent",
];

/// PBKDF2 parameters
#[derive(Debug, Clone)]
pub struct KdfParams {
    /// HMAC-SHA256 iterations (default: 100000)
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: MIN_ITERATIONS,
        }
    }
}

/// Which password derivation feeds the cascade envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordMode {
    /// One PBKDF2 output sized to the whole cascade key.
    Single,
    /// One PBKDF2 output per stage cipher.
    #[default]
    Cascade,
}

/// Derive a `key_len`-byte key from a password with the fixed single-key salt.
pub fn derive_key(password: &SecretString, key_len: usize, params: &KdfParams) -> SecretKey {
    let pw = Zeroizing::new(password.expose_secret().as_bytes().to_vec());
    let mut key = vec![0u8; key_len];
    pbkdf2_hmac::<Sha256>(&pw, SINGLE_KEY_SALT, params.iterations, &mut key);
    SecretKey::from_bytes(key)
}

/// Derive a cascade key: three independent 32-byte sub-keys, one per stage.
pub fn derive_cascade_key(password: &SecretString, params: &KdfParams) -> SecretKey {
    let pw = Zeroizing::new(password.expose_secret().as_bytes().to_vec());
    let mut key = vec![0u8; SUBKEY_SIZE * CASCADE_SALTS.len()];
    for (subkey, salt) in key.chunks_exact_mut(SUBKEY_SIZE).zip(CASCADE_SALTS) {
        pbkdf2_hmac::<Sha256>(&pw, salt, params.iterations, subkey);
    }
    SecretKey::from_bytes(key)
}

/// Derive the cascade key for a password using the configured mode.
pub fn derive_password_key(
    password: &SecretString,
    mode: PasswordMode,
    params: &KdfParams,
) -> SecretKey {
    tracing::debug!(?mode, iterations = params.iterations, "deriving password key");
    match mode {
        PasswordMode::Single => derive_key(password, SUBKEY_SIZE * CASCADE_SALTS.len(), params),
        PasswordMode::Cascade => derive_cascade_key(password, params),
    }
}
