//! Key material: single keys, text/auth keysets, random secret expansion

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{CryptoError, CryptoResult};
use crate::rng::random_vec;
use crate::{CASCADE_KEY_SIZE, SECRET_SIZE};

const TEXT_KEY_INFO: &[u8] = b"cryptext/text-key";
const AUTH_KEY_INFO: &[u8] = b"cryptext/auth-key";

/// Raw key bytes for one block-cipher family. Zeroized on drop.
#[derive(Clone)]
pub struct SecretKey {
    bytes: Vec<u8>,
}

impl SecretKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("len", &self.bytes.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Independent keys for confidentiality (CBC) and integrity (CBC-MAC).
#[derive(Clone, Debug)]
pub struct Keyset {
    pub text: SecretKey,
    pub auth: SecretKey,
}

impl Keyset {
    pub fn new(text: SecretKey, auth: SecretKey) -> Self {
        Self { text, auth }
    }
}

/// Generate `len` bytes of random secret material.
pub fn generate_secret(len: usize) -> Zeroizing<Vec<u8>> {
    random_vec(len)
}

/// Expand shared random secret bytes into a cascade keyset via HKDF-SHA256.
///
/// The text and auth keys come from distinct HKDF info strings, so learning
/// one says nothing about the other.
pub fn derive_keyset(secret: &[u8]) -> CryptoResult<Keyset> {
    if secret.is_empty() {
        return Err(CryptoError::Kdf("empty secret".into()));
    }
    let hkdf = Hkdf::<Sha256>::new(None, secret);
    let text = hkdf_expand(&hkdf, TEXT_KEY_INFO)?;
    let auth = hkdf_expand(&hkdf, AUTH_KEY_INFO)?;
    Ok(Keyset::new(text, auth))
}

/// Generate a fresh shared secret and the keyset it expands to.
pub fn generate_keyset() -> CryptoResult<(Zeroizing<Vec<u8>>, Keyset)> {
    let secret = generate_secret(SECRET_SIZE);
    let keyset = derive_keyset(&secret)?;
    Ok((secret, keyset))
}

fn hkdf_expand(hkdf: &Hkdf<Sha256>, info: &[u8]) -> CryptoResult<SecretKey> {
    let mut okm = vec![0u8; CASCADE_KEY_SIZE];
    hkdf.expand(info, &mut okm)
        .map_err(|e| CryptoError::Kdf(format!("HKDF expand failed: {e}")))?;
    Ok(SecretKey::from_bytes(okm))
}
