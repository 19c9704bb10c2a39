//! Authenticated envelope: random IV + CBC encryption + CBC-MAC
//!
//! Wire format (binary):
//! ```text
//! keyset variant: [IV: 16][CBC_textKey( MAC_authKey(payload)[8] || payload )]
//! salted variant: [IV: 16][CBC_key( MAC_key(salt || payload)[8] || salt[8] || payload )]
//! ```
//!
//! The salted variant uses one key for both CBC and the MAC and mixes a fresh
//! random salt into every tag. It is what password-derived keys use. The
//! keyset variant uses independent text/auth keys and carries no salt.
//! Neither format is self-describing: the caller picks the variant that
//! matches the key it holds.
//!
//! Decryption never reveals why it failed. Short input, bad padding, a MAC
//! mismatch and a wrong key all come back as [`DecryptError::Failed`].

use zeroize::Zeroizing;

use crate::cbc::{cbc_decrypt, cbc_encrypt, cbc_mac, verify_tag};
use crate::engine::{cascade_engine, BlockCipher, CipherFactory};
use crate::error::{CryptoError, CryptoResult, DecryptError};
use crate::keys::{Keyset, SecretKey};
use crate::rng::{fill_random, random_vec};
use crate::{MAC_SIZE, SALT_SIZE};

/// Envelope over the cipher family produced by `F`.
pub struct Envelope<F> {
    factory: F,
}

/// The envelope every message uses: AES → Twofish → Serpent.
pub type CascadeEnvelope = Envelope<fn() -> Box<dyn BlockCipher>>;

impl CascadeEnvelope {
    pub fn cascade() -> Self {
        Envelope::new(cascade_engine as fn() -> Box<dyn BlockCipher>)
    }
}

impl Default for CascadeEnvelope {
    fn default() -> Self {
        Self::cascade()
    }
}

impl<F: CipherFactory> Envelope<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    /// Key length required by this envelope's cipher family.
    pub fn key_size(&self) -> usize {
        self.factory.new_engine().key_size()
    }

    /// Encrypt `payload` under a text/auth keyset.
    ///
    /// Returns `[IV][ciphertext]`.
    pub fn encrypt(&self, payload: &[u8], keys: &Keyset) -> CryptoResult<Vec<u8>> {
        self.check_key(&keys.text)?;
        self.check_key(&keys.auth)?;
        let tag = cbc_mac(self.factory.new_engine(), keys.auth.as_bytes(), payload)?;

        let mut inner = Zeroizing::new(Vec::with_capacity(MAC_SIZE + payload.len()));
        inner.extend_from_slice(&tag);
        inner.extend_from_slice(payload);
        self.seal(&keys.text, &inner)
    }

    /// Decrypt the output of [`Envelope::encrypt`].
    pub fn decrypt(&self, data: &[u8], keys: &Keyset) -> Result<Zeroizing<Vec<u8>>, DecryptError> {
        self.check_key(&keys.text).map_err(DecryptError::Config)?;
        self.check_key(&keys.auth).map_err(DecryptError::Config)?;

        let inner = self.unseal(&keys.text, data).ok_or(DecryptError::Failed)?;
        if inner.len() < MAC_SIZE {
            return Err(DecryptError::Failed);
        }
        let (tag, payload) = inner.split_at(MAC_SIZE);
        let expected = cbc_mac(self.factory.new_engine(), keys.auth.as_bytes(), payload)
            .map_err(|_| DecryptError::Failed)?;
        if !verify_tag(&expected, tag) {
            return Err(DecryptError::Failed);
        }
        Ok(Zeroizing::new(payload.to_vec()))
    }

    /// Encrypt `payload` under a single key, with a random salt mixed into the MAC.
    pub fn encrypt_salted(&self, payload: &[u8], key: &SecretKey) -> CryptoResult<Vec<u8>> {
        self.check_key(key)?;
        let salt = random_vec(SALT_SIZE);

        let mut salted = Zeroizing::new(Vec::with_capacity(SALT_SIZE + payload.len()));
        salted.extend_from_slice(&salt);
        salted.extend_from_slice(payload);
        let tag = cbc_mac(self.factory.new_engine(), key.as_bytes(), &salted)?;

        let mut inner = Zeroizing::new(Vec::with_capacity(MAC_SIZE + salted.len()));
        inner.extend_from_slice(&tag);
        inner.extend_from_slice(&salted);
        self.seal(key, &inner)
    }

    /// Decrypt the output of [`Envelope::encrypt_salted`].
    pub fn decrypt_salted(
        &self,
        data: &[u8],
        key: &SecretKey,
    ) -> Result<Zeroizing<Vec<u8>>, DecryptError> {
        self.check_key(key).map_err(DecryptError::Config)?;

        let inner = self.unseal(key, data).ok_or(DecryptError::Failed)?;
        if inner.len() < MAC_SIZE + SALT_SIZE {
            return Err(DecryptError::Failed);
        }
        let (tag, salted) = inner.split_at(MAC_SIZE);
        let expected = cbc_mac(self.factory.new_engine(), key.as_bytes(), salted)
            .map_err(|_| DecryptError::Failed)?;
        if !verify_tag(&expected, tag) {
            return Err(DecryptError::Failed);
        }
        Ok(Zeroizing::new(salted[SALT_SIZE..].to_vec()))
    }

    fn check_key(&self, key: &SecretKey) -> CryptoResult<()> {
        let engine = self.factory.new_engine();
        if key.len() != engine.key_size() {
            return Err(CryptoError::InvalidKey {
                algorithm: engine.algorithm_name(),
                expected: engine.key_size(),
                actual: key.len(),
            });
        }
        Ok(())
    }

    /// `[IV][CBC(inner)]` with a fresh random IV.
    fn seal(&self, key: &SecretKey, inner: &[u8]) -> CryptoResult<Vec<u8>> {
        let mut engine = self.factory.new_engine();
        let bs = engine.block_size();
        let mut iv = vec![0u8; bs];
        fill_random(&mut iv);

        engine.init(true, key.as_bytes())?;
        let ciphertext = cbc_encrypt(engine.as_mut(), &iv, inner);
        engine.reset();
        let ciphertext = ciphertext?;

        let mut out = Vec::with_capacity(bs + ciphertext.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Split off the IV and CBC-decrypt the rest. `None` on any failure.
    fn unseal(&self, key: &SecretKey, data: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
        let mut engine = self.factory.new_engine();
        let bs = engine.block_size();
        if data.len() <= bs {
            return None;
        }
        let (iv, ciphertext) = data.split_at(bs);
        engine.init(false, key.as_bytes()).ok()?;
        let inner = cbc_decrypt(engine.as_mut(), iv, ciphertext);
        engine.reset();
        inner.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::aes_engine;
    use crate::keys::derive_keyset;
    use crate::{BLOCK_SIZE, CASCADE_KEY_SIZE};

    fn keyset(seed: u8) -> Keyset {
        derive_keyset(&[seed; 32]).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let env = CascadeEnvelope::cascade();
        let keys = keyset(1);
        let payload = b"hello, encrypted world!";

        let sealed = env.encrypt(payload, &keys).unwrap();
        let opened = env.decrypt(&sealed, &keys).unwrap();
        assert_eq!(opened.as_slice(), payload);
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let env = CascadeEnvelope::cascade();
        let keys = keyset(2);
        let sealed = env.encrypt(b"", &keys).unwrap();
        // IV + one block holding the 8-byte tag and padding
        assert_eq!(sealed.len(), 2 * BLOCK_SIZE);
        assert!(env.decrypt(&sealed, &keys).unwrap().is_empty());
    }

    #[test]
    fn test_iv_is_fresh_per_encryption() {
        let env = CascadeEnvelope::cascade();
        let keys = keyset(3);
        let a = env.encrypt(b"same", &keys).unwrap();
        let b = env.encrypt(b"same", &keys).unwrap();
        assert_ne!(a[..BLOCK_SIZE], b[..BLOCK_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_decrypt_wrong_keys() {
        let env = CascadeEnvelope::cascade();
        let sealed = env.encrypt(b"secret data", &keyset(4)).unwrap();
        assert!(matches!(
            env.decrypt(&sealed, &keyset(5)),
            Err(DecryptError::Failed)
        ));
    }

    #[test]
    fn test_decrypt_wrong_auth_key_only() {
        let env = CascadeEnvelope::cascade();
        let good = keyset(6);
        let sealed = env.encrypt(b"secret data", &good).unwrap();
        let mixed = Keyset::new(good.text.clone(), keyset(7).auth.clone());
        assert!(matches!(env.decrypt(&sealed, &mixed), Err(DecryptError::Failed)));
    }

    #[test]
    fn test_tampered_ciphertext() {
        let env = CascadeEnvelope::cascade();
        let keys = keyset(8);
        let sealed = env.encrypt(b"attack at dawn, not at dusk", &keys).unwrap();
        for i in BLOCK_SIZE..sealed.len() {
            let mut forged = sealed.clone();
            forged[i] ^= 0x01;
            assert!(
                matches!(env.decrypt(&forged, &keys), Err(DecryptError::Failed)),
                "bit flip at byte {i} must be rejected"
            );
        }
    }

    #[test]
    fn test_truncated_input() {
        let env = CascadeEnvelope::cascade();
        let keys = keyset(9);
        assert!(matches!(env.decrypt(&[], &keys), Err(DecryptError::Failed)));
        assert!(matches!(
            env.decrypt(&[0u8; BLOCK_SIZE], &keys),
            Err(DecryptError::Failed)
        ));
        assert!(matches!(
            env.decrypt(&[0u8; BLOCK_SIZE + 5], &keys),
            Err(DecryptError::Failed)
        ));
    }

    #[test]
    fn test_wrong_key_length_is_config_error() {
        let env = CascadeEnvelope::cascade();
        let short = Keyset::new(
            SecretKey::from_bytes(vec![0u8; 32]),
            SecretKey::from_bytes(vec![0u8; 32]),
        );
        assert!(matches!(
            env.encrypt(b"x", &short),
            Err(CryptoError::InvalidKey { expected: CASCADE_KEY_SIZE, .. })
        ));
        assert!(matches!(env.decrypt(&[0u8; 64], &short), Err(DecryptError::Config(_))));
    }

    #[test]
    fn test_salted_roundtrip() {
        let env = CascadeEnvelope::cascade();
        let key = SecretKey::from_bytes(vec![0x42; CASCADE_KEY_SIZE]);
        let sealed = env.encrypt_salted(b"legacy payload", &key).unwrap();
        let opened = env.decrypt_salted(&sealed, &key).unwrap();
        assert_eq!(opened.as_slice(), b"legacy payload");
    }

    #[test]
    fn test_salted_wrong_key() {
        let env = CascadeEnvelope::cascade();
        let sealed = env
            .encrypt_salted(b"payload", &SecretKey::from_bytes(vec![1; CASCADE_KEY_SIZE]))
            .unwrap();
        let other = SecretKey::from_bytes(vec![2; CASCADE_KEY_SIZE]);
        assert!(matches!(env.decrypt_salted(&sealed, &other), Err(DecryptError::Failed)));
    }

    #[test]
    fn test_variants_do_not_cross_open() {
        let env = CascadeEnvelope::cascade();
        let key = SecretKey::from_bytes(vec![3; CASCADE_KEY_SIZE]);
        let keys = Keyset::new(key.clone(), SecretKey::from_bytes(vec![4; CASCADE_KEY_SIZE]));
        let payload = b"a payload longer than the salt";

        let salted = env.encrypt_salted(payload, &key).unwrap();
        assert!(env.decrypt(&salted, &keys).is_err());

        let plain = env.encrypt(payload, &keys).unwrap();
        assert!(env.decrypt_salted(&plain, &key).is_err());
    }

    #[test]
    fn test_pluggable_engine() {
        let env = Envelope::new(|| aes_engine());
        assert_eq!(env.key_size(), 32);
        let keys = Keyset::new(
            SecretKey::from_bytes(vec![5; 32]),
            SecretKey::from_bytes(vec![6; 32]),
        );
        let sealed = env.encrypt(b"aes only", &keys).unwrap();
        assert_eq!(env.decrypt(&sealed, &keys).unwrap().as_slice(), b"aes only");
    }
}
