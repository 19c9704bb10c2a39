//! Passphrase protection for stored key material
//!
//! Wrapped material is a salted envelope over `entry id || 0x00 || secret`
//! under a cascade key derived from the store passphrase. Binding the entry
//! id means sealed material copied onto another entry will not unseal.

use cryptext_core::error::{CryptextError, CryptextResult};
use cryptext_core::store::SecretSealer;
use cryptext_crypto::{
    derive_password_key, CascadeEnvelope, DecryptError, KdfParams, PasswordMode, SecretKey,
};
use secrecy::SecretString;
use zeroize::Zeroizing;

pub struct PassphraseSealer {
    key: SecretKey,
    envelope: CascadeEnvelope,
}

impl PassphraseSealer {
    pub fn new(passphrase: &SecretString, params: &KdfParams) -> Self {
        Self {
            key: derive_password_key(passphrase, PasswordMode::Cascade, params),
            envelope: CascadeEnvelope::cascade(),
        }
    }
}

impl SecretSealer for PassphraseSealer {
    fn seal(&self, identifier: &str, secret: &[u8]) -> CryptextResult<Vec<u8>> {
        let mut framed = Zeroizing::new(Vec::with_capacity(identifier.len() + 1 + secret.len()));
        framed.extend_from_slice(identifier.as_bytes());
        framed.push(0);
        framed.extend_from_slice(secret);
        self.envelope
            .encrypt_salted(&framed, &self.key)
            .map_err(|e| CryptextError::Seal(e.to_string()))
    }

    fn unseal(&self, identifier: &str, wrapped: &[u8]) -> CryptextResult<Zeroizing<Vec<u8>>> {
        let framed = self.envelope.decrypt_salted(wrapped, &self.key).map_err(|e| match e {
            DecryptError::Failed => {
                CryptextError::Seal("wrong passphrase or corrupted key material".into())
            }
            DecryptError::Config(e) => CryptextError::Seal(e.to_string()),
        })?;

        let prefix_len = identifier.len() + 1;
        let bound = framed.len() >= prefix_len
            && &framed[..identifier.len()] == identifier.as_bytes()
            && framed[identifier.len()] == 0;
        if !bound {
            return Err(CryptextError::Seal(format!(
                "sealed material does not belong to key {identifier}"
            )));
        }
        Ok(Zeroizing::new(framed[prefix_len..].to_vec()))
    }
}
