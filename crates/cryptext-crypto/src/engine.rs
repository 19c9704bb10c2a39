//! Block cipher engines
//!
//! The envelope and the MAC never name a concrete cipher. They ask a
//! [`CipherFactory`] for fresh [`BlockCipher`] instances, so a single factory
//! decides the cipher family for both confidentiality and integrity.
//!
//! Concrete engines wrap the RustCrypto block ciphers (`aes`, `twofish`,
//! `serpent`) behind the object-safe [`BlockCipher`] trait:
//! ```text
//! init(for_encryption, key) → process_block(&mut block)* → reset()
//! ```
//!
//! Stage ciphers must be `ZeroizeOnDrop`, so re-keying, `reset` and drop all
//! wipe the expanded key schedule.

use cipher::{
    consts::U16, generic_array::GenericArray, BlockDecrypt, BlockEncrypt, BlockSizeUser, KeyInit,
};
use zeroize::ZeroizeOnDrop;

use crate::cascade::CascadeCipher;
use crate::error::{CryptoError, CryptoResult};
use crate::{BLOCK_SIZE, SUBKEY_SIZE};

/// A keyed 128-bit block permutation, processed one block at a time.
pub trait BlockCipher: Send {
    fn algorithm_name(&self) -> &'static str;

    fn block_size(&self) -> usize;

    /// Exact key length accepted by [`BlockCipher::init`].
    fn key_size(&self) -> usize;

    /// Key the engine and fix its direction. Re-initializing replaces the
    /// previous key schedule.
    fn init(&mut self, for_encryption: bool, key: &[u8]) -> CryptoResult<()>;

    /// Encrypt or decrypt `block` in place, according to the direction given
    /// to `init`.
    fn process_block(&mut self, block: &mut [u8]) -> CryptoResult<()>;

    /// Drop the key schedule. The engine must be re-initialized before use.
    fn reset(&mut self);
}

/// The "new block cipher instance" capability.
pub trait CipherFactory: Send + Sync {
    fn new_engine(&self) -> Box<dyn BlockCipher>;
}

impl<F> CipherFactory for F
where
    F: Fn() -> Box<dyn BlockCipher> + Send + Sync,
{
    fn new_engine(&self) -> Box<dyn BlockCipher> {
        self()
    }
}

/// Adapter from a RustCrypto 128-bit block cipher to [`BlockCipher`].
pub struct RustCryptoEngine<C> {
    name: &'static str,
    key_size: usize,
    cipher: Option<C>,
    for_encryption: bool,
}

impl<C> RustCryptoEngine<C> {
    pub fn new(name: &'static str, key_size: usize) -> Self {
        Self {
            name,
            key_size,
            cipher: None,
            for_encryption: true,
        }
    }
}

impl<C> BlockCipher for RustCryptoEngine<C>
where
    C: KeyInit
        + BlockEncrypt
        + BlockDecrypt
        + BlockSizeUser<BlockSize = U16>
        + ZeroizeOnDrop
        + Send,
{
    fn algorithm_name(&self) -> &'static str {
        self.name
    }

    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn key_size(&self) -> usize {
        self.key_size
    }

    fn init(&mut self, for_encryption: bool, key: &[u8]) -> CryptoResult<()> {
        let invalid = || CryptoError::InvalidKey {
            algorithm: self.name,
            expected: self.key_size,
            actual: key.len(),
        };
        if key.len() != self.key_size {
            return Err(invalid());
        }
        let cipher = C::new_from_slice(key).map_err(|_| invalid())?;
        self.cipher = Some(cipher);
        self.for_encryption = for_encryption;
        Ok(())
    }

    fn process_block(&mut self, block: &mut [u8]) -> CryptoResult<()> {
        let cipher = self
            .cipher
            .as_ref()
            .ok_or(CryptoError::NotInitialized(self.name))?;
        if block.len() != BLOCK_SIZE {
            return Err(CryptoError::DataLength {
                actual: block.len(),
                block_size: BLOCK_SIZE,
            });
        }
        let block = GenericArray::<u8, U16>::from_mut_slice(block);
        if self.for_encryption {
            cipher.encrypt_block(block);
        } else {
            cipher.decrypt_block(block);
        }
        Ok(())
    }

    fn reset(&mut self) {
        // Dropping the schedule zeroizes it
        self.cipher = None;
    }
}

pub type AesEngine = RustCryptoEngine<aes::Aes256>;
pub type TwofishEngine = RustCryptoEngine<twofish::Twofish>;
pub type SerpentEngine = RustCryptoEngine<serpent::Serpent>;

/// AES-256.
pub fn aes_engine() -> Box<dyn BlockCipher> {
    Box::new(AesEngine::new("AES", SUBKEY_SIZE))
}

/// Twofish with a 256-bit key.
pub fn twofish_engine() -> Box<dyn BlockCipher> {
    Box::new(TwofishEngine::new("Twofish", SUBKEY_SIZE))
}

/// Serpent with a 256-bit key.
pub fn serpent_engine() -> Box<dyn BlockCipher> {
    Box::new(SerpentEngine::new("Serpent", SUBKEY_SIZE))
}

/// AES → Twofish → Serpent cascade, the engine used for every message.
pub fn cascade_engine() -> Box<dyn BlockCipher> {
    Box::new(CascadeCipher::standard())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_requires_init() {
        let mut engine = aes_engine();
        let mut block = [0u8; BLOCK_SIZE];
        let err = engine.process_block(&mut block).unwrap_err();
        assert!(matches!(err, CryptoError::NotInitialized("AES")));
    }

    #[test]
    fn test_engine_rejects_wrong_key_length() {
        for mut engine in [aes_engine(), twofish_engine(), serpent_engine()] {
            let err = engine.init(true, &[0u8; 16]).unwrap_err();
            assert!(matches!(
                err,
                CryptoError::InvalidKey {
                    expected: 32,
                    actual: 16,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_engine_rejects_partial_block() {
        let mut engine = serpent_engine();
        engine.init(true, &[7u8; 32]).unwrap();
        let mut short = [0u8; 15];
        assert!(matches!(
            engine.process_block(&mut short),
            Err(CryptoError::DataLength { actual: 15, .. })
        ));
    }

    #[test]
    fn test_engine_encrypt_decrypt_inverse() {
        let key = [0x5Au8; 32];
        let plain: [u8; 16] = *b"sixteen byte blk";
        for factory in [aes_engine as fn() -> Box<dyn BlockCipher>, twofish_engine, serpent_engine] {
            let mut enc = factory();
            let mut dec = factory();
            enc.init(true, &key).unwrap();
            dec.init(false, &key).unwrap();

            let mut block = plain;
            enc.process_block(&mut block).unwrap();
            assert_ne!(block, plain, "{} must permute", enc.algorithm_name());
            dec.process_block(&mut block).unwrap();
            assert_eq!(block, plain);
        }
    }

    #[test]
    fn test_reset_drops_key() {
        let mut engine = twofish_engine();
        engine.init(true, &[1u8; 32]).unwrap();
        engine.reset();
        let mut block = [0u8; 16];
        assert!(engine.process_block(&mut block).is_err());
    }

    fn assert_zeroize_on_drop<T: ZeroizeOnDrop>() {}

    #[test]
    fn test_stage_ciphers_wipe_key_schedules() {
        assert_zeroize_on_drop::<aes::Aes256>();
        assert_zeroize_on_drop::<twofish::Twofish>();
        assert_zeroize_on_drop::<serpent::Serpent>();
    }

    #[test]
    fn test_closure_is_a_factory() {
        let factory = || aes_engine();
        let engine = CipherFactory::new_engine(&factory);
        assert_eq!(engine.algorithm_name(), "AES");
    }
}
