//! Three-cipher cascade
//!
//! Composes three independent block ciphers into one logical block cipher:
//! ```text
//! encrypt: block → E1 → E2 → E3 → out
//! decrypt: block → D3 → D2 → D1 → out
//! ```
//! Each stage consumes the previous stage's whole output block. There is no
//! XOR chaining between stages.
//!
//! The cascade key is the concatenation of the three sub-keys, in stage
//! order. With the standard stages that is `AES key || Twofish key || Serpent key`.

use crate::engine::{aes_engine, serpent_engine, twofish_engine, BlockCipher};
use crate::error::{CryptoError, CryptoResult};

pub struct CascadeCipher {
    stages: [Box<dyn BlockCipher>; 3],
    for_encryption: bool,
    initialized: bool,
}

impl CascadeCipher {
    /// Build a cascade from three engines, applied in the given order on
    /// encryption.
    ///
    /// Engines that disagree on block size indicate a misconfigured build and
    /// are rejected.
    pub fn new(
        first: Box<dyn BlockCipher>,
        second: Box<dyn BlockCipher>,
        third: Box<dyn BlockCipher>,
    ) -> CryptoResult<Self> {
        let block_size = first.block_size();
        for other in [&second, &third] {
            if other.block_size() != block_size {
                return Err(CryptoError::BlockSizeMismatch {
                    first: block_size,
                    other: other.block_size(),
                });
            }
        }
        Ok(Self {
            stages: [first, second, third],
            for_encryption: true,
            initialized: false,
        })
    }

    /// AES-256 → Twofish-256 → Serpent-256.
    pub fn standard() -> Self {
        // All three RustCrypto engines share the 16-byte block.
        Self {
            stages: [aes_engine(), twofish_engine(), serpent_engine()],
            for_encryption: true,
            initialized: false,
        }
    }

    /// Byte ranges of each stage's sub-key inside the cascade key.
    fn subkey_ranges(&self) -> [std::ops::Range<usize>; 3] {
        let a = self.stages[0].key_size();
        let b = a + self.stages[1].key_size();
        let c = b + self.stages[2].key_size();
        [0..a, a..b, b..c]
    }
}

impl BlockCipher for CascadeCipher {
    fn algorithm_name(&self) -> &'static str {
        "Cascade"
    }

    fn block_size(&self) -> usize {
        self.stages[0].block_size()
    }

    fn key_size(&self) -> usize {
        self.stages.iter().map(|s| s.key_size()).sum()
    }

    fn init(&mut self, for_encryption: bool, key: &[u8]) -> CryptoResult<()> {
        if key.len() != self.key_size() {
            return Err(CryptoError::InvalidKey {
                algorithm: self.algorithm_name(),
                expected: self.key_size(),
                actual: key.len(),
            });
        }
        self.initialized = false;
        let ranges = self.subkey_ranges();
        for (stage, range) in self.stages.iter_mut().zip(ranges) {
            stage.init(for_encryption, &key[range])?;
        }
        self.for_encryption = for_encryption;
        self.initialized = true;
        Ok(())
    }

    fn process_block(&mut self, block: &mut [u8]) -> CryptoResult<()> {
        if !self.initialized {
            return Err(CryptoError::NotInitialized(self.algorithm_name()));
        }
        if self.for_encryption {
            for stage in self.stages.iter_mut() {
                stage.process_block(block)?;
            }
        } else {
            for stage in self.stages.iter_mut().rev() {
                stage.process_block(block)?;
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        for stage in self.stages.iter_mut() {
            stage.reset();
        }
        self.initialized = false;
    }
}
