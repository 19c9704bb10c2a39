//! CBC mode, PKCS#7 padding and CBC-MAC over any [`BlockCipher`].

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::engine::BlockCipher;
use crate::error::{CryptoError, CryptoResult};
use crate::MAC_SIZE;

/// CBC-encrypt `plaintext` with PKCS#7 padding.
///
/// `engine` must already be initialized for encryption. The output length is
/// always a non-zero multiple of the block size.
pub fn cbc_encrypt(
    engine: &mut dyn BlockCipher,
    iv: &[u8],
    plaintext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let bs = engine.block_size();
    check_iv(iv, bs)?;

    let pad = bs - plaintext.len() % bs;
    let mut out = Vec::with_capacity(plaintext.len() + pad);
    out.extend_from_slice(plaintext);
    out.resize(plaintext.len() + pad, pad as u8);

    let mut chain = iv.to_vec();
    for block in out.chunks_exact_mut(bs) {
        xor_in_place(block, &chain);
        engine.process_block(block)?;
        chain.copy_from_slice(block);
    }
    Ok(out)
}

/// CBC-decrypt `ciphertext` and strip PKCS#7 padding.
///
/// `engine` must already be initialized for decryption.
pub fn cbc_decrypt(
    engine: &mut dyn BlockCipher,
    iv: &[u8],
    ciphertext: &[u8],
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let bs = engine.block_size();
    check_iv(iv, bs)?;
    if ciphertext.is_empty() || ciphertext.len() % bs != 0 {
        return Err(CryptoError::DataLength {
            actual: ciphertext.len(),
            block_size: bs,
        });
    }

    let mut out = Zeroizing::new(ciphertext.to_vec());
    let mut chain = iv.to_vec();
    for (block, cipher_block) in out.chunks_exact_mut(bs).zip(ciphertext.chunks_exact(bs)) {
        engine.process_block(block)?;
        xor_in_place(block, &chain);
        chain.copy_from_slice(cipher_block);
    }

    let pad = out[out.len() - 1] as usize;
    if pad == 0 || pad > bs || out[out.len() - pad..].iter().any(|&b| b as usize != pad) {
        return Err(CryptoError::BadPadding);
    }
    let len = out.len() - pad;
    out.truncate(len);
    Ok(out)
}

/// CBC-MAC with a zero IV.
///
/// The final partial block is zero-padded, an empty message is MACed as one
/// zero block, and the tag is the first [`MAC_SIZE`] bytes of the last cipher
/// output.
pub struct CbcMac {
    engine: Box<dyn BlockCipher>,
    state: Vec<u8>,
    buf: Vec<u8>,
}

impl CbcMac {
    pub fn new(mut engine: Box<dyn BlockCipher>, key: &[u8]) -> CryptoResult<Self> {
        engine.init(true, key)?;
        let bs = engine.block_size();
        Ok(Self {
            engine,
            state: vec![0u8; bs],
            buf: Vec::with_capacity(bs),
        })
    }

    pub fn update(&mut self, mut data: &[u8]) -> CryptoResult<()> {
        let bs = self.state.len();
        while !data.is_empty() {
            // A full buffered block is only absorbed once more input arrives,
            // so finalize always has a block to process.
            if self.buf.len() == bs {
                self.absorb()?;
            }
            let take = (bs - self.buf.len()).min(data.len());
            self.buf.extend_from_slice(&data[..take]);
            data = &data[take..];
        }
        Ok(())
    }

    pub fn finalize(mut self) -> CryptoResult<[u8; MAC_SIZE]> {
        let bs = self.state.len();
        self.buf.resize(bs, 0);
        self.absorb()?;
        let mut tag = [0u8; MAC_SIZE];
        tag.copy_from_slice(&self.state[..MAC_SIZE]);
        Ok(tag)
    }

    fn absorb(&mut self) -> CryptoResult<()> {
        xor_in_place(&mut self.state, &self.buf);
        self.engine.process_block(&mut self.state)?;
        self.buf.clear();
        Ok(())
    }
}

impl Drop for CbcMac {
    fn drop(&mut self) {
        self.state.zeroize();
        self.buf.zeroize();
        self.engine.reset();
    }
}

/// One-shot CBC-MAC of `data`.
pub fn cbc_mac(
    engine: Box<dyn BlockCipher>,
    key: &[u8],
    data: &[u8],
) -> CryptoResult<[u8; MAC_SIZE]> {
    let mut mac = CbcMac::new(engine, key)?;
    mac.update(data)?;
    mac.finalize()
}

/// Compare two tags without early exit. Every byte is inspected and the
/// match count must equal the full tag length.
pub fn verify_tag(expected: &[u8], actual: &[u8]) -> bool {
    if expected.len() != actual.len() {
        return false;
    }
    let matches: usize = expected
        .iter()
        .zip(actual)
        .map(|(a, b)| usize::from(bool::from(a.ct_eq(b))))
        .sum();
    matches == expected.len()
}

fn xor_in_place(block: &mut [u8], other: &[u8]) {
    for (a, b) in block.iter_mut().zip(other) {
        *a ^= b;
    }
}

fn check_iv(iv: &[u8], block_size: usize) -> CryptoResult<()> {
    if iv.len() != block_size {
        return Err(CryptoError::DataLength {
            actual: iv.len(),
            block_size,
        });
    }
    Ok(())
}
