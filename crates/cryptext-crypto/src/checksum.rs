//! Random secrets with a detachable transcription checksum
//!
//! The checksum is a CBC-MAC under a fixed all-zero cascade key. It protects
//! against typos and partial QR scans only; it offers no secrecy and no
//! authenticity.
//!
//! ```text
//! [secret: N][checksum: 8]
//! ```

use zeroize::Zeroizing;

use crate::cbc::{cbc_mac, verify_tag};
use crate::engine::cascade_engine;
use crate::error::CryptoResult;
use crate::keys::generate_secret;
use crate::{CASCADE_KEY_SIZE, MAC_SIZE};

const CHECKSUM_KEY: [u8; CASCADE_KEY_SIZE] = [0u8; CASCADE_KEY_SIZE];

/// Generate `len` random secret bytes.
pub fn generate(len: usize) -> Zeroizing<Vec<u8>> {
    generate_secret(len)
}

/// Checksum of `secret`.
pub fn checksum(secret: &[u8]) -> CryptoResult<[u8; MAC_SIZE]> {
    cbc_mac(cascade_engine(), &CHECKSUM_KEY, secret)
}

/// Generate `len` random secret bytes together with their checksum.
pub fn generate_with_checksum(len: usize) -> CryptoResult<(Zeroizing<Vec<u8>>, [u8; MAC_SIZE])> {
    let secret = generate(len);
    let sum = checksum(&secret)?;
    Ok((secret, sum))
}

/// `secret || checksum`, ready for encoding.
pub fn attach_checksum(secret: &[u8]) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let sum = checksum(secret)?;
    let mut out = Zeroizing::new(Vec::with_capacity(secret.len() + MAC_SIZE));
    out.extend_from_slice(secret);
    out.extend_from_slice(&sum);
    Ok(out)
}

/// Split off the trailing checksum and return the secret if it matches.
pub fn verify_checksum(secret_with_checksum: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
    if secret_with_checksum.len() < MAC_SIZE {
        return None;
    }
    let (secret, sum) = secret_with_checksum.split_at(secret_with_checksum.len() - MAC_SIZE);
    let expected = checksum(secret).ok()?;
    verify_tag(&expected, sum).then(|| Zeroizing::new(secret.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_verify() {
        let (secret, sum) = generate_with_checksum(32).unwrap();
        assert_eq!(secret.len(), 32);
        let mut joined = secret.to_vec();
        joined.extend_from_slice(&sum);
        assert_eq!(verify_checksum(&joined).unwrap().as_slice(), secret.as_slice());
    }

    #[test]
    fn test_attach_matches_generate() {
        let secret = generate(20);
        let joined = attach_checksum(&secret).unwrap();
        assert_eq!(joined.len(), 20 + MAC_SIZE);
        assert_eq!(&joined[20..], &checksum(&secret).unwrap());
    }

    #[test]
    fn test_any_corruption_detected() {
        let joined = attach_checksum(&[0x24u8; 32]).unwrap();
        for i in 0..joined.len() {
            let mut bad = joined.to_vec();
            bad[i] ^= 0x10;
            assert!(verify_checksum(&bad).is_none(), "corruption at byte {i} missed");
        }
    }

    #[test]
    fn test_truncation_detected() {
        let joined = attach_checksum(&[9u8; 32]).unwrap();
        assert!(verify_checksum(&joined[..joined.len() - 1]).is_none());
        assert!(verify_checksum(&joined[..4]).is_none());
    }

    #[test]
    fn test_empty_secret() {
        let joined = attach_checksum(&[]).unwrap();
        assert_eq!(verify_checksum(&joined).unwrap().len(), 0);
    }
}
