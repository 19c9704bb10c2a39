//! Process-wide secure randomness.
//!
//! This is the one piece of shared mutable state in the crate: a single
//! ChaCha-based `StdRng`, seeded once from OS entropy on first use and never
//! reseeded for the life of the process. All IVs, salts and generated
//! secrets come from here.

use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use zeroize::Zeroizing;

static RNG: Lazy<Mutex<StdRng>> = Lazy::new(|| Mutex::new(StdRng::from_entropy()));

/// Fill `buf` with cryptographically secure random bytes.
pub fn fill_random(buf: &mut [u8]) {
    // A panic elsewhere while holding the lock cannot leave the generator
    // in a state that repeats output, so a poisoned lock is still usable.
    let mut rng = RNG.lock().unwrap_or_else(PoisonError::into_inner);
    rng.fill_bytes(buf);
}

/// `len` fresh random bytes, zeroized on drop.
pub fn random_vec(len: usize) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(vec![0u8; len]);
    fill_random(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_vec_length_and_uniqueness() {
        let a = random_vec(32);
        let b = random_vec(32);
        assert_eq!(a.len(), 32);
        assert_ne!(*a, *b, "consecutive draws must differ");
    }

    #[test]
    fn test_concurrent_draws() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| random_vec(16).to_vec()))
            .collect();
        let mut seen: Vec<Vec<u8>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 4);
    }
}
