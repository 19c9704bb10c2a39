//! Base61: an alphanumeric-only byte codec for QR codes and hand transcription
//!
//! Alphabet: `A–Z a–z 1–9` (61 symbols, no `0`, no punctuation).
//!
//! Input is split into 8-byte blocks. Each block is read as a big-endian
//! integer and written as base-61 digits, least significant first, for as
//! many digits as the block's largest possible value needs:
//!
//! | bytes   | 1 | 2 | 3 | 4 | 5 | 6 | 7  | 8  |
//! | --      | --| --| --| --| --| --| -- | -- |
//! | symbols | 2 | 3 | 5 | 6 | 7 | 9 | 10 | 11 |
//!
//! Every full block is 11 symbols, so only the final group can be short, and
//! its symbol count alone tells the decoder how many bytes it carried. Group
//! lengths that no byte count produces (1, 4, 8) are rejected.
//!
//! Decoding skips whitespace and control characters anywhere in the input.

use crate::error::{CryptoError, CryptoResult};

const ALPHABET: &[u8; 61] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz123456789";

const RADIX: u128 = 61;
const BLOCK_BYTES: usize = 8;
const BLOCK_SYMBOLS: usize = 11;

/// Largest value representable by `n` symbols: `61^n - 1`, for `n` in 0..=11.
const MAX_ACCUMULATOR_VALUE: [u128; BLOCK_SYMBOLS + 1] = {
    let mut table = [0u128; BLOCK_SYMBOLS + 1];
    let mut pow = 1u128;
    let mut n = 0;
    while n <= BLOCK_SYMBOLS {
        table[n] = pow - 1;
        pow *= RADIX;
        n += 1;
    }
    table
};

/// Reverse lookup: ASCII byte → digit value, 0xFF for non-alphabet bytes.
const DIGITS: [u8; 128] = {
    let mut table = [0xFFu8; 128];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Largest value of a `bytes`-byte block: `256^bytes - 1`.
fn max_block_value(bytes: usize) -> u128 {
    (1u128 << (8 * bytes)) - 1
}

/// Number of symbols emitted for a block of `bytes` bytes.
fn symbols_for_bytes(bytes: usize) -> usize {
    let max = max_block_value(bytes);
    (1..=BLOCK_SYMBOLS)
        .find(|&n| MAX_ACCUMULATOR_VALUE[n] >= max)
        .unwrap_or(BLOCK_SYMBOLS)
}

/// Number of bytes a group of `symbols` symbols decodes to, if that group
/// length is one the encoder can produce.
fn bytes_for_symbols(symbols: usize) -> Option<usize> {
    if symbols == 0 || symbols > BLOCK_SYMBOLS {
        return None;
    }
    let capacity = MAX_ACCUMULATOR_VALUE[symbols];
    let bytes = (1..=BLOCK_BYTES)
        .take_while(|&b| max_block_value(b) <= capacity)
        .last()?;
    (symbols_for_bytes(bytes) == symbols).then_some(bytes)
}

/// Encode `data` as Base61.
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() / BLOCK_BYTES * BLOCK_SYMBOLS + BLOCK_SYMBOLS);
    for block in data.chunks(BLOCK_BYTES) {
        let mut acc = block.iter().fold(0u128, |acc, &b| (acc << 8) | u128::from(b));
        let mut max = max_block_value(block.len());
        while max > 0 {
            out.push(ALPHABET[(acc % RADIX) as usize] as char);
            acc /= RADIX;
            max /= RADIX;
        }
    }
    out
}

/// Decode Base61 text, ignoring whitespace and control characters.
pub fn decode(text: &str) -> CryptoResult<Vec<u8>> {
    let mut digits = Vec::with_capacity(text.len());
    for (position, symbol) in text.chars().enumerate() {
        if symbol.is_whitespace() || symbol.is_control() {
            continue;
        }
        let digit = u8::try_from(symbol)
            .ok()
            .and_then(|b| DIGITS.get(usize::from(b)).copied())
            .filter(|&d| d != 0xFF)
            .ok_or(CryptoError::InvalidSymbol { symbol, position })?;
        digits.push(digit);
    }

    let mut out = Vec::with_capacity(digits.len() / BLOCK_SYMBOLS * BLOCK_BYTES + BLOCK_BYTES);
    for group in digits.chunks(BLOCK_SYMBOLS) {
        let bytes = bytes_for_symbols(group.len()).ok_or(CryptoError::InvalidGroup(group.len()))?;
        let value = group
            .iter()
            .rev()
            .fold(0u128, |acc, &d| acc * RADIX + u128::from(d));
        if value > max_block_value(bytes) {
            return Err(CryptoError::InvalidGroup(group.len()));
        }
        out.extend_from_slice(&value.to_be_bytes()[16 - bytes..]);
    }
    Ok(out)
}

/// Insert a space every `width` symbols for easier reading aloud or typing.
/// [`decode`] ignores the inserted spaces.
pub fn group(text: &str, width: usize) -> String {
    if width == 0 {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + text.len() / width);
    for (i, c) in text.chars().enumerate() {
        if i > 0 && i % width == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}
