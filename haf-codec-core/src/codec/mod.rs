#![warn(missing_docs)]

//! Single-error-correcting Hamming block codec.
//!
//! A stream of bytes is cut into words of `w` data bits and each word is
//! stored as a block of `w + p` bits, where the `p` parity bits sit at the
//! power-of-two positions inside the block. The decoder recomputes the parity
//! checks, and a nonzero syndrome names the one block position to flip.

/// Hamming stream decoder
pub mod decoder;

/// Hamming stream encoder
pub mod encoder;

use std::io;
use thiserror::Error;

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Word length must be in range 1 ... 255")]
    InvalidWordLength,

    #[error("Reached end of coded stream inside a block")]
    UnexpectedEof,

    #[error("IO error")]
    IoError(#[from] io::Error),
}

/// Number of parity bits required for `word` data bits per block.
///
/// This is the smallest `p` with `2^p >= word + p + 1`. The ranges below are
/// the closed form of that inequality over the whole `u8` domain.
pub fn parity_bits(word: u8) -> Result<u8, CodecError> {
    Ok(match word {
        0 => return Err(CodecError::InvalidWordLength),
        1 => 2,
        2..=4 => 3,
        5..=11 => 4,
        12..=26 => 5,
        27..=57 => 6,
        58..=120 => 7,
        121..=247 => 8,
        _ => 9,
    })
}

/// On-disk size in bytes of `raw_len` bytes once coded at `word` data bits
/// per block: the blocks are packed back to back and only the tail of the
/// final block is padded out to a whole byte.
pub fn coded_len(raw_len: u64, word: u8) -> Result<u64, CodecError> {
    let parity = u64::from(parity_bits(word)?);
    let word = u64::from(word);
    let blocks = (8 * raw_len).div_ceil(word);
    Ok((blocks * (word + parity)).div_ceil(8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_bits_is_minimal() {
        for word in 1..=255u32 {
            let p = u32::from(parity_bits(word as u8).unwrap());
            assert!(
                1u32 << p >= word + p + 1,
                "p = {p} too small for w = {word}"
            );
            assert!(
                1u32 << (p - 1) < word + (p - 1) + 1,
                "p = {p} not minimal for w = {word}"
            );
        }
    }

    #[test]
    fn zero_word_length_rejected() {
        assert!(matches!(
            parity_bits(0),
            Err(CodecError::InvalidWordLength)
        ));
        assert!(matches!(
            coded_len(100, 0),
            Err(CodecError::InvalidWordLength)
        ));
    }

    #[test]
    fn coded_len_examples() {
        // 11 bytes at the default word length: 8 blocks of 15 bits.
        assert_eq!(coded_len(11, 11).unwrap(), 15);
        // 8 bytes at w = 11: 6 blocks of 15 bits, padded to 12 bytes.
        assert_eq!(coded_len(8, 11).unwrap(), 12);
        // w = 1 triples the data (2 parity bits per data bit).
        assert_eq!(coded_len(1, 1).unwrap(), 3);
        assert_eq!(coded_len(0, 11).unwrap(), 0);
    }
}
