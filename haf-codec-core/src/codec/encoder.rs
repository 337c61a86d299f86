use crate::codec::{parity_bits, CodecError};
use bitstream_io::{BigEndian, BitWrite, BitWriter};
use std::io::Write;

/// Streaming Hamming block encoder.
///
/// Input bytes are queued MSB-first; every `word` data bits are laid out as a
/// `word + parity` bit block with the parity bits at positions 1, 2, 4, ...
/// (1-indexed) and written to the sink. Blocks are concatenated without
/// padding; only the very end of the stream is padded, by [`finish`].
///
/// [`finish`]: HammingEncoder::finish
pub struct HammingEncoder<W: Write> {
    word: u8,
    parity: u8,
    bits: Vec<bool>,
    stream: BitWriter<W, BigEndian>,
}

impl<W: Write> HammingEncoder<W> {
    /// Create an encoder producing blocks of `word` data bits into `writer`.
    pub fn new(word: u8, writer: W) -> Result<Self, CodecError> {
        let parity = parity_bits(word)?;
        Ok(Self {
            word,
            parity,
            bits: Vec::with_capacity(word as usize),
            stream: BitWriter::endian(writer, BigEndian),
        })
    }

    /// Queue bytes for coding, emitting completed blocks as they fill.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        for &byte in bytes {
            for shift in (0..8).rev() {
                self.bits.push(byte >> shift & 1 == 1);
                if self.bits.len() == self.word as usize {
                    self.emit_block()?;
                }
            }
        }
        Ok(())
    }

    /// Pad any buffered data bits with zeros to fill a last block, emit it,
    /// zero-pad the output to a whole byte and hand back the sink.
    pub fn finish(mut self) -> Result<W, CodecError> {
        if !self.bits.is_empty() {
            self.bits.resize(self.word as usize, false);
            self.emit_block()?;
        }
        self.stream.byte_align()?;
        Ok(self.stream.into_writer())
    }

    fn emit_block(&mut self) -> Result<(), CodecError> {
        let len = self.word as usize + self.parity as usize;
        // Block positions are 1-indexed; index 0 is never used.
        let mut block = vec![false; len + 1];
        let mut data = self.bits.drain(..);
        for pos in 1..=len {
            if !pos.is_power_of_two() {
                block[pos] = data.next().unwrap_or(false);
            }
        }
        drop(data);
        // Parity bit 2^k covers every position whose index has bit k set,
        // itself included (it starts out zero, so it drops out of the XOR).
        for check in 0..self.parity {
            let mask = 1usize << check;
            let mut acc = false;
            for pos in 1..=len {
                if pos & mask != 0 {
                    acc ^= block[pos];
                }
            }
            block[mask] = acc;
        }
        for pos in 1..=len {
            self.stream.write_bit(block[pos])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::coded_len;

    #[test]
    fn output_length_matches_block_arithmetic() {
        for word in [1u8, 2, 5, 11, 12, 26, 58, 120, 121, 255] {
            for len in [0usize, 1, 2, 7, 64, 1000] {
                let data = vec![0xA5u8; len];
                let mut encoder = HammingEncoder::new(word, Vec::new()).unwrap();
                encoder.write_bytes(&data).unwrap();
                let coded = encoder.finish().unwrap();
                assert_eq!(
                    coded.len() as u64,
                    coded_len(len as u64, word).unwrap(),
                    "w = {word}, len = {len}"
                );
            }
        }
    }

    #[test]
    fn zero_bytes_code_to_zero_bytes() {
        // Parity over all-zero data is zero, so a zeroed header placeholder
        // stays zeroed on disk.
        let mut encoder = HammingEncoder::new(11, Vec::new()).unwrap();
        encoder.write_bytes(&[0u8; 11]).unwrap();
        let coded = encoder.finish().unwrap();
        assert_eq!(coded, vec![0u8; 15]);
    }
}
