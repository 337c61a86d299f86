use crate::codec::{parity_bits, CodecError};
use bitstream_io::{BigEndian, BitRead, BitReader};
use std::collections::VecDeque;
use std::io;
use std::io::{Read, Write};

/// Streaming Hamming block decoder with single-bit correction.
///
/// The decoder does not own the byte source; each call borrows the
/// [`BitReader`] driving it, so the caller stays free to reposition the
/// stream between calls. Decoded data bits that have not yet filled a whole
/// output byte are carried over to the next call, which is what lets a
/// member's metadata and body share one block sequence.
pub struct HammingDecoder {
    word: u8,
    parity: u8,
    pending: VecDeque<bool>,
}

impl HammingDecoder {
    /// Create a decoder for blocks of `word` data bits.
    pub fn new(word: u8) -> Result<Self, CodecError> {
        let parity = parity_bits(word)?;
        Ok(Self {
            word,
            parity,
            pending: VecDeque::with_capacity(word as usize + 8),
        })
    }

    /// Decode exactly `count` bytes, reading just enough blocks from the
    /// stream. Surplus decoded bits stay queued for the next call.
    pub fn decode_exact<R: Read>(
        &mut self,
        reader: &mut BitReader<R, BigEndian>,
        count: usize,
    ) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.next_byte(reader)?);
        }
        Ok(out)
    }

    /// Decode exactly `count` bytes straight into `sink` without collecting
    /// them in memory.
    pub fn decode_to_writer<R: Read, W: Write>(
        &mut self,
        reader: &mut BitReader<R, BigEndian>,
        count: u64,
        sink: &mut W,
    ) -> Result<(), CodecError> {
        let mut buf = [0u8; 4096];
        let mut remaining = count;
        while remaining > 0 {
            let n = remaining.min(buf.len() as u64) as usize;
            for slot in &mut buf[..n] {
                *slot = self.next_byte(reader)?;
            }
            sink.write_all(&buf[..n])?;
            remaining -= n as u64;
        }
        Ok(())
    }

    fn next_byte<R: Read>(
        &mut self,
        reader: &mut BitReader<R, BigEndian>,
    ) -> Result<u8, CodecError> {
        while self.pending.len() < 8 {
            self.digest_block(reader)?;
        }
        let mut byte = 0u8;
        for _ in 0..8 {
            byte <<= 1;
            if self.pending.pop_front() == Some(true) {
                byte |= 1;
            }
        }
        Ok(byte)
    }

    /// Read one coded block, repair at most one flipped bit and queue the
    /// recovered data bits.
    fn digest_block<R: Read>(
        &mut self,
        reader: &mut BitReader<R, BigEndian>,
    ) -> Result<(), CodecError> {
        let len = self.word as usize + self.parity as usize;
        let mut block = vec![false; len + 1];
        for pos in 1..=len {
            block[pos] = reader.read_bit().map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => CodecError::UnexpectedEof,
                _ => CodecError::IoError(e),
            })?;
        }
        let mut syndrome = 0usize;
        for check in 0..self.parity {
            let mask = 1usize << check;
            let mut acc = false;
            for pos in 1..=len {
                if pos & mask != 0 {
                    acc ^= block[pos];
                }
            }
            if acc {
                syndrome += mask;
            }
        }
        // A nonzero syndrome names the offending position, parity positions
        // included. Two or more flips decode to the wrong block; distance-3
        // codes cannot tell.
        if syndrome != 0 {
            block[syndrome] = !block[syndrome];
        }
        for pos in 1..=len {
            if !pos.is_power_of_two() {
                self.pending.push_back(block[pos]);
            }
        }
        Ok(())
    }
}
