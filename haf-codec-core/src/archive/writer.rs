use crate::archive::{
    member_name, path_with_suffix, ArchiveError, GlobalHeader, DEFAULT_WORD_LENGTH,
};
use crate::codec::encoder::HammingEncoder;
use crate::codec::parity_bits;
use bitstream_io::{BigEndian, BitRead, BitReader};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Emits the container: the coded global header and coded member records.
///
/// The word length given at construction governs member records only; the
/// global header is always coded at [`DEFAULT_WORD_LENGTH`].
pub struct ArchiveWriter<W: Write> {
    word: u8,
    sink: W,
}

impl<W: Write> ArchiveWriter<W> {
    /// Create a writer emitting member records at `word` data bits per block.
    pub fn new(word: u8, sink: W) -> Result<Self, ArchiveError> {
        parity_bits(word)?;
        Ok(Self { word, sink })
    }

    /// Emit `header` as the fixed 15-byte coded prefix.
    pub fn write_global_header(&mut self, header: &GlobalHeader) -> Result<(), ArchiveError> {
        let mut encoder = HammingEncoder::new(DEFAULT_WORD_LENGTH, &mut self.sink)?;
        encoder.write_bytes(&header.to_bytes()?)?;
        encoder.finish()?;
        Ok(())
    }

    /// Encode one member record for the file at `path` + `suffix`.
    ///
    /// The length-prefixed basename of `path`, the body length and the
    /// streamed body all go through a single fresh encoder, so the metadata
    /// and body share one padded block sequence.
    pub fn write_member(&mut self, path: &Path, suffix: &str) -> Result<(), ArchiveError> {
        let source_path = path_with_suffix(path, suffix);
        let file = File::open(&source_path).map_err(|source| ArchiveError::OpenFailed {
            path: source_path.clone(),
            source,
        })?;
        let body_len =
            u32::try_from(file.metadata()?.len()).map_err(|_| ArchiveError::TooLarge)?;
        let name = member_name(path)?;

        let mut encoder = HammingEncoder::new(self.word, &mut self.sink)?;
        let mut meta = Vec::with_capacity(name.len() + 5);
        meta.push(name.len() as u8);
        meta.extend_from_slice(name.as_bytes());
        meta.extend_from_slice(&body_len.to_le_bytes());
        encoder.write_bytes(&meta)?;

        let mut input = BufReader::new(file);
        let mut buf = [0u8; 4096];
        loop {
            let n = input.read(&mut buf)?;
            if n == 0 {
                break;
            }
            encoder.write_bytes(&buf[..n])?;
        }
        encoder.finish()?;
        Ok(())
    }

    /// Copy `count` already-coded bytes verbatim from a byte-aligned reader.
    pub fn copy_raw<R: Read>(
        &mut self,
        reader: &mut BitReader<R, BigEndian>,
        count: u64,
    ) -> Result<(), ArchiveError> {
        let mut buf = [0u8; 4096];
        let mut remaining = count;
        while remaining > 0 {
            let n = remaining.min(buf.len() as u64) as usize;
            reader.read_bytes(&mut buf[..n])?;
            self.sink.write_all(&buf[..n])?;
            remaining -= n as u64;
        }
        Ok(())
    }

    /// Hand back the sink. The caller is responsible for flushing it.
    pub fn into_sink(self) -> W {
        self.sink
    }
}

impl<W: Write + Seek> ArchiveWriter<W> {
    /// Reposition the sink to an absolute byte offset.
    pub fn seek_to(&mut self, pos: u64) -> Result<(), ArchiveError> {
        self.sink.seek(SeekFrom::Start(pos))?;
        Ok(())
    }
}
