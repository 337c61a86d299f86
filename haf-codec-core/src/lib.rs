#![warn(missing_docs)]

//! # haf-codec-core
//!
//! Core types and utilities for reading and writing Haf archives: file
//! containers in which every byte, metadata and payload alike, is stored
//! through a single-error-correcting Hamming code. Any one flipped bit in a
//! coded block is detected and silently repaired on read.

/// The Hamming block codec
pub mod codec;

/// The archive container format and its operations
pub mod archive;

pub use bitstream_io;

use bitstream_io::{BigEndian, BitReader};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::archive::reader::read_global_header;
use crate::archive::{ArchiveError, GlobalHeader};

/// Helper function for opening an archive file and decoding its global header.
///
/// Returns the header together with a [`BitReader`] positioned at the first
/// member record.
pub fn open_archive(
    path: &Path,
) -> Result<(GlobalHeader, BitReader<BufReader<File>, BigEndian>), ArchiveError> {
    let file = File::open(path).map_err(|source| ArchiveError::OpenFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BitReader::endian(BufReader::new(file), BigEndian);
    let header = read_global_header(&mut reader)?;
    Ok((header, reader))
}
