#![warn(missing_docs)]

//! The Haf container format.
//!
//! A Haf archive is one fixed 15-byte coded global header followed by zero or
//! more member records. The header is always coded at the default word length
//! so it can be decoded before the archive's own word length is known; each
//! member record is the logical stream `name_len | name | body_len | body`
//! coded at the archive's word length, with the final block of the record
//! zero-padded and the record rounded up to a whole on-disk byte.

/// The five archive operations plus concatenation
pub mod ops;

/// Header and member record parsing
pub mod reader;

/// Header and member record emission
pub mod writer;

use crate::codec::{coded_len, CodecError};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub(crate) type Magic = [u8; 2];
pub(crate) const MAGIC: Magic = [b'H', b'A']; // 'HA' in ASCII

/// Number of logical bytes in the global header.
pub const HEADER_LEN: u64 = 11;

/// On-disk size of the global header once coded at the default word length.
pub const CODED_HEADER_LEN: u64 = 15;

/// Word length used for the global header and as the default for members.
pub const DEFAULT_WORD_LENGTH: u8 = 11;

/// Filename suffix for the temporaries created by Delete and Concatenate.
pub const TMP_SUFFIX: &str = ".tmp";

const NAME_LEN_SIZE: u64 = 1;
const BODY_LEN_SIZE: u64 = 4;

#[allow(missing_docs)]
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Trying to open not a Haf")]
    NotAnArchive,

    #[error("File [{}] does not exist", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to open {}", path.display())]
    OpenFailed { path: PathBuf, source: io::Error },

    #[error("File {0} was not found in archive")]
    MemberNotFound(String),

    #[error("File name [{0}] does not fit the one-byte name length field")]
    NameTooLong(String),

    #[error("Archive size does not fit the 32-bit size field")]
    TooLarge,

    #[error("Codec error")]
    Codec(#[from] CodecError),

    #[error("Bincode error")]
    BincodeError(#[from] bincode::Error),

    #[error("IO error")]
    IoError(#[from] io::Error),
}

/// Archive-wide metadata stored at the front of every Haf file.
///
/// Serialized as 11 logical bytes: the magic, two little-endian 32-bit
/// counters and the word length.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct GlobalHeader {
    pub(crate) magic: Magic,

    /// Total on-disk size of the coded archive in bytes.
    pub archive_size: u32,

    /// Number of member files.
    pub member_count: u32,

    /// Data bits per coded block for the member records.
    pub word_length: u8,
}

fn bincode_options() -> impl Options {
    // Fixed-width little-endian integers; the format never varint-packs.
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
}

impl GlobalHeader {
    /// Build a header carrying the archive magic.
    pub fn new(archive_size: u32, member_count: u32, word_length: u8) -> Self {
        Self {
            magic: MAGIC,
            archive_size,
            member_count,
            word_length,
        }
    }

    /// The all-zero placeholder written while a rewrite is in progress.
    pub(crate) fn zeroed() -> Self {
        Self::default()
    }

    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>, ArchiveError> {
        Ok(bincode_options().serialize(self)?)
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Result<Self, ArchiveError> {
        let header: GlobalHeader = bincode_options().deserialize(bytes)?;
        if header.magic != MAGIC {
            return Err(ArchiveError::NotAnArchive);
        }
        Ok(header)
    }
}

/// On-disk size of one coded member record.
pub fn coded_member_len(name_len: u8, body_len: u32, word: u8) -> Result<u64, CodecError> {
    coded_len(
        NAME_LEN_SIZE + u64::from(name_len) + BODY_LEN_SIZE + u64::from(body_len),
        word,
    )
}

/// Member name for `path`: the basename, checked against the one-byte name
/// length field.
pub(crate) fn member_name(path: &Path) -> Result<String, ArchiveError> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| ArchiveError::FileNotFound(path.to_path_buf()))?;
    if name.is_empty() || name.len() > 255 {
        return Err(ArchiveError::NameTooLong(name));
    }
    Ok(name)
}

/// `path` with `suffix` appended to its final component.
pub(crate) fn path_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    if suffix.is_empty() {
        return path.to_path_buf();
    }
    let mut os = OsString::from(path.as_os_str());
    os.push(suffix);
    PathBuf::from(os)
}
