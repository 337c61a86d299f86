//! The archive operations: create, list, extract, append, delete and
//! concatenate. Each call opens its own file handles, streams members
//! through the codec in bounded chunks and leaves no shared state behind.

use crate::archive::reader::{MemberMeta, MemberReader};
use crate::archive::writer::ArchiveWriter;
use crate::archive::{
    coded_member_len, member_name, path_with_suffix, ArchiveError, GlobalHeader,
    CODED_HEADER_LEN, DEFAULT_WORD_LENGTH, TMP_SUFFIX,
};
use crate::open_archive;
use bitstream_io::{BigEndian, BitReader};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Sizes reported by a successful [`create`].
#[derive(Debug, Clone, Copy)]
pub struct CreateSummary {
    /// Combined size of the input files before coding.
    pub input_bytes: u64,

    /// Archive size computed ahead of writing and stored in the header.
    pub predicted_size: u32,

    /// Actual on-disk size after writing.
    pub written_size: u64,

    /// Number of members written.
    pub member_count: u32,
}

/// Header states reported by a successful [`append`] or [`delete`].
#[derive(Debug, Clone, Copy)]
pub struct RewriteSummary {
    /// The global header as it stood before the operation.
    pub before: GlobalHeader,

    /// Archive size recorded afterwards.
    pub archive_size: u32,

    /// Member count recorded afterwards.
    pub member_count: u32,
}

/// An archive's header and its member table, as returned by [`list`].
#[derive(Debug, Clone)]
pub struct Listing {
    /// The decoded global header.
    pub header: GlobalHeader,

    /// Name and body size of every member, in archive order.
    pub members: Vec<MemberMeta>,
}

/// Pack `inputs` into a new archive at `archive`, coded at `word` data bits
/// per block. Inputs must be regular files; the stored names are basenames.
pub fn create(archive: &Path, inputs: &[PathBuf], word: u8) -> Result<CreateSummary, ArchiveError> {
    create_with_suffix(archive, inputs, word, "")
}

pub(crate) fn create_with_suffix(
    archive: &Path,
    inputs: &[PathBuf],
    word: u8,
    suffix: &str,
) -> Result<CreateSummary, ArchiveError> {
    let (input_bytes, data_size) = predict_sizes(inputs, word, suffix)?;
    let predicted =
        u32::try_from(CODED_HEADER_LEN + data_size).map_err(|_| ArchiveError::TooLarge)?;

    let file = File::create(archive).map_err(|source| ArchiveError::OpenFailed {
        path: archive.to_path_buf(),
        source,
    })?;
    let mut writer = ArchiveWriter::new(word, BufWriter::new(file))?;
    writer.write_global_header(&GlobalHeader::new(predicted, inputs.len() as u32, word))?;
    for input in inputs {
        writer.write_member(input, suffix)?;
    }
    writer.into_sink().flush()?;

    Ok(CreateSummary {
        input_bytes,
        predicted_size: predicted,
        written_size: fs::metadata(archive)?.len(),
        member_count: inputs.len() as u32,
    })
}

/// Validate the inputs and total their raw and coded sizes.
fn predict_sizes(
    inputs: &[PathBuf],
    word: u8,
    suffix: &str,
) -> Result<(u64, u64), ArchiveError> {
    let mut input_bytes = 0u64;
    let mut data_size = 0u64;
    for input in inputs {
        let source = path_with_suffix(input, suffix);
        let meta = fs::metadata(&source).map_err(|_| ArchiveError::FileNotFound(source.clone()))?;
        if !meta.is_file() {
            return Err(ArchiveError::FileNotFound(source));
        }
        let body_len = u32::try_from(meta.len()).map_err(|_| ArchiveError::TooLarge)?;
        let name = member_name(input)?;
        input_bytes += meta.len();
        data_size += coded_member_len(name.len() as u8, body_len, word)?;
    }
    Ok((input_bytes, data_size))
}

/// Read the header and member table of the archive at `archive`.
pub fn list(archive: &Path) -> Result<Listing, ArchiveError> {
    let (header, mut reader) = open_archive(archive)?;
    let mut members = Vec::with_capacity(header.member_count as usize);
    for _ in 0..header.member_count {
        let mut member = MemberReader::begin(header.word_length, &mut reader)?;
        let meta = member.read_meta(&mut reader)?;
        member.skip_body(&mut reader, &meta)?;
        members.push(meta);
    }
    Ok(Listing { header, members })
}

/// Unpack every member of `archive` into the archive's directory, appending
/// `suffix` to each output filename. Returns the written names (with the
/// suffix). Colliding names overwrite earlier extractions.
pub fn extract(archive: &Path, suffix: &str) -> Result<Vec<String>, ArchiveError> {
    let (header, mut reader) = open_archive(archive)?;
    let dir = archive.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut written = Vec::with_capacity(header.member_count as usize);
    for _ in 0..header.member_count {
        let mut member = MemberReader::begin(header.word_length, &mut reader)?;
        let meta = member.read_meta(&mut reader)?;
        let name = format!("{}{}", meta.name, suffix);
        let out_path = dir.join(&name);
        let out = File::create(&out_path).map_err(|source| ArchiveError::OpenFailed {
            path: out_path.clone(),
            source,
        })?;
        let mut sink = BufWriter::new(out);
        member.extract_body(&mut reader, &meta, &mut sink)?;
        sink.flush()?;
        written.push(name);
    }
    Ok(written)
}

/// Add `inputs` to the end of an existing archive, rewriting the 15-byte
/// header in place with the updated size and count.
pub fn append(archive: &Path, inputs: &[PathBuf]) -> Result<RewriteSummary, ArchiveError> {
    let (before, _) = open_archive(archive)?;
    let (_, added) = predict_sizes(inputs, before.word_length, "")?;
    let archive_size = u32::try_from(u64::from(before.archive_size) + added)
        .map_err(|_| ArchiveError::TooLarge)?;
    let member_count = before.member_count + inputs.len() as u32;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(archive)
        .map_err(|source| ArchiveError::OpenFailed {
            path: archive.to_path_buf(),
            source,
        })?;
    let mut writer = ArchiveWriter::new(before.word_length, BufWriter::new(file))?;
    writer.write_global_header(&GlobalHeader::new(
        archive_size,
        member_count,
        before.word_length,
    ))?;
    writer.seek_to(u64::from(before.archive_size))?;
    for input in inputs {
        writer.write_member(input, "")?;
    }
    writer.into_sink().flush()?;

    Ok(RewriteSummary {
        before,
        archive_size,
        member_count,
    })
}

/// Remove the named members, rewriting the archive through a sibling
/// temporary that atomically replaces it on success. Each requested name
/// removes its first occurrence; a name with no occurrence fails the whole
/// operation with [`ArchiveError::MemberNotFound`], the original archive
/// untouched and the temporary cleaned up.
pub fn delete(archive: &Path, names: &[String]) -> Result<RewriteSummary, ArchiveError> {
    let (before, mut reader) = open_archive(archive)?;

    let tmp_path = path_with_suffix(archive, TMP_SUFFIX);
    let tmp = File::create(&tmp_path).map_err(|source| ArchiveError::OpenFailed {
        path: tmp_path.clone(),
        source,
    })?;
    let mut writer = ArchiveWriter::new(before.word_length, BufWriter::new(tmp))?;

    match rewrite_kept_members(&mut reader, &mut writer, &before, names) {
        Ok(archive_size) => {
            let member_count = before.member_count - names.len() as u32;
            let mut sink = writer.into_sink();
            sink.flush()?;
            let mut tmp_file = sink
                .into_inner()
                .map_err(|e| ArchiveError::IoError(e.into_error()))?;
            tmp_file.seek(SeekFrom::Start(0))?;
            let mut header_writer = ArchiveWriter::new(before.word_length, &mut tmp_file)?;
            header_writer.write_global_header(&GlobalHeader::new(
                archive_size,
                member_count,
                before.word_length,
            ))?;
            drop(header_writer);
            drop(tmp_file);
            fs::rename(&tmp_path, archive)?;
            Ok(RewriteSummary {
                before,
                archive_size,
                member_count,
            })
        }
        Err(err) => {
            drop(writer);
            let _ = fs::remove_file(&tmp_path);
            Err(err)
        }
    }
}

/// Scan every member once: skipped members are seeked past, kept members are
/// copied byte-for-byte in coded form after seeking back over the metadata
/// bytes the scan consumed.
fn rewrite_kept_members<R: Read + Seek, W: Write>(
    reader: &mut BitReader<R, BigEndian>,
    writer: &mut ArchiveWriter<W>,
    header: &GlobalHeader,
    names: &[String],
) -> Result<u32, ArchiveError> {
    writer.write_global_header(&GlobalHeader::zeroed())?;
    let mut pending: Vec<&String> = names.iter().collect();
    let mut archive_size = header.archive_size;
    for _ in 0..header.member_count {
        let mut member = MemberReader::begin(header.word_length, reader)?;
        let meta = member.read_meta(reader)?;
        let total = member.total_coded_bytes(&meta)?;
        if let Some(idx) = pending.iter().position(|name| **name == meta.name) {
            pending.remove(idx);
            archive_size -= total as u32;
            member.skip_body(reader, &meta)?;
        } else {
            member.rewind(reader)?;
            writer.copy_raw(reader, total)?;
        }
    }
    if let Some(missing) = pending.first() {
        return Err(ArchiveError::MemberNotFound((*missing).to_string()));
    }
    Ok(archive_size)
}

/// Merge the members of `sources` into a new archive at `archive`, coded at
/// the default word length.
///
/// Members are extracted next to their source archive under the `.tmp`
/// suffix and re-read next to the output, so the sources and the output are
/// expected to share a directory. Not atomic: temporaries may remain if it
/// fails partway.
pub fn concatenate(archive: &Path, sources: &[PathBuf]) -> Result<CreateSummary, ArchiveError> {
    let dir = archive.parent().map(Path::to_path_buf).unwrap_or_default();
    let mut collected = Vec::new();
    for source in sources {
        for name in extract(source, TMP_SUFFIX)? {
            let logical = name.strip_suffix(TMP_SUFFIX).unwrap_or(&name).to_string();
            collected.push(dir.join(logical));
        }
    }
    let summary = create_with_suffix(archive, &collected, DEFAULT_WORD_LENGTH, TMP_SUFFIX)?;
    for path in &collected {
        // Colliding member names share one temporary; the second unlink is
        // allowed to find it already gone.
        let _ = fs::remove_file(path_with_suffix(path, TMP_SUFFIX));
    }
    Ok(summary)
}
