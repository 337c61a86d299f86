use clap::Parser;
use haf_codec_core::archive::ops;
use haf_codec_core::archive::DEFAULT_WORD_LENGTH;
use std::io::Write;
use std::path::PathBuf;
use std::{error, io};

/// Command line argument parser
///
/// The operation flags may be combined in one invocation (for example
/// `-c ... -l`); they always run in the order create, extract, append,
/// delete, concatenate, list.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Path of the Haf archive to operate on
    #[clap(short = 'f', long = "file")]
    pub(crate) file: PathBuf,

    /// Pack the given files into a new archive
    #[clap(short, long, action)]
    pub(crate) create: bool,

    /// List the archive's members
    #[clap(short, long, action)]
    pub(crate) list: bool,

    /// Unpack every member into the archive's directory
    #[clap(short = 'x', long, action)]
    pub(crate) extract: bool,

    /// Add the given files to the end of the archive
    #[clap(short, long, action)]
    pub(crate) append: bool,

    /// Remove the named members, rewriting the archive
    #[clap(short, long, action)]
    pub(crate) delete: bool,

    /// Merge the given archives into a new archive at the target path
    #[clap(short = 'A', long, action)]
    pub(crate) concatenate: bool,

    /// Data bits per coded block for newly created archives
    #[clap(short, long, default_value_t = DEFAULT_WORD_LENGTH)]
    pub(crate) word: u8,

    /// Input paths or member names, depending on the selected commands
    pub(crate) free_args: Vec<String>,
}

fn main() -> Result<(), Box<dyn error::Error>> {
    let args: Args = Args::parse();
    let paths: Vec<PathBuf> = args.free_args.iter().map(PathBuf::from).collect();

    let stdout = io::stdout();
    let mut handle = io::BufWriter::new(stdout.lock());

    writeln!(handle, "-------------")?;
    if args.create {
        writeln!(handle, "Creating Haf \"{}\"", args.file.display())?;
        handle.flush()?;
        let summary = ops::create(&args.file, &paths, args.word)?;
        writeln!(handle, "Primary files size: {}B", summary.input_bytes)?;
        writeln!(handle, "Total theoretical size: {}B", summary.predicted_size)?;
        writeln!(handle, "Result size: {}B", summary.written_size)?;
        writeln!(handle, "-------------")?;
    }
    if args.extract {
        writeln!(handle, "Extracting from Haf \"{}\"", args.file.display())?;
        handle.flush()?;
        let files = ops::extract(&args.file, "")?;
        writeln!(handle, "Written files (in Haf directory):")?;
        for filename in &files {
            writeln!(handle, "\"{filename}\"")?;
        }
        writeln!(handle, "-------------")?;
    }
    if args.append {
        writeln!(handle, "Appending files to Haf \"{}\"", args.file.display())?;
        handle.flush()?;
        let summary = ops::append(&args.file, &paths)?;
        writeln!(handle, "Archive size before: {}B", summary.before.archive_size)?;
        writeln!(handle, "Files number before: {}", summary.before.member_count)?;
        writeln!(handle, "Final archive size: {}B", summary.archive_size)?;
        writeln!(handle, "Files number after: {}", summary.member_count)?;
        writeln!(handle, "-------------")?;
    }
    if args.delete {
        writeln!(handle, "Deleting files from Haf \"{}\"", args.file.display())?;
        handle.flush()?;
        let summary = ops::delete(&args.file, &args.free_args)?;
        writeln!(handle, "Archive size before: {}B", summary.before.archive_size)?;
        writeln!(handle, "Files number before: {}", summary.before.member_count)?;
        writeln!(handle, "Final archive size: {}B", summary.archive_size)?;
        writeln!(handle, "Files number after: {}", summary.member_count)?;
        writeln!(handle, "-------------")?;
    }
    if args.concatenate {
        writeln!(handle, "Concatenating into Haf \"{}\"", args.file.display())?;
        handle.flush()?;
        let summary = ops::concatenate(&args.file, &paths)?;
        writeln!(handle, "Merged files number: {}", summary.member_count)?;
        writeln!(handle, "Result size: {}B", summary.written_size)?;
        writeln!(handle, "-------------")?;
    }
    if args.list {
        writeln!(handle, "Reading Haf \"{}\"", args.file.display())?;
        handle.flush()?;
        let listing = ops::list(&args.file)?;
        writeln!(handle, "Archive size: {}B", listing.header.archive_size)?;
        writeln!(handle, "Files number: {}", listing.header.member_count)?;
        writeln!(handle, "Coded with word: {}bit", listing.header.word_length)?;
        writeln!(handle, "Found files:")?;
        for member in &listing.members {
            writeln!(handle, "\"{}\" {}B", member.name, member.body_len)?;
        }
        writeln!(handle, "-------------")?;
    }
    handle.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_cmd::prelude::*;
    use predicates::prelude::*;
    use std::process::Command;

    #[test]
    fn create_then_list() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("notes.txt");
        std::fs::write(&input, b"hello haf")?;
        let archive = dir.path().join("notes.haf");

        let mut cmd = Command::cargo_bin("haf-archiver")?;
        cmd.arg("--file")
            .arg(&archive)
            .arg("--create")
            .arg("--list")
            .arg(&input);
        cmd.assert()
            .success()
            .stdout(predicate::str::contains("Creating Haf"))
            .stdout(predicate::str::contains("Coded with word: 11bit"))
            .stdout(predicate::str::contains("\"notes.txt\" 9B"));

        Ok(())
    }

    #[test]
    fn round_trip_through_the_binary() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let inputs = dir.path().join("inputs");
        std::fs::create_dir(&inputs)?;
        let input = inputs.join("blob.bin");
        let payload: Vec<u8> = (0u16..800).map(|i| (i % 251) as u8).collect();
        std::fs::write(&input, &payload)?;
        let archive = dir.path().join("blob.haf");

        Command::cargo_bin("haf-archiver")?
            .arg("-f")
            .arg(&archive)
            .arg("-c")
            .arg("-w")
            .arg("26")
            .arg(&input)
            .assert()
            .success();

        Command::cargo_bin("haf-archiver")?
            .arg("-f")
            .arg(&archive)
            .arg("-x")
            .assert()
            .success()
            .stdout(predicate::str::contains("\"blob.bin\""));

        assert_eq!(std::fs::read(dir.path().join("blob.bin"))?, payload);
        Ok(())
    }
}
