//! Zip archive builder for the staged tree.
//!
//! Entries are written relative to the staged root; the root itself is not
//! an entry. Unlike the copy phase, any failure here is fatal to the run.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::error::RunError;

/// Pack everything under `staged` into a fresh zip file at `output`,
/// deleting any file already there.
pub fn build_archive(staged: &Path, output: &Path) -> Result<(), RunError> {
    if output.exists() {
        fs::remove_file(output).map_err(|e| RunError::ReplaceOutput {
            path: output.to_path_buf(),
            source: e,
        })?;
    }

    let archive_error = |e: ZipError| RunError::Archive {
        path: output.to_path_buf(),
        source: e,
    };
    let archive_io_error = |e: io::Error| archive_error(ZipError::Io(e));

    let file = File::create(output).map_err(archive_io_error)?;
    let mut writer = ZipWriter::new(BufWriter::new(file));

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    for entry in WalkDir::new(staged).min_depth(1) {
        let entry = entry.map_err(|e| archive_io_error(io::Error::from(e)))?;
        let relative = entry
            .path()
            .strip_prefix(staged)
            .expect("entry should be under the staged root");
        let name = relative.to_string_lossy().replace('\\', "/");

        if entry.file_type().is_dir() {
            debug!(entry = %name, "Adding directory entry");
            writer
                .add_directory(format!("{name}/"), options)
                .map_err(archive_error)?;
        } else if entry.file_type().is_file() {
            debug!(entry = %name, "Deflating file entry");
            writer.start_file(name, options).map_err(archive_error)?;
            let mut source = File::open(entry.path()).map_err(archive_io_error)?;
            io::copy(&mut source, &mut writer).map_err(archive_io_error)?;
        }
    }

    writer.finish().map_err(archive_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Read;
    use tempfile::tempdir;
    use zip::ZipArchive;

    fn read_archive(path: &Path) -> BTreeMap<String, Vec<u8>> {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut entries = BTreeMap::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).unwrap();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            entries.insert(entry.name().to_string(), content);
        }
        entries
    }

    #[test]
    fn round_trips_the_staged_tree() {
        let temp = tempdir().unwrap();
        let staged = temp.path().join("staged");
        let output = temp.path().join("out.zip");

        fs::create_dir_all(staged.join("src/deep")).unwrap();
        fs::write(staged.join("readme.md"), b"# hello").unwrap();
        fs::write(staged.join("src/deep/code.rs"), b"fn x() {}").unwrap();

        build_archive(&staged, &output).unwrap();

        let entries = read_archive(&output);
        assert_eq!(entries["readme.md"], b"# hello");
        assert_eq!(entries["src/deep/code.rs"], b"fn x() {}");
        assert!(entries.contains_key("src/"));
        assert!(entries.contains_key("src/deep/"));
        // The staged root itself is not a named entry
        assert!(entries.keys().all(|k| !k.starts_with("staged")));
    }

    #[test]
    fn replaces_an_existing_output_file() {
        let temp = tempdir().unwrap();
        let staged = temp.path().join("staged");
        let output = temp.path().join("out.zip");

        fs::create_dir(&staged).unwrap();
        fs::write(staged.join("only.txt"), b"new contents").unwrap();
        fs::write(&output, b"definitely not a zip file").unwrap();

        build_archive(&staged, &output).unwrap();

        let entries = read_archive(&output);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries["only.txt"], b"new contents");
    }

    #[test]
    fn empty_staged_tree_produces_an_empty_archive() {
        let temp = tempdir().unwrap();
        let staged = temp.path().join("staged");
        let output = temp.path().join("out.zip");
        fs::create_dir(&staged).unwrap();

        build_archive(&staged, &output).unwrap();

        assert!(read_archive(&output).is_empty());
    }

    #[test]
    fn unwritable_output_location_is_fatal() {
        let temp = tempdir().unwrap();
        let staged = temp.path().join("staged");
        fs::create_dir(&staged).unwrap();

        // Output parent does not exist
        let output = temp.path().join("missing-dir/out.zip");
        let result = build_archive(&staged, &output);
        assert!(matches!(result, Err(RunError::Archive { .. })));
    }
}
