//! Directory scanning for staged and published artifacts.
//!
//! The archive, sign and verify phases operate on whatever matching files
//! the directory holds when it is scanned, not on the configured module
//! list. Stray files left by earlier runs are therefore processed too.

use camino::{Utf8Path, Utf8PathBuf};
use std::io;

/// List regular files in `dir` whose extension is `extension`.
///
/// Results are sorted by file name. A missing directory yields an empty
/// list.
///
/// # Errors
///
/// Returns an error if the directory cannot be read or holds a non-UTF-8
/// file name.
pub fn scan_files(dir: &Utf8Path, extension: &str) -> io::Result<Vec<Utf8PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in dir.read_dir_utf8()? {
        let entry = entry?;
        let path = entry.path();
        if path.extension() == Some(extension) && entry.file_type()?.is_file() {
            files.push(path.to_owned());
        }
    }

    files.sort();
    Ok(files)
}
