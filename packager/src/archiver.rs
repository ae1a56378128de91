//! Class-to-jar archiving.
//!
//! Scans the staging directory afresh for `.class` files and turns each one
//! into a `.jar` with the same base name, removing the class file once the
//! archive exists. The class file sits at the root of the archive, as
//! `jar cf` produces it when run from the staging directory.

use crate::config::ArchiveTool;
use crate::error::{PackagerError, Result};
use crate::executor::{CommandExecutor, CommandSpec, failure_reason};
use crate::module_name::{ARCHIVE_EXTENSION, CLASS_EXTENSION};
use crate::scanner::scan_files;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::Write;
use zip::write::SimpleFileOptions;

/// Manifest written into archives produced by [`ArchiveTool::Builtin`].
const BUILTIN_MANIFEST: &str = "Manifest-Version: 1.0\r\nCreated-By: wallet-packager\r\n\r\n";

/// Archive every staged class file in `staging_dir`.
///
/// Returns the archives produced, sorted by name.
///
/// # Errors
///
/// Returns [`PackagerError::Archive`] for the first file that cannot be
/// archived; that file's class is left in place.
pub fn archive_staged(
    staging_dir: &Utf8Path,
    tool: ArchiveTool,
    executor: &dyn CommandExecutor,
) -> Result<Vec<Utf8PathBuf>> {
    let classes =
        scan_files(staging_dir, CLASS_EXTENSION).map_err(|e| PackagerError::Archive {
            file: staging_dir.to_owned(),
            reason: format!("cannot scan staging directory: {e}"),
        })?;
    let mut archives = Vec::with_capacity(classes.len());

    for class_file in &classes {
        let archive = archive_path_for(class_file);
        match tool {
            ArchiveTool::Jar => archive_with_jar(staging_dir, class_file, &archive, executor)?,
            ArchiveTool::Builtin => archive_builtin(class_file, &archive)?,
        }

        fs::remove_file(class_file).map_err(|e| PackagerError::Archive {
            file: class_file.clone(),
            reason: format!("archived but could not remove class file: {e}"),
        })?;
        log::debug!("archived {class_file} -> {archive}");
        archives.push(archive);
    }

    Ok(archives)
}

/// Path of the archive produced for `class_file`.
#[must_use]
pub fn archive_path_for(class_file: &Utf8Path) -> Utf8PathBuf {
    class_file.with_extension(ARCHIVE_EXTENSION)
}

fn entry_name(class_file: &Utf8Path) -> Result<&str> {
    class_file.file_name().ok_or_else(|| PackagerError::Archive {
        file: class_file.to_owned(),
        reason: "path has no file name".to_owned(),
    })
}

fn archive_with_jar(
    staging_dir: &Utf8Path,
    class_file: &Utf8Path,
    archive: &Utf8Path,
    executor: &dyn CommandExecutor,
) -> Result<()> {
    let command = CommandSpec::new("jar")
        .args(["cf", archive.as_str(), entry_name(class_file)?])
        .current_dir(staging_dir);
    let output = executor.run(&command)?;

    if output.status.success() {
        Ok(())
    } else {
        Err(PackagerError::Archive {
            file: class_file.to_owned(),
            reason: failure_reason(&output),
        })
    }
}

fn archive_builtin(class_file: &Utf8Path, archive: &Utf8Path) -> Result<()> {
    let archive_error = |reason: String| PackagerError::Archive {
        file: class_file.to_owned(),
        reason,
    };

    let name = entry_name(class_file)?;
    let class_bytes = fs::read(class_file).map_err(|e| archive_error(e.to_string()))?;
    let file = fs::File::create(archive).map_err(|e| archive_error(e.to_string()))?;

    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    writer
        .add_directory("META-INF/", options)
        .map_err(|e| archive_error(e.to_string()))?;
    writer
        .start_file("META-INF/MANIFEST.MF", options)
        .map_err(|e| archive_error(e.to_string()))?;
    writer
        .write_all(BUILTIN_MANIFEST.as_bytes())
        .map_err(|e| archive_error(e.to_string()))?;
    writer
        .start_file(name, options)
        .map_err(|e| archive_error(e.to_string()))?;
    writer
        .write_all(&class_bytes)
        .map_err(|e| archive_error(e.to_string()))?;
    writer.finish().map_err(|e| archive_error(e.to_string()))?;
    Ok(())
}
