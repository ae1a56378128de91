//! Publishing signed archives into the project tree.
//!
//! Publishing only ever sees archives that `jarsigner` accepted: the
//! pipeline calls it after the signing phase has completed for every
//! archive.

use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;

/// A signed archive copied into the publish directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedArtifact {
    /// File name of the archive, e.g. `PinModule.jar`.
    pub file_name: String,
    /// Location inside the publish directory.
    pub path: Utf8PathBuf,
    /// Lowercase hex SHA-256 digest of the published file.
    pub sha256: String,
}

/// Compute the SHA-256 digest of a file as lowercase hex.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read.
pub fn compute_sha256(path: &Utf8Path) -> Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(buffer.get(..bytes_read).unwrap_or_default());
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Copy every signed archive into `publish_dir`, creating it if needed.
///
/// Existing files with the same name are overwritten; other files in the
/// directory are left untouched.
///
/// # Errors
///
/// Returns [`PackagerError::Publish`] naming the first archive that cannot
/// be copied.
pub fn publish_signed(
    signed: &[Utf8PathBuf],
    publish_dir: &Utf8Path,
) -> Result<Vec<PublishedArtifact>> {
    fs::create_dir_all(publish_dir).map_err(|e| PackagerError::Publish {
        artifact: publish_dir.to_owned(),
        reason: format!("cannot create publish directory: {e}"),
    })?;

    signed
        .iter()
        .map(|artifact| publish_one(artifact, publish_dir))
        .collect()
}

fn publish_one(artifact: &Utf8Path, publish_dir: &Utf8Path) -> Result<PublishedArtifact> {
    let publish_error = |reason: String| PackagerError::Publish {
        artifact: artifact.to_owned(),
        reason,
    };

    let file_name = artifact
        .file_name()
        .ok_or_else(|| publish_error("path has no file name".to_owned()))?;
    let dest = publish_dir.join(file_name);

    fs::copy(artifact, &dest).map_err(|e| publish_error(e.to_string()))?;
    let sha256 = compute_sha256(&dest)
        .map_err(|e| publish_error(format!("cannot digest {dest}: {e}")))?;
    log::info!("published {dest} (sha256 {sha256})");

    Ok(PublishedArtifact {
        file_name: file_name.to_owned(),
        path: dest,
        sha256,
    })
}
