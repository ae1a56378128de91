//! Signature verification of published modules.
//!
//! The wallet refuses to load a module whose jar is unsigned or signed by a
//! key outside its keystore. `verify` runs the same check ahead of time on
//! everything in the publish directory.

use crate::error::{PackagerError, Result};
use crate::executor::{CommandExecutor, CommandSpec, failure_reason};
use crate::module_name::ARCHIVE_EXTENSION;
use crate::publisher::compute_sha256;
use crate::scanner::scan_files;
use crate::signer::SigningKey;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

/// A published archive whose signature checked out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationRecord {
    /// File name of the archive.
    pub file_name: String,
    /// Location of the archive.
    pub path: Utf8PathBuf,
    /// Lowercase hex SHA-256 digest of the archive.
    pub sha256: String,
}

/// Build the `jarsigner -verify` invocation for `jar`.
#[must_use]
pub fn verify_command(key: &SigningKey<'_>, jar: &Utf8Path) -> CommandSpec {
    CommandSpec::new("jarsigner")
        .args(["-verify", "-strict"])
        .args(["-keystore", key.keystore.as_str()])
        .args([jar.as_str(), key.alias])
}

/// Verify every archive in `publish_dir` against `key`.
///
/// An empty or missing publish directory yields an empty list.
///
/// # Errors
///
/// Returns [`PackagerError::Configuration`] for a missing keystore and
/// [`PackagerError::Verification`] naming the first archive that fails.
pub fn verify_published(
    publish_dir: &Utf8Path,
    key: &SigningKey<'_>,
    executor: &dyn CommandExecutor,
) -> Result<Vec<VerificationRecord>> {
    key.ensure_present()?;

    let jars = scan_files(publish_dir, ARCHIVE_EXTENSION).map_err(|e| {
        PackagerError::Verification {
            artifact: publish_dir.to_owned(),
            reason: format!("cannot scan publish directory: {e}"),
        }
    })?;
    if jars.is_empty() {
        log::warn!("no archives found in {publish_dir}");
    }

    jars.into_iter()
        .map(|jar| verify_one(jar, key, executor))
        .collect()
}

fn verify_one(
    jar: Utf8PathBuf,
    key: &SigningKey<'_>,
    executor: &dyn CommandExecutor,
) -> Result<VerificationRecord> {
    let output = executor.run(&verify_command(key, &jar))?;
    if !output.status.success() {
        return Err(PackagerError::Verification {
            artifact: jar,
            reason: failure_reason(&output),
        });
    }

    log::debug!("verified {jar}");
    let sha256 = compute_sha256(&jar).map_err(|e| PackagerError::Verification {
        artifact: jar.clone(),
        reason: format!("cannot digest: {e}"),
    })?;
    let file_name = jar.file_name().unwrap_or(jar.as_str()).to_owned();
    Ok(VerificationRecord {
        file_name,
        path: jar,
        sha256,
    })
}

/// Format verification results for humans.
#[must_use]
pub fn format_human(records: &[VerificationRecord], publish_dir: &Utf8Path) -> String {
    if records.is_empty() {
        return format!("No signed modules found in {publish_dir}");
    }

    let mut lines = vec![format!("Verified modules in {publish_dir}:")];
    for record in records {
        lines.push(format!("  {}  {}", record.sha256, record.file_name));
    }
    lines.join("\n")
}

/// JSON-serializable verification report.
#[derive(Debug, Serialize)]
pub struct VerificationReportJson<'a> {
    /// Directory that was checked.
    pub publish_dir: &'a Utf8Path,
    /// Archives that verified.
    pub modules: &'a [VerificationRecord],
}

/// Format verification results as pretty-printed JSON.
#[must_use]
pub fn format_json(records: &[VerificationRecord], publish_dir: &Utf8Path) -> String {
    let report = VerificationReportJson {
        publish_dir,
        modules: records,
    };
    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_owned())
}
