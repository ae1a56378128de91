//! Packaging pipeline orchestration.
//!
//! Runs the phases in a fixed order: ensure staging directory, stage,
//! archive, sign, publish. Each phase finishes for every artifact before
//! the next one starts, and the first error aborts the run.

use crate::archiver::archive_staged;
use crate::config::PackagerConfig;
use crate::credentials::CredentialProvider;
use crate::error::Result;
use crate::executor::CommandExecutor;
use crate::output::{success_message, write_stderr_line};
use crate::privilege::{StagingDirOutcome, ensure_staging_dir};
use crate::publisher::{PublishedArtifact, publish_signed};
use crate::signer::{SigningKey, sign_staged};
use crate::stager::Stager;
use camino::Utf8PathBuf;
use std::io::Write;

/// Everything a packaging run needs.
pub struct PipelineContext<'a> {
    /// Resolved configuration.
    pub config: &'a PackagerConfig,
    /// Runs `sudo`, `jar` and `jarsigner`.
    pub executor: &'a dyn CommandExecutor,
    /// Supplies the administrator and keystore passwords.
    pub credentials: &'a dyn CredentialProvider,
    /// Suppress progress output.
    pub quiet: bool,
}

/// What a successful packaging run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagingReport {
    /// Whether the staging directory had to be created.
    pub staging_dir: StagingDirOutcome,
    /// Class files copied into the staging directory.
    pub staged: Vec<Utf8PathBuf>,
    /// Archives produced from staged class files.
    pub archived: Vec<Utf8PathBuf>,
    /// Archives signed in place.
    pub signed: Vec<Utf8PathBuf>,
    /// Signed archives copied into the publish directory.
    pub published: Vec<PublishedArtifact>,
}

/// Run every packaging phase.
///
/// # Errors
///
/// Returns the first error raised by any phase. Nothing is published unless
/// every archive was signed.
pub fn run_packaging(
    context: &PipelineContext<'_>,
    stderr: &mut dyn Write,
) -> Result<PackagingReport> {
    let config = context.config;
    let mut progress = |message: String| {
        if !context.quiet {
            write_stderr_line(stderr, message);
        }
    };

    progress(format!("Preparing staging directory {}...", config.staging_dir));
    let staging_dir = ensure_staging_dir(
        &config.staging_dir,
        config.invoking_user.as_deref(),
        context.executor,
        context.credentials,
    )?;

    progress(format!("Staging {} module(s)...", config.module_names.len()));
    let stager = Stager::new(&config.project_root, &config.staging_dir);
    let staged = stager.stage_all(&config.module_names)?;
    log::info!("staged {} class file(s)", staged.len());

    progress(format!("Archiving with {}...", config.archive_tool));
    let archived = archive_staged(stager.staging_dir(), config.archive_tool, context.executor)?;
    log::info!("archived {} class file(s)", archived.len());

    progress(format!("Signing with key {}...", config.key_alias));
    let key = SigningKey {
        keystore: &config.keystore_path,
        alias: &config.key_alias,
    };
    let signed = sign_staged(stager.staging_dir(), &key, context.executor, context.credentials)?;
    log::info!("signed {} archive(s)", signed.len());

    progress(format!("Publishing to {}...", config.publish_dir));
    let published = publish_signed(&signed, &config.publish_dir)?;

    progress(String::new());
    progress(success_message(published.len(), &config.publish_dir));
    for artifact in &published {
        progress(format!("  - {} (sha256 {})", artifact.file_name, artifact.sha256));
    }

    Ok(PackagingReport {
        staging_dir,
        staged,
        archived,
        signed,
        published,
    })
}
