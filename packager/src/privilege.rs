//! Staging directory bootstrap.
//!
//! The system staging directory lives outside the user's home, so creating
//! it needs `sudo`. This is the only privileged step of the pipeline and it
//! runs at most once: an existing directory is used as-is, without any
//! ownership or permission repair.

use crate::credentials::{CredentialKind, CredentialProvider, Secret};
use crate::error::{PackagerError, Result};
use crate::executor::{CommandExecutor, CommandSpec, failure_reason};
use camino::Utf8Path;
use std::fs;

/// What [`ensure_staging_dir`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingDirOutcome {
    /// The directory existed; nothing privileged ran.
    AlreadyPresent,
    /// The directory was created and handed to the invoking user.
    Created,
}

/// Make sure `staging_dir` exists and is writable.
///
/// When the directory is absent the administrator credential is requested
/// once and used for `sudo mkdir -p` followed by `sudo chown <user>`.
///
/// # Errors
///
/// Returns [`PackagerError::Configuration`] when the path exists but is not
/// a directory or when the directory must be created but no owner is known, [`PackagerError::Privilege`] when either
/// privileged command fails, and [`PackagerError::StagingNotWritable`] when
/// the directory cannot be written afterwards.
pub fn ensure_staging_dir(
    staging_dir: &Utf8Path,
    owner: Option<&str>,
    executor: &dyn CommandExecutor,
    credentials: &dyn CredentialProvider,
) -> Result<StagingDirOutcome> {
    let outcome = if staging_dir.is_dir() {
        log::debug!("staging directory {staging_dir} already exists; skipping creation");
        StagingDirOutcome::AlreadyPresent
    } else if staging_dir.exists() {
        return Err(PackagerError::Configuration {
            reason: format!("staging path {staging_dir} is not a directory"),
        });
    } else {
        let owner = owner.ok_or_else(|| PackagerError::Configuration {
            reason: format!(
                "cannot create {staging_dir}: no owning user configured and USER is unset"
            ),
        })?;
        create_privileged(staging_dir, owner, executor, credentials)?;
        StagingDirOutcome::Created
    };

    probe_writable(staging_dir)?;
    Ok(outcome)
}

fn create_privileged(
    staging_dir: &Utf8Path,
    owner: &str,
    executor: &dyn CommandExecutor,
    credentials: &dyn CredentialProvider,
) -> Result<()> {
    log::info!("creating {staging_dir} with elevated privileges for {owner}");
    let password = credentials.credential(CredentialKind::Administrator)?;

    run_sudo(executor, &password, &["mkdir", "-p", staging_dir.as_str()])?;
    run_sudo(executor, &password, &["chown", owner, staging_dir.as_str()])
}

/// Build the `sudo` invocation for `args`, reading the password from stdin.
#[must_use]
pub fn sudo_command(password: &Secret, args: &[&str]) -> CommandSpec {
    CommandSpec::new("sudo")
        .args(["-S", "-p", ""])
        .args(args.iter().copied())
        .stdin_secret(password.clone())
}

fn run_sudo(executor: &dyn CommandExecutor, password: &Secret, args: &[&str]) -> Result<()> {
    let command = sudo_command(password, args);
    let output = executor.run(&command)?;
    if output.status.success() {
        Ok(())
    } else {
        Err(PackagerError::Privilege {
            command: command.to_string(),
            reason: failure_reason(&output),
        })
    }
}

/// Verify writability by creating and removing a probe file.
fn probe_writable(staging_dir: &Utf8Path) -> Result<()> {
    let probe = staging_dir.join(".wallet-packager-probe");
    match fs::write(&probe, b"probe") {
        Ok(()) => {
            if let Err(e) = fs::remove_file(&probe) {
                log::warn!("could not remove {probe}: {e}");
            }
            Ok(())
        }
        Err(e) => Err(PackagerError::StagingNotWritable {
            path: staging_dir.to_owned(),
            reason: e.to_string(),
        }),
    }
}
