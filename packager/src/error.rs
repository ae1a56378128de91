//! Error types for the wallet packager.
//!
//! Every variant names the pipeline stage that failed and, where one is
//! involved, the artifact it was working on. Any of them aborts the run: a
//! half-signed module set is never published.

use crate::credentials::CredentialKind;
use crate::module_name::ModuleName;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while packaging modules or syncing the webapp.
#[derive(Debug, Error)]
pub enum PackagerError {
    /// The project root or another configuration value could not be resolved.
    #[error("configuration error: {reason}")]
    Configuration {
        /// Description of what is misconfigured.
        reason: String,
    },

    /// A configuration file exists but could not be parsed.
    #[error("invalid configuration file {path}: {reason}")]
    InvalidConfigFile {
        /// Path to the offending file.
        path: Utf8PathBuf,
        /// Description of the parse error.
        reason: String,
    },

    /// Elevating privileges to create the staging directory failed.
    #[error("privilege escalation failed while running `{command}`: {reason}")]
    Privilege {
        /// The privileged command that failed, without secrets.
        command: String,
        /// Captured stderr or exit status of the command.
        reason: String,
    },

    /// The staging directory exists but the invoking user cannot write to it.
    #[error("staging directory {path} is not writable: {reason}")]
    StagingNotWritable {
        /// Path to the staging directory.
        path: Utf8PathBuf,
        /// Description of the underlying I/O error.
        reason: String,
    },

    /// The compiled class file for a module is absent.
    #[error("stage failed: compiled artifact for {module} not found at {path}")]
    MissingArtifact {
        /// The module whose class file is missing.
        module: ModuleName,
        /// Where the class file was expected.
        path: Utf8PathBuf,
    },

    /// Copying a located class file into the staging directory failed.
    #[error("stage failed for {module}: {reason}")]
    Stage {
        /// The module being staged.
        module: ModuleName,
        /// Description of the failure.
        reason: String,
    },

    /// Archiving a staged class file failed.
    #[error("archive failed for {file}: {reason}")]
    Archive {
        /// The staged file being archived.
        file: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// Signing an archive failed.
    #[error("signing failed for {artifact}: {reason}")]
    Signing {
        /// The archive that could not be signed.
        artifact: Utf8PathBuf,
        /// Captured stderr or exit status of the signer.
        reason: String,
    },

    /// Copying a signed artifact to the publish directory failed.
    #[error("publish failed for {artifact}: {reason}")]
    Publish {
        /// The signed artifact being published.
        artifact: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// A published artifact failed signature verification.
    #[error("verification failed for {artifact}: {reason}")]
    Verification {
        /// The artifact that failed verification.
        artifact: Utf8PathBuf,
        /// Captured output of the verifier.
        reason: String,
    },

    /// A credential could not be obtained.
    #[error("could not obtain {kind} credential: {reason}")]
    Credential {
        /// Which credential was requested.
        kind: CredentialKind,
        /// Description of why it is unavailable.
        reason: String,
    },

    /// The frontend build or asset copy failed.
    #[error("webapp {step} failed: {reason}")]
    WebappBuild {
        /// The webapp step that failed (build, copy, ...).
        step: &'static str,
        /// Description of the failure.
        reason: String,
    },

    /// An external command did not finish in time and was killed.
    #[error("`{command}` timed out after {seconds} seconds")]
    CommandTimedOut {
        /// The command that timed out, without secrets.
        command: String,
        /// The timeout that elapsed.
        seconds: u64,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl PackagerError {
    /// Name of the pipeline stage this error belongs to.
    ///
    /// # Examples
    ///
    /// ```
    /// use wallet_packager::error::PackagerError;
    ///
    /// let err = PackagerError::Configuration { reason: "no root".to_owned() };
    /// assert_eq!(err.stage(), "configure");
    /// ```
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Configuration { .. } | Self::InvalidConfigFile { .. } => "configure",
            Self::Privilege { .. } | Self::StagingNotWritable { .. } => "prepare",
            Self::MissingArtifact { .. } | Self::Stage { .. } => "stage",
            Self::Archive { .. } => "archive",
            Self::Signing { .. } | Self::Credential { .. } => "sign",
            Self::Publish { .. } => "publish",
            Self::Verification { .. } => "verify",
            Self::WebappBuild { .. } => "webapp",
            Self::CommandTimedOut { .. } | Self::Io(_) => "io",
            #[cfg(any(test, feature = "test-support"))]
            Self::StubMismatch { .. } => "test",
        }
    }
}

/// Result type alias using [`PackagerError`].
pub type Result<T> = std::result::Result<T, PackagerError>;
