//! Credential acquisition for privileged and signing steps.
//!
//! The pipeline needs two secrets: the administrator password for creating
//! the system staging directory, and the keystore password for signing.
//! Both are obtained through [`CredentialProvider`] so that tests and
//! non-interactive runs can supply them without a terminal.

use crate::error::{PackagerError, Result};
use std::cell::RefCell;
use std::fmt;
use std::io::{self, BufRead, Write};

/// Environment variable consulted for the administrator password.
pub const ADMIN_PASSWORD_ENV: &str = "WALLET_ADMIN_PASSWORD";

/// Environment variable consulted for the keystore password.
pub const KEYSTORE_PASSWORD_ENV: &str = "WALLET_KEYSTORE_PASSWORD";

/// Which secret is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// Password for privilege escalation via `sudo`.
    Administrator,
    /// Password unlocking the module signing keystore.
    Keystore,
}

impl CredentialKind {
    /// Prompt text shown when asking for this credential interactively.
    #[must_use]
    pub const fn prompt(self) -> &'static str {
        match self {
            Self::Administrator => "Root Password:",
            Self::Keystore => "Keystore Password:",
        }
    }

    /// Environment variable holding this credential in non-interactive runs.
    #[must_use]
    pub const fn env_var(self) -> &'static str {
        match self {
            Self::Administrator => ADMIN_PASSWORD_ENV,
            Self::Keystore => KEYSTORE_PASSWORD_ENV,
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Administrator => f.write_str("administrator"),
            Self::Keystore => f.write_str("keystore"),
        }
    }
}

/// A secret string whose `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Reveal the secret for handing it to a child process.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Source of secrets for the pipeline.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialProvider {
    /// Obtain the credential of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Credential`] when no usable secret is
    /// available.
    fn credential(&self, kind: CredentialKind) -> Result<Secret>;
}

/// Prompts on a writer and reads a line from a reader.
///
/// Input is not masked, and reading blocks until a line arrives.
pub struct PromptCredentialProvider<R, W> {
    input: RefCell<R>,
    output: RefCell<W>,
}

impl<R: BufRead, W: Write> PromptCredentialProvider<R, W> {
    /// Create a provider over arbitrary input and output streams.
    #[must_use]
    pub const fn new(input: R, output: W) -> Self {
        Self {
            input: RefCell::new(input),
            output: RefCell::new(output),
        }
    }
}

impl PromptCredentialProvider<io::StdinLock<'static>, io::Stderr> {
    /// Create a provider that prompts on stderr and reads stdin.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> CredentialProvider for PromptCredentialProvider<R, W> {
    fn credential(&self, kind: CredentialKind) -> Result<Secret> {
        let credential_error = |reason: String| PackagerError::Credential { kind, reason };

        {
            let mut output = self.output.borrow_mut();
            write!(output, "{}", kind.prompt()).map_err(|e| credential_error(e.to_string()))?;
            output.flush().map_err(|e| credential_error(e.to_string()))?;
        }

        let mut line = String::new();
        let read = self
            .input
            .borrow_mut()
            .read_line(&mut line)
            .map_err(|e| credential_error(e.to_string()))?;
        if read == 0 {
            return Err(credential_error("input closed before a line was read".to_owned()));
        }

        let value = line.trim_end_matches(['\r', '\n']);
        if value.is_empty() {
            return Err(credential_error("empty input".to_owned()));
        }
        Ok(Secret::new(value))
    }
}

/// Reads credentials from environment variables.
///
/// See [`CredentialKind::env_var`] for the variable names.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentialProvider;

impl CredentialProvider for EnvCredentialProvider {
    fn credential(&self, kind: CredentialKind) -> Result<Secret> {
        let var = kind.env_var();
        match std::env::var(var) {
            Ok(value) if !value.is_empty() => Ok(Secret::new(value)),
            Ok(_) => Err(PackagerError::Credential {
                kind,
                reason: format!("{var} is empty"),
            }),
            Err(e) => Err(PackagerError::Credential {
                kind,
                reason: format!("{var}: {e}"),
            }),
        }
    }
}
