//! Shared test utilities for the packager crate.

use crate::credentials::{CredentialKind, CredentialProvider, Secret};
use crate::error::{PackagerError, Result};
use crate::executor::{CommandExecutor, CommandSpec};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The program to execute (e.g., "jarsigner").
    pub program: &'static str,
    /// The arguments to pass to the program.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

impl ExpectedCall {
    /// Expect `program` with `args` and answer with a successful output.
    #[must_use]
    pub fn succeeding<I, S>(program: &'static str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program,
            args: args.into_iter().map(Into::into).collect(),
            result: Ok(success_output()),
        }
    }

    /// Expect `program` with `args` and answer with a failing output.
    #[must_use]
    pub fn failing<I, S>(program: &'static str, args: I, stderr: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program,
            args: args.into_iter().map(Into::into).collect(),
            result: Ok(failure_output(stderr)),
        }
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Replays expected command invocations in order and records every command
/// it receives, allowing tests to verify command execution without side
/// effects. Mismatches are reported as [`PackagerError::StubMismatch`].
#[derive(Debug, Default)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
    received: RefCell<Vec<CommandSpec>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            received: RefCell::new(Vec::new()),
        }
    }

    /// Returns every command received so far, in order.
    #[must_use]
    pub fn received(&self) -> Vec<CommandSpec> {
        self.received.borrow().clone()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, command: &CommandSpec) -> Result<Output> {
        self.received.borrow_mut().push(command.clone());

        let Some(call) = self.expected.borrow_mut().pop_front() else {
            return Err(PackagerError::StubMismatch {
                message: format!("unexpected command invocation: {command}"),
            });
        };

        if call.program != command.program() || call.args.as_slice() != command.arguments() {
            return Err(PackagerError::StubMismatch {
                message: format!(
                    "expected `{} {}`, received `{command}`",
                    call.program,
                    call.args.join(" ")
                ),
            });
        }

        call.result
    }
}

/// A credential provider handing out fixed secrets.
///
/// Kinds without a configured secret fail with [`PackagerError::Credential`].
#[derive(Debug, Default)]
pub struct FixedCredentialProvider {
    secrets: HashMap<CredentialKind, Secret>,
    requests: RefCell<HashMap<CredentialKind, usize>>,
}

impl FixedCredentialProvider {
    /// Create a provider with no secrets configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the secret returned for `kind`.
    #[must_use]
    pub fn with(mut self, kind: CredentialKind, secret: &str) -> Self {
        self.secrets.insert(kind, Secret::new(secret));
        self
    }

    /// How many times `kind` has been requested.
    #[must_use]
    pub fn requests(&self, kind: CredentialKind) -> usize {
        self.requests.borrow().get(&kind).copied().unwrap_or(0)
    }
}

impl CredentialProvider for FixedCredentialProvider {
    fn credential(&self, kind: CredentialKind) -> Result<Secret> {
        *self.requests.borrow_mut().entry(kind).or_insert(0) += 1;
        self.secrets
            .get(&kind)
            .cloned()
            .ok_or_else(|| PackagerError::Credential {
                kind,
                reason: "no fixed secret configured".to_owned(),
            })
    }
}
