//! External process execution.
//!
//! Every external tool the packager drives (`sudo`, `jar`, `jarsigner`,
//! `yarn`) goes through [`CommandExecutor`], which hands back the exit status
//! together with captured output so callers can turn failures into the
//! matching [`PackagerError`] variant.

use crate::credentials::Secret;
use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::io::{self, Read, Write};
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Default timeout for external commands (5 minutes).
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Description of one external command invocation.
///
/// Secrets are carried separately from the argument list so that
/// [`fmt::Display`] can render the command for logs and error messages
/// without leaking them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    current_dir: Option<Utf8PathBuf>,
    stdin: Option<Secret>,
    secret_env: Vec<(String, Secret)>,
}

impl CommandSpec {
    /// Start describing an invocation of `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            stdin: None,
            secret_env: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the command inside `dir`.
    #[must_use]
    pub fn current_dir(mut self, dir: &Utf8Path) -> Self {
        self.current_dir = Some(dir.to_owned());
        self
    }

    /// Feed `secret` followed by a newline to the command's stdin.
    #[must_use]
    pub fn stdin_secret(mut self, secret: Secret) -> Self {
        self.stdin = Some(secret);
        self
    }

    /// Expose `secret` to the command as environment variable `name`.
    #[must_use]
    pub fn secret_env(mut self, name: impl Into<String>, secret: Secret) -> Self {
        self.secret_env.push((name.into(), secret));
        self
    }

    /// The program to run.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The arguments, in order.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// The working directory, if one was set.
    #[must_use]
    pub fn working_dir(&self) -> Option<&Utf8Path> {
        self.current_dir.as_deref()
    }

    /// The secret fed to stdin, if any.
    #[must_use]
    pub const fn stdin(&self) -> Option<&Secret> {
        self.stdin.as_ref()
    }

    /// Secret environment variables passed to the command.
    #[must_use]
    pub fn secret_envs(&self) -> &[(String, Secret)] {
        &self.secret_env
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor {
    /// Runs a command and returns its exit status and captured output.
    ///
    /// A non-zero exit status is not an error at this level; callers decide
    /// what it means.
    ///
    /// # Errors
    ///
    /// Returns any I/O error encountered while spawning or waiting for the
    /// command, or [`PackagerError::CommandTimedOut`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use wallet_packager::executor::{CommandExecutor, CommandSpec, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor::default();
    /// let output = executor.run(&CommandSpec::new("jar").arg("--version"))?;
    /// assert!(output.status.success());
    /// # Ok::<(), wallet_packager::error::PackagerError>(())
    /// ```
    fn run(&self, command: &CommandSpec) -> Result<Output>;
}

/// Executes commands on the host system with a wall-clock timeout.
#[derive(Debug, Clone, Copy)]
pub struct SystemCommandExecutor {
    timeout: Duration,
}

impl SystemCommandExecutor {
    /// Create an executor that kills commands running longer than `timeout`.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemCommandExecutor {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_COMMAND_TIMEOUT)
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, command: &CommandSpec) -> Result<Output> {
        log::debug!("running `{command}`");

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.current_dir {
            cmd.current_dir(dir.as_std_path());
        }
        for (name, secret) in &command.secret_env {
            cmd.env(name, secret.expose());
        }
        cmd.stdin(if command.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = cmd.spawn()?;
        let stdout_reader = drain(child.stdout.take());
        let stderr_reader = drain(child.stderr.take());

        if let (Some(secret), Some(mut stdin)) = (&command.stdin, child.stdin.take()) {
            // The child may exit before reading; a broken pipe shows up in
            // its exit status instead.
            if let Err(e) = writeln!(stdin, "{}", secret.expose()) {
                log::debug!("could not write stdin of `{command}`: {e}");
            }
        }

        match child.wait_timeout(self.timeout)? {
            Some(status) => Ok(Output {
                status,
                stdout: collect(stdout_reader)?,
                stderr: collect(stderr_reader)?,
            }),
            None => {
                if let Err(e) = child.kill() {
                    log::warn!("failed to kill `{command}`: {e}");
                }
                if let Err(e) = child.wait() {
                    log::warn!("failed to reap `{command}`: {e}");
                }
                // Grandchildren may still hold the pipes open; the readers
                // are detached rather than joined.
                drop((stdout_reader, stderr_reader));
                Err(PackagerError::CommandTimedOut {
                    command: command.to_string(),
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }
}

type PipeReader = Option<JoinHandle<io::Result<Vec<u8>>>>;

/// Read `pipe` to the end on its own thread so the child never blocks on a
/// full pipe buffer.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> PipeReader {
    pipe.map(|mut pipe| {
        thread::spawn(move || -> io::Result<Vec<u8>> {
            let mut buffer = Vec::new();
            pipe.read_to_end(&mut buffer)?;
            Ok(buffer)
        })
    })
}

fn collect(reader: PipeReader) -> Result<Vec<u8>> {
    let Some(handle) = reader else {
        return Ok(Vec::new());
    };
    let bytes = handle
        .join()
        .map_err(|_| io::Error::other("output reader thread panicked"))??;
    Ok(bytes)
}

/// Describe why a command failed, for use in error messages.
///
/// Prefers trimmed stderr, then stdout, then the exit status.
#[must_use]
pub fn failure_reason(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_owned();
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stdout = stdout.trim();
    if !stdout.is_empty() {
        return stdout.to_owned();
    }
    format!("exited with {}", output.status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{exit_status, failure_output};

    #[test]
    fn display_omits_secrets() {
        let spec = CommandSpec::new("jarsigner")
            .args(["-storepass:env", "WALLET_KEYSTORE_PASSWORD"])
            .secret_env("WALLET_KEYSTORE_PASSWORD", Secret::new("hunter2"))
            .stdin_secret(Secret::new("root-pass"));
        let rendered = spec.to_string();
        assert_eq!(rendered, "jarsigner -storepass:env WALLET_KEYSTORE_PASSWORD");
        assert!(!rendered.contains("hunter2"));
        assert!(!format!("{spec:?}").contains("root-pass"));
    }

    #[test]
    fn builder_records_working_dir() {
        let spec = CommandSpec::new("jar").current_dir(Utf8Path::new("/opt/wallet/modules"));
        assert_eq!(spec.working_dir(), Some(Utf8Path::new("/opt/wallet/modules")));
        assert!(spec.stdin().is_none());
    }

    #[test]
    fn failure_reason_prefers_stderr() {
        let output = failure_output("  jarsigner: keystore load failed \n");
        assert_eq!(failure_reason(&output), "jarsigner: keystore load failed");
    }

    #[test]
    fn failure_reason_falls_back_to_status() {
        let output = Output {
            status: exit_status(3),
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        assert!(failure_reason(&output).contains('3'));
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_captures_output_and_status() {
        let executor = SystemCommandExecutor::default();
        let output = executor
            .run(&CommandSpec::new("sh").args(["-c", "echo out; echo err >&2; exit 4"]))
            .expect("spawn sh");
        assert_eq!(output.status.code(), Some(4));
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "out");
        assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "err");
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_drains_output_larger_than_a_pipe_buffer() {
        let executor = SystemCommandExecutor::with_timeout(Duration::from_secs(30));
        let output = executor
            .run(&CommandSpec::new("sh").args([
                "-c",
                "head -c 200000 /dev/zero; head -c 100000 /dev/zero >&2; exit 0",
            ]))
            .expect("large output must not time out");
        assert!(output.status.success());
        assert_eq!(output.stdout.len(), 200_000);
        assert_eq!(output.stderr.len(), 100_000);
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_feeds_stdin_secret() {
        let executor = SystemCommandExecutor::default();
        let spec = CommandSpec::new("sh")
            .args(["-c", "read line; echo \"got $line\""])
            .stdin_secret(Secret::new("s3cret"));
        let output = executor.run(&spec).expect("spawn sh");
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "got s3cret");
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_times_out() {
        let executor = SystemCommandExecutor::with_timeout(Duration::from_millis(100));
        let err = executor
            .run(&CommandSpec::new("sleep").arg("5"))
            .expect_err("expected timeout");
        assert!(matches!(err, PackagerError::CommandTimedOut { .. }));
    }
}
