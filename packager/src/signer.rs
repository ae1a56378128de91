//! Jar signing.
//!
//! Each staged archive is signed in place with `jarsigner`. The keystore
//! password is requested once per run and reaches `jarsigner` through its
//! environment rather than its argument list.

use crate::credentials::{CredentialKind, CredentialProvider, KEYSTORE_PASSWORD_ENV, Secret};
use crate::error::{PackagerError, Result};
use crate::executor::{CommandExecutor, CommandSpec, failure_reason};
use crate::module_name::ARCHIVE_EXTENSION;
use crate::scanner::scan_files;
use camino::{Utf8Path, Utf8PathBuf};

/// Keystore and key used for signing.
#[derive(Debug, Clone, Copy)]
pub struct SigningKey<'a> {
    /// Path to the keystore file.
    pub keystore: &'a Utf8Path,
    /// Alias of the signing key inside the keystore.
    pub alias: &'a str,
}

impl SigningKey<'_> {
    /// Check that the keystore file exists.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Configuration`] if it does not.
    pub fn ensure_present(&self) -> Result<()> {
        if self.keystore.is_file() {
            Ok(())
        } else {
            Err(PackagerError::Configuration {
                reason: format!("keystore {} does not exist", self.keystore),
            })
        }
    }
}

/// Build the `jarsigner` invocation that signs `jar` in place.
#[must_use]
pub fn sign_command(key: &SigningKey<'_>, password: &Secret, jar: &Utf8Path) -> CommandSpec {
    CommandSpec::new("jarsigner")
        .args(["-keystore", key.keystore.as_str()])
        .args(["-storepass:env", KEYSTORE_PASSWORD_ENV])
        .args(["-signedjar", jar.as_str(), jar.as_str(), key.alias])
        .secret_env(KEYSTORE_PASSWORD_ENV, password.clone())
}

/// Sign every archive in `staging_dir`.
///
/// The keystore is checked before the credential is requested, and the
/// credential is requested exactly once even when several archives are
/// signed. Returns the signed archives, sorted by name.
///
/// # Errors
///
/// Returns [`PackagerError::Configuration`] for a missing keystore,
/// [`PackagerError::Credential`] when no password is available, and
/// [`PackagerError::Signing`] naming the first archive `jarsigner` rejects.
pub fn sign_staged(
    staging_dir: &Utf8Path,
    key: &SigningKey<'_>,
    executor: &dyn CommandExecutor,
    credentials: &dyn CredentialProvider,
) -> Result<Vec<Utf8PathBuf>> {
    key.ensure_present()?;
    let password = credentials.credential(CredentialKind::Keystore)?;

    let jars = scan_files(staging_dir, ARCHIVE_EXTENSION).map_err(|e| PackagerError::Signing {
        artifact: staging_dir.to_owned(),
        reason: format!("cannot scan staging directory: {e}"),
    })?;
    for jar in &jars {
        let command = sign_command(key, &password, jar);
        log::info!("signing {jar}");
        let output = executor.run(&command)?;
        if !output.status.success() {
            return Err(PackagerError::Signing {
                artifact: jar.clone(),
                reason: failure_reason(&output),
            });
        }
    }

    Ok(jars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MockCredentialProvider;
    use crate::executor::MockCommandExecutor;
    use crate::test_utils::{failure_output, success_output};
    use mockall::Sequence;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        staging: Utf8PathBuf,
        keystore: Utf8PathBuf,
    }

    fn fixture(jars: &[&str]) -> Fixture {
        let temp = TempDir::new().expect("temp dir");
        let base = Utf8PathBuf::try_from(temp.path().to_owned()).expect("utf8");
        let staging = base.join("staging");
        fs::create_dir_all(&staging).expect("staging");
        for jar in jars {
            fs::write(staging.join(jar), "jar").expect("write jar");
        }
        let keystore = base.join("RaspberryWallet.keystore");
        fs::write(&keystore, "keystore").expect("write keystore");
        Fixture {
            _temp: temp,
            staging,
            keystore,
        }
    }

    fn keystore_once() -> MockCredentialProvider {
        let mut credentials = MockCredentialProvider::new();
        credentials
            .expect_credential()
            .withf(|kind| *kind == CredentialKind::Keystore)
            .times(1)
            .returning(|_| Ok(Secret::new("store-pass")));
        credentials
    }

    #[test]
    fn signs_each_jar_with_a_single_credential_request() {
        let fx = fixture(&["PinModule.jar", "ExampleModule.jar"]);
        let key = SigningKey {
            keystore: &fx.keystore,
            alias: "signModules",
        };
        let credentials = keystore_once();

        let mut executor = MockCommandExecutor::new();
        let mut sequence = Sequence::new();
        for name in ["ExampleModule.jar", "PinModule.jar"] {
            executor
                .expect_run()
                .withf(move |cmd| {
                    cmd.program() == "jarsigner"
                        && cmd.arguments().last().map(String::as_str) == Some("signModules")
                        && cmd.arguments().iter().any(|a| a.ends_with(name))
                })
                .times(1)
                .in_sequence(&mut sequence)
                .returning(|_| Ok(success_output()));
        }

        let signed = sign_staged(&fx.staging, &key, &executor, &credentials).expect("sign");
        assert_eq!(
            signed,
            vec![
                fx.staging.join("ExampleModule.jar"),
                fx.staging.join("PinModule.jar"),
            ]
        );
    }

    #[test]
    fn password_travels_through_environment() {
        let key = SigningKey {
            keystore: Utf8Path::new("/srv/RaspberryWallet.keystore"),
            alias: "signModules",
        };
        let command = sign_command(
            &key,
            &Secret::new("store-pass"),
            Utf8Path::new("/opt/wallet/modules/PinModule.jar"),
        );

        assert!(!command.arguments().iter().any(|a| a.contains("store-pass")));
        assert_eq!(command.secret_envs().len(), 1);
        assert_eq!(
            command.to_string(),
            "jarsigner -keystore /srv/RaspberryWallet.keystore -storepass:env \
             WALLET_KEYSTORE_PASSWORD -signedjar /opt/wallet/modules/PinModule.jar \
             /opt/wallet/modules/PinModule.jar signModules"
        );
    }

    #[test]
    fn failing_signer_names_the_artifact() {
        let fx = fixture(&["PinModule.jar"]);
        let key = SigningKey {
            keystore: &fx.keystore,
            alias: "signModules",
        };
        let credentials = keystore_once();
        let mut executor = MockCommandExecutor::new();
        executor
            .expect_run()
            .times(1)
            .returning(|_| Ok(failure_output("jarsigner error: keystore password was incorrect")));

        let err = sign_staged(&fx.staging, &key, &executor, &credentials).expect_err("sign fails");
        match err {
            PackagerError::Signing { artifact, reason } => {
                assert!(artifact.ends_with("PinModule.jar"));
                assert!(reason.contains("password was incorrect"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unreadable_staging_dir_is_a_signing_error() {
        let fx = fixture(&[]);
        let not_a_dir = fx.keystore.clone();
        let key = SigningKey {
            keystore: &fx.keystore,
            alias: "signModules",
        };
        let credentials = keystore_once();
        let executor = MockCommandExecutor::new();

        let err = sign_staged(&not_a_dir, &key, &executor, &credentials).expect_err("not a dir");

        assert_eq!(err.stage(), "sign");
        match err {
            PackagerError::Signing { artifact, reason } => {
                assert_eq!(artifact, not_a_dir);
                assert!(reason.contains("cannot scan"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_keystore_fails_before_prompting() {
        let fx = fixture(&["PinModule.jar"]);
        let missing = fx.staging.join("absent.keystore");
        let key = SigningKey {
            keystore: &missing,
            alias: "signModules",
        };
        let mut credentials = MockCredentialProvider::new();
        credentials.expect_credential().never();
        let executor = MockCommandExecutor::new();

        let err = sign_staged(&fx.staging, &key, &executor, &credentials).expect_err("no keystore");
        assert!(matches!(err, PackagerError::Configuration { .. }));
    }
}
