//! Test support utilities for packager behavioural tests.
//!
//! Builds throwaway backend checkouts with the directory layout the packager
//! expects, and the `jarsigner` invocations a run is expected to make.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;
use wallet_packager::config::{KEYSTORE_FILE_NAME, PackagerConfig};
use wallet_packager::credentials::Secret;
use wallet_packager::module_name::ModuleName;
use wallet_packager::project::{MANAGER_MARKER, SERVER_HTTP_MARKER};
use wallet_packager::signer::{SigningKey, sign_command};
use wallet_packager::test_utils::ExpectedCall;

/// Creates a temporary directory and returns it with its UTF-8 path.
pub fn utf8_temp_dir() -> (TempDir, Utf8PathBuf) {
    let temp = TempDir::new().expect("failed to create temp dir");
    let path = Utf8PathBuf::try_from(temp.path().to_owned()).expect("temp path is not UTF-8");
    (temp, path)
}

/// Creates a backend checkout under `base` with `Manager`, `ServerHttp` and
/// a keystore file, returning its root.
pub fn backend_checkout(base: &Utf8Path) -> Utf8PathBuf {
    let root = base.join("backend");
    fs::create_dir_all(root.join(MANAGER_MARKER)).expect("create Manager");
    fs::create_dir_all(root.join(SERVER_HTTP_MARKER)).expect("create ServerHttp");
    fs::write(root.join(KEYSTORE_FILE_NAME), "keystore").expect("write keystore");
    root
}

/// Writes a compiled class for `module` into the Manager build output.
pub fn compile_module(project_root: &Utf8Path, module: &str) {
    let path = ModuleName::from(module).source_path(project_root);
    fs::create_dir_all(path.parent().expect("class path has a parent")).expect("mkdir");
    fs::write(&path, format!("compiled {module}")).expect("write class");
}

/// The `jarsigner` call expected for the staged archive `jar_name`.
pub fn expected_sign_call(config: &PackagerConfig, jar_name: &str) -> ExpectedCall {
    let key = SigningKey {
        keystore: &config.keystore_path,
        alias: &config.key_alias,
    };
    let command = sign_command(
        &key,
        &Secret::new("unused"),
        &config.staging_dir.join(jar_name),
    );
    ExpectedCall::succeeding("jarsigner", command.arguments().to_vec())
}
