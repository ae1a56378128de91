//! Frontend build and asset sync.
//!
//! Builds the wallet's web frontend with `yarn` and replaces the backend's
//! static asset directory with the build output. The build runs first so a
//! failed build leaves the previously synced assets in place.

use crate::error::{PackagerError, Result};
use crate::executor::{CommandExecutor, CommandSpec, failure_reason};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use walkdir::WalkDir;

/// Frontend checkout, relative to the backend root.
pub const FRONTEND_RELATIVE_DIR: &str = "../../JSProjects/raspberry-wallet-frontend";

/// Directory the frontend build writes to, relative to the frontend.
pub const BUILD_DIR_NAME: &str = "build";

/// Static asset directory served by the backend, relative to its root.
pub const ASSETS_RELATIVE_DIR: &str = "ServerHttp/src/main/resources/assets";

/// Paths involved in a webapp sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebappConfig {
    /// Root of the backend checkout.
    pub backend_root: Utf8PathBuf,
    /// Root of the frontend checkout.
    pub frontend_dir: Utf8PathBuf,
    /// Build output copied into the backend.
    pub build_dir: Utf8PathBuf,
    /// Backend asset directory that is replaced.
    pub assets_dir: Utf8PathBuf,
}

impl WebappConfig {
    /// Default layout for `backend_root`.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use wallet_packager::webapp::WebappConfig;
    ///
    /// let config = WebappConfig::defaults(Utf8Path::new("/src/wallet/backend"));
    /// assert_eq!(
    ///     config.assets_dir,
    ///     "/src/wallet/backend/ServerHttp/src/main/resources/assets"
    /// );
    /// assert!(config.build_dir.ends_with("raspberry-wallet-frontend/build"));
    /// ```
    #[must_use]
    pub fn defaults(backend_root: &Utf8Path) -> Self {
        Self::with_overrides(backend_root, None, None)
    }

    /// Layout for `backend_root` with optional directory overrides.
    ///
    /// The build directory always sits inside the frontend directory.
    #[must_use]
    pub fn with_overrides(
        backend_root: &Utf8Path,
        frontend_dir: Option<Utf8PathBuf>,
        assets_dir: Option<Utf8PathBuf>,
    ) -> Self {
        let frontend_dir = frontend_dir.unwrap_or_else(|| backend_root.join(FRONTEND_RELATIVE_DIR));
        Self {
            backend_root: backend_root.to_owned(),
            build_dir: frontend_dir.join(BUILD_DIR_NAME),
            frontend_dir,
            assets_dir: assets_dir.unwrap_or_else(|| backend_root.join(ASSETS_RELATIVE_DIR)),
        }
    }

    /// Describe what a sync would do, for dry runs.
    #[must_use]
    pub fn display_text(&self) -> String {
        [
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Backend root: {}", self.backend_root),
            format!("Build command: {}", build_command(self)),
            format!("Build output: {}", self.build_dir),
            format!("Assets directory (replaced): {}", self.assets_dir),
        ]
        .join("\n")
    }
}

/// Build the `yarn` invocation for the frontend.
#[must_use]
pub fn build_command(config: &WebappConfig) -> CommandSpec {
    CommandSpec::new("yarn")
        .args(["--cwd", config.frontend_dir.as_str()])
        .args(["run", "build"])
}

/// Build the frontend and replace the backend assets with the output.
///
/// Returns the number of files copied.
///
/// # Errors
///
/// Returns [`PackagerError::WebappBuild`] when the build fails, when it
/// produces no output directory, or when the assets cannot be replaced.
pub fn sync_webapp(config: &WebappConfig, executor: &dyn CommandExecutor) -> Result<usize> {
    let command = build_command(config);
    log::info!("running {command}");
    let output = executor.run(&command)?;
    if !output.status.success() {
        return Err(PackagerError::WebappBuild {
            step: "build",
            reason: failure_reason(&output),
        });
    }

    if !config.build_dir.is_dir() {
        return Err(PackagerError::WebappBuild {
            step: "build",
            reason: format!("build output {} does not exist", config.build_dir),
        });
    }

    if config.assets_dir.exists() {
        log::debug!("removing {}", config.assets_dir);
        fs::remove_dir_all(&config.assets_dir).map_err(|e| PackagerError::WebappBuild {
            step: "clean",
            reason: format!("cannot remove {}: {e}", config.assets_dir),
        })?;
    }

    copy_tree(&config.build_dir, &config.assets_dir).map_err(|e| PackagerError::WebappBuild {
        step: "copy",
        reason: e.to_string(),
    })
}

/// Recursively copy `from` into `to`, returning the number of files copied.
///
/// Symbolic links are followed; their targets are copied as plain files.
///
/// # Errors
///
/// Returns an error if any entry cannot be read or written.
pub fn copy_tree(from: &Utf8Path, to: &Utf8Path) -> std::io::Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(from).follow_links(true) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(std::io::Error::other)?;
        let dest_path = to.as_std_path().join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else {
            fs::copy(entry.path(), &dest_path)?;
            copied += 1;
        }
    }
    log::debug!("copied {copied} file(s) from {from} to {to}");
    Ok(copied)
}
