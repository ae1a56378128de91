//! Project root detection.
//!
//! The packager may be launched from anywhere inside the backend checkout
//! (the repository root, `Scripts/modules`, ...). This module walks upward
//! from the starting directory until it finds the directory holding the
//! expected sub-directories.

use crate::error::{PackagerError, Result};
use camino::{Utf8Path, Utf8PathBuf};

/// Marker directory identifying the root for module packaging.
pub const MANAGER_MARKER: &str = "Manager";

/// Marker directory identifying the root for the webapp sync.
pub const SERVER_HTTP_MARKER: &str = "ServerHttp";

/// Maximum number of parent directories inspected before giving up.
pub const MAX_ANCESTOR_STEPS: usize = 16;

/// Checks whether `dir` contains every marker as a sub-directory.
#[must_use]
pub fn is_project_root(dir: &Utf8Path, markers: &[&str]) -> bool {
    markers.iter().all(|marker| dir.join(marker).is_dir())
}

/// Find the project root at or above `start`.
///
/// At most [`MAX_ANCESTOR_STEPS`] parents are inspected.
///
/// # Errors
///
/// Returns [`PackagerError::Configuration`] when no ancestor within the
/// bound carries the markers.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use wallet_packager::project::{find_project_root, MANAGER_MARKER};
///
/// let root = find_project_root(Utf8Path::new("/srv/backend/Scripts/modules"), &[MANAGER_MARKER])?;
/// assert_eq!(root, "/srv/backend");
/// # Ok::<(), wallet_packager::error::PackagerError>(())
/// ```
pub fn find_project_root(start: &Utf8Path, markers: &[&str]) -> Result<Utf8PathBuf> {
    for candidate in start.ancestors().take(MAX_ANCESTOR_STEPS + 1) {
        if is_project_root(candidate, markers) {
            log::debug!("project root resolved to {candidate}");
            return Ok(candidate.to_owned());
        }
    }

    Err(PackagerError::Configuration {
        reason: format!(
            "no directory containing {} found within {MAX_ANCESTOR_STEPS} levels above {start}",
            markers.join(", ")
        ),
    })
}

/// Find the project root starting from the process's current directory.
///
/// # Errors
///
/// Returns [`PackagerError::Configuration`] if the current directory is not
/// valid UTF-8 or no root is found.
pub fn find_project_root_from_cwd(markers: &[&str]) -> Result<Utf8PathBuf> {
    let cwd = current_dir_utf8()?;
    find_project_root(&cwd, markers)
}

/// Use `explicit` as the project root when given, otherwise search upwards
/// from the current directory.
///
/// An explicit root is taken as-is; it only has to be a directory.
///
/// # Errors
///
/// Returns [`PackagerError::Configuration`] if the explicit root is not a
/// directory or the search fails.
pub fn resolve_project_root(explicit: Option<&Utf8Path>, markers: &[&str]) -> Result<Utf8PathBuf> {
    match explicit {
        Some(root) if root.is_dir() => Ok(root.to_owned()),
        Some(root) => Err(PackagerError::Configuration {
            reason: format!("project root {root} is not a directory"),
        }),
        None => find_project_root_from_cwd(markers),
    }
}

/// Gets the current directory as a UTF-8 path.
pub(crate) fn current_dir_utf8() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().map_err(|e| PackagerError::Configuration {
        reason: format!("cannot read current directory: {e}"),
    })?;
    Utf8PathBuf::try_from(cwd).map_err(|e| PackagerError::Configuration {
        reason: format!("current directory is not valid UTF-8: {e}"),
    })
}
