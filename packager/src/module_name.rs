//! Semantic wrapper for wallet module names.
//!
//! A module name such as `PinModule` identifies one compiled class in the
//! Manager build output. Every path the packager touches for that module is
//! derived from the name, so the naming convention lives here.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix every wallet module class name carries.
pub const MODULE_SUFFIX: &str = "Module";

/// Build output subtree holding the compiled module packages.
pub const MODULE_CLASSES_DIR: &str = "Manager/target/classes/io/raspberrywallet/manager/modules";

/// Extension of compiled, not yet archived, module files.
pub const CLASS_EXTENSION: &str = "class";

/// Extension of archived module containers.
pub const ARCHIVE_EXTENSION: &str = "jar";

/// A semantic name for one wallet module.
///
/// Validation (non-empty, carries the [`MODULE_SUFFIX`]) is performed by
/// [`crate::config::validate_module_names`], not by this type itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleName(String);

impl ModuleName {
    /// Create a new module name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the module name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the Java package segment the module lives under.
    ///
    /// The [`MODULE_SUFFIX`] is stripped and the remainder lower-cased.
    ///
    /// # Examples
    ///
    /// ```
    /// use wallet_packager::module_name::ModuleName;
    ///
    /// let name = ModuleName::from("AuthorizationServerModule");
    /// assert_eq!(name.package_segment(), "authorizationserver");
    /// ```
    #[must_use]
    pub fn package_segment(&self) -> String {
        self.0
            .strip_suffix(MODULE_SUFFIX)
            .unwrap_or(&self.0)
            .to_lowercase()
    }

    /// File name of the compiled class, e.g. `PinModule.class`.
    #[must_use]
    pub fn class_file_name(&self) -> String {
        format!("{}.{CLASS_EXTENSION}", self.0)
    }

    /// File name of the archived module, e.g. `PinModule.jar`.
    #[must_use]
    pub fn archive_file_name(&self) -> String {
        format!("{}.{ARCHIVE_EXTENSION}", self.0)
    }

    /// Expected location of the compiled class under `project_root`.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use wallet_packager::module_name::ModuleName;
    ///
    /// let path = ModuleName::from("PinModule").source_path(Utf8Path::new("/srv/backend"));
    /// assert_eq!(
    ///     path,
    ///     "/srv/backend/Manager/target/classes/io/raspberrywallet/manager/modules/pin/PinModule.class"
    /// );
    /// ```
    #[must_use]
    pub fn source_path(&self, project_root: &Utf8Path) -> Utf8PathBuf {
        project_root
            .join(MODULE_CLASSES_DIR)
            .join(self.package_segment())
            .join(self.class_file_name())
    }
}

impl AsRef<str> for ModuleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModuleName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for ModuleName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
