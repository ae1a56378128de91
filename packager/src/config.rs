//! Packager configuration.
//!
//! [`PackagerConfig`] is the single structure handed to the pipeline. It is
//! resolved in three layers, lowest precedence first: built-in defaults, an
//! optional `packager.toml` in the project root (or an explicit `--config`
//! file), and command-line overrides. Relative paths from the file are
//! resolved against the project root.

use crate::error::{PackagerError, Result};
use crate::module_name::{MODULE_SUFFIX, ModuleName};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Modules packaged when no list is configured.
pub const DEFAULT_MODULES: &[&str] = &["PinModule", "ExampleModule", "AuthorizationServerModule"];

/// System-wide staging directory the wallet loads modules from.
pub const DEFAULT_STAGING_DIR: &str = "/opt/wallet/modules";

/// Publish directory name, relative to the project root.
pub const PUBLISH_DIR_NAME: &str = "modules";

/// Keystore file name, relative to the project root.
pub const KEYSTORE_FILE_NAME: &str = "RaspberryWallet.keystore";

/// Alias of the signing key inside the keystore.
pub const DEFAULT_KEY_ALIAS: &str = "signModules";

/// Configuration file discovered in the project root.
pub const CONFIG_FILE_NAME: &str = "packager.toml";

/// Tool used to turn staged class files into jar archives.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveTool {
    /// The JDK `jar` tool.
    #[default]
    Jar,
    /// The built-in zip writer; no JDK needed for archiving.
    Builtin,
}

impl fmt::Display for ArchiveTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jar => f.write_str("jar"),
            Self::Builtin => f.write_str("builtin"),
        }
    }
}

/// Values that may be set by a configuration file or on the command line.
///
/// Every field is optional; unset fields fall through to the next layer.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    /// Modules to package, in order.
    pub modules: Option<Vec<ModuleName>>,
    /// System staging directory.
    pub staging_dir: Option<Utf8PathBuf>,
    /// Project-local publish directory.
    pub publish_dir: Option<Utf8PathBuf>,
    /// Keystore used for signing.
    pub keystore: Option<Utf8PathBuf>,
    /// Alias of the signing key.
    pub key_alias: Option<String>,
    /// Archive tool selection.
    pub archive_tool: Option<ArchiveTool>,
    /// User that should own a freshly created staging directory.
    pub user: Option<String>,
}

impl ConfigLayer {
    /// Parse a layer from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::InvalidConfigFile`] if the text is not valid
    /// TOML or contains unknown keys.
    pub fn parse(path: &Utf8Path, contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| PackagerError::InvalidConfigFile {
            path: path.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Load the configuration file layer.
    ///
    /// An explicit path must exist. Without one, `packager.toml` in
    /// `project_root` is used when present and an empty layer otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Configuration`] when an explicit file is
    /// missing, or [`PackagerError::InvalidConfigFile`] when it cannot be
    /// read or parsed.
    pub fn load(project_root: &Utf8Path, explicit: Option<&Utf8Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) if !path.is_file() => {
                return Err(PackagerError::Configuration {
                    reason: format!("configuration file {path} does not exist"),
                });
            }
            Some(path) => path.to_owned(),
            None => {
                let discovered = project_root.join(CONFIG_FILE_NAME);
                if !discovered.is_file() {
                    log::debug!("no {CONFIG_FILE_NAME} in {project_root}; using defaults");
                    return Ok(Self::default());
                }
                discovered
            }
        };

        log::info!("loading configuration from {path}");
        let contents =
            std::fs::read_to_string(&path).map_err(|e| PackagerError::InvalidConfigFile {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        Self::parse(&path, &contents)
    }

    /// Overlay `self` on top of `lower`, keeping `self` where both are set.
    #[must_use]
    pub fn over(self, lower: Self) -> Self {
        Self {
            modules: self.modules.or(lower.modules),
            staging_dir: self.staging_dir.or(lower.staging_dir),
            publish_dir: self.publish_dir.or(lower.publish_dir),
            keystore: self.keystore.or(lower.keystore),
            key_alias: self.key_alias.or(lower.key_alias),
            archive_tool: self.archive_tool.or(lower.archive_tool),
            user: self.user.or(lower.user),
        }
    }
}

/// Fully resolved configuration for one packaging run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackagerConfig {
    /// Root of the backend checkout.
    pub project_root: Utf8PathBuf,
    /// Modules to package, in order.
    pub module_names: Vec<ModuleName>,
    /// System staging directory.
    pub staging_dir: Utf8PathBuf,
    /// Project-local publish directory.
    pub publish_dir: Utf8PathBuf,
    /// Keystore used for signing.
    pub keystore_path: Utf8PathBuf,
    /// Alias of the signing key.
    pub key_alias: String,
    /// Archive tool selection.
    pub archive_tool: ArchiveTool,
    /// User that should own a freshly created staging directory.
    pub invoking_user: Option<String>,
}

impl PackagerConfig {
    /// Build the default configuration for `project_root`.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use wallet_packager::config::PackagerConfig;
    ///
    /// let config = PackagerConfig::defaults(Utf8Path::new("/srv/backend"));
    /// assert_eq!(config.staging_dir, "/opt/wallet/modules");
    /// assert_eq!(config.publish_dir, "/srv/backend/modules");
    /// assert_eq!(config.module_names.len(), 3);
    /// ```
    #[must_use]
    pub fn defaults(project_root: &Utf8Path) -> Self {
        Self {
            project_root: project_root.to_owned(),
            module_names: DEFAULT_MODULES.iter().map(|&m| ModuleName::from(m)).collect(),
            staging_dir: Utf8PathBuf::from(DEFAULT_STAGING_DIR),
            publish_dir: project_root.join(PUBLISH_DIR_NAME),
            keystore_path: project_root.join(KEYSTORE_FILE_NAME),
            key_alias: DEFAULT_KEY_ALIAS.to_owned(),
            archive_tool: ArchiveTool::default(),
            invoking_user: None,
        }
    }

    /// Resolve the configuration from its layers.
    ///
    /// `env_user` is the fallback owner for the staging directory, normally
    /// the `USER` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::Configuration`] if the resulting module list
    /// is invalid (see [`validate_module_names`]) or the key alias is empty.
    pub fn resolve(
        project_root: &Utf8Path,
        layer: ConfigLayer,
        env_user: Option<String>,
    ) -> Result<Self> {
        let defaults = Self::defaults(project_root);
        let anchor = |path: Utf8PathBuf| {
            if path.is_absolute() {
                path
            } else {
                project_root.join(path)
            }
        };

        let config = Self {
            project_root: project_root.to_owned(),
            module_names: layer.modules.unwrap_or(defaults.module_names),
            staging_dir: layer.staging_dir.map_or(defaults.staging_dir, anchor),
            publish_dir: layer.publish_dir.map_or(defaults.publish_dir, anchor),
            keystore_path: layer.keystore.map_or(defaults.keystore_path, anchor),
            key_alias: layer.key_alias.unwrap_or(defaults.key_alias),
            archive_tool: layer.archive_tool.unwrap_or(defaults.archive_tool),
            invoking_user: layer.user.or(env_user).filter(|u| !u.is_empty()),
        };

        validate_module_names(&config.module_names)?;
        if config.key_alias.trim().is_empty() {
            return Err(PackagerError::Configuration {
                reason: "key alias must not be empty".to_owned(),
            });
        }
        Ok(config)
    }

    /// Resolve the full configuration for `project_root`.
    ///
    /// Loads the file layer (see [`ConfigLayer::load`]), places `overrides`
    /// on top of it and falls back to `$USER` for the staging owner.
    ///
    /// # Errors
    ///
    /// Propagates errors from loading the file layer and from
    /// [`PackagerConfig::resolve`].
    pub fn load(
        project_root: &Utf8Path,
        explicit: Option<&Utf8Path>,
        overrides: ConfigLayer,
    ) -> Result<Self> {
        let file = ConfigLayer::load(project_root, explicit)?;
        Self::resolve(project_root, overrides.over(file), std::env::var("USER").ok())
    }
}

/// Validate that a module list is usable.
///
/// Names must be unique, consist of ASCII letters and digits only, and end
/// with the `Module` suffix preceded by at least one character.
///
/// # Errors
///
/// Returns [`PackagerError::Configuration`] naming the first offending entry.
pub fn validate_module_names(names: &[ModuleName]) -> Result<()> {
    if names.is_empty() {
        return Err(PackagerError::Configuration {
            reason: "module list is empty".to_owned(),
        });
    }

    let mut seen = HashSet::new();
    for name in names {
        let s = name.as_str();
        let well_formed = s.len() > MODULE_SUFFIX.len()
            && s.ends_with(MODULE_SUFFIX)
            && s.chars().all(|c| c.is_ascii_alphanumeric());
        if !well_formed {
            return Err(PackagerError::Configuration {
                reason: format!("invalid module name {s:?}; expected e.g. \"PinModule\""),
            });
        }
        if !seen.insert(s) {
            return Err(PackagerError::Configuration {
                reason: format!("module {s} is listed more than once"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn root() -> Utf8PathBuf {
        Utf8PathBuf::from("/srv/backend")
    }

    #[test]
    fn defaults_match_the_wallet_layout() {
        let config = PackagerConfig::defaults(&root());
        assert_eq!(
            config.module_names,
            vec![
                ModuleName::from("PinModule"),
                ModuleName::from("ExampleModule"),
                ModuleName::from("AuthorizationServerModule"),
            ]
        );
        assert_eq!(config.keystore_path, "/srv/backend/RaspberryWallet.keystore");
        assert_eq!(config.key_alias, "signModules");
        assert_eq!(config.archive_tool, ArchiveTool::Jar);
    }

    #[test]
    fn parse_reads_every_key() {
        let toml = r#"
            modules = ["PinModule"]
            staging_dir = "/tmp/staging"
            publish_dir = "out/modules"
            keystore = "keys/test.keystore"
            key_alias = "testKey"
            archive_tool = "builtin"
            user = "pi"
        "#;
        let layer = ConfigLayer::parse(Utf8Path::new("packager.toml"), toml).expect("parse");
        let config = PackagerConfig::resolve(&root(), layer, None).expect("resolve");

        assert_eq!(config.module_names, vec![ModuleName::from("PinModule")]);
        assert_eq!(config.staging_dir, "/tmp/staging");
        assert_eq!(config.publish_dir, "/srv/backend/out/modules");
        assert_eq!(config.keystore_path, "/srv/backend/keys/test.keystore");
        assert_eq!(config.key_alias, "testKey");
        assert_eq!(config.archive_tool, ArchiveTool::Builtin);
        assert_eq!(config.invoking_user.as_deref(), Some("pi"));
    }

    #[test]
    fn parse_rejects_unknown_keys() {
        let err = ConfigLayer::parse(Utf8Path::new("packager.toml"), "moduels = []")
            .expect_err("typo should be rejected");
        assert!(matches!(err, PackagerError::InvalidConfigFile { .. }));
    }

    #[test]
    fn cli_layer_takes_precedence_over_file() {
        let file = ConfigLayer {
            key_alias: Some("fromFile".to_owned()),
            staging_dir: Some(Utf8PathBuf::from("/file/staging")),
            ..ConfigLayer::default()
        };
        let cli = ConfigLayer {
            key_alias: Some("fromCli".to_owned()),
            ..ConfigLayer::default()
        };
        let config = PackagerConfig::resolve(&root(), cli.over(file), None).expect("resolve");
        assert_eq!(config.key_alias, "fromCli");
        assert_eq!(config.staging_dir, "/file/staging");
    }

    #[rstest]
    #[case::configured(Some("pi"), Some("env-user"), Some("pi"))]
    #[case::environment(None, Some("env-user"), Some("env-user"))]
    #[case::absent(None, None, None)]
    #[case::blank(None, Some(""), None)]
    fn invoking_user_falls_back_to_environment(
        #[case] configured: Option<&str>,
        #[case] env_user: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        let layer = ConfigLayer {
            user: configured.map(str::to_owned),
            ..ConfigLayer::default()
        };
        let config =
            PackagerConfig::resolve(&root(), layer, env_user.map(str::to_owned)).expect("resolve");
        assert_eq!(config.invoking_user.as_deref(), expected);
    }

    #[rstest]
    #[case::valid(&["PinModule", "ExampleModule"], true)]
    #[case::empty(&[], false)]
    #[case::missing_suffix(&["Pin"], false)]
    #[case::bare_suffix(&["Module"], false)]
    #[case::path_traversal(&["../EvilModule"], false)]
    #[case::duplicate(&["PinModule", "PinModule"], false)]
    fn validate_module_names_variants(#[case] names: &[&str], #[case] expect_ok: bool) {
        let names: Vec<ModuleName> = names.iter().map(|&s| ModuleName::from(s)).collect();
        assert_eq!(validate_module_names(&names).is_ok(), expect_ok);
    }

    #[test]
    fn empty_key_alias_is_rejected() {
        let layer = ConfigLayer {
            key_alias: Some("  ".to_owned()),
            ..ConfigLayer::default()
        };
        let err = PackagerConfig::resolve(&root(), layer, None).expect_err("blank alias");
        assert!(matches!(err, PackagerError::Configuration { .. }));
    }

    #[test]
    fn load_discovers_file_in_project_root() {
        let temp = TempDir::new().expect("temp dir");
        let project = Utf8PathBuf::try_from(temp.path().to_owned()).expect("utf8");
        fs::write(project.join(CONFIG_FILE_NAME), "key_alias = \"discovered\"\n")
            .expect("write config");

        let layer = ConfigLayer::load(&project, None).expect("load");
        assert_eq!(layer.key_alias.as_deref(), Some("discovered"));
    }

    #[test]
    fn load_without_file_yields_empty_layer() {
        let temp = TempDir::new().expect("temp dir");
        let project = Utf8PathBuf::try_from(temp.path().to_owned()).expect("utf8");
        assert_eq!(
            ConfigLayer::load(&project, None).expect("load"),
            ConfigLayer::default()
        );
    }

    #[test]
    fn load_layers_overrides_over_file_and_user() {
        let temp = TempDir::new().expect("temp dir");
        let project = Utf8PathBuf::try_from(temp.path().to_owned()).expect("utf8");
        fs::write(
            project.join(CONFIG_FILE_NAME),
            "modules = [\"PinModule\"]\nkey_alias = \"fromFile\"\n",
        )
        .expect("write config");
        let overrides = ConfigLayer {
            key_alias: Some("fromCli".to_owned()),
            ..ConfigLayer::default()
        };

        let config = temp_env::with_var("USER", Some("wallet"), || {
            PackagerConfig::load(&project, None, overrides)
        })
        .expect("load");

        assert_eq!(config.module_names, vec![ModuleName::from("PinModule")]);
        assert_eq!(config.key_alias, "fromCli");
        assert_eq!(config.invoking_user.as_deref(), Some("wallet"));
    }

    #[test]
    fn load_requires_explicit_file_to_exist() {
        let temp = TempDir::new().expect("temp dir");
        let project = Utf8PathBuf::try_from(temp.path().to_owned()).expect("utf8");
        let missing = project.join("nope.toml");
        let err = ConfigLayer::load(&project, Some(&missing)).expect_err("missing file");
        assert!(matches!(err, PackagerError::Configuration { .. }));
    }
}
