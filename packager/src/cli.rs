//! CLI argument definitions for the wallet packager.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::config::{ArchiveTool, ConfigLayer};
use crate::module_name::ModuleName;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Package, sign and publish RaspberryWallet modules.
#[derive(Parser, Debug, Default)]
#[command(name = "wallet-packager")]
#[command(version, about)]
#[command(long_about = concat!(
    "Package, sign and publish RaspberryWallet modules.\n\n",
    "Copies each compiled module class from the Manager build output into the ",
    "system staging directory, turns it into a jar, signs the jar with the ",
    "project keystore and publishes the signed jar into the project's modules ",
    "directory. The staging directory is created with sudo when it is absent.\n\n",
    "Settings are read from packager.toml in the project root when present; ",
    "command-line flags take precedence.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Package the default modules:\n",
    "    $ wallet-packager\n\n",
    "  Package a single module without a JDK jar tool:\n",
    "    $ wallet-packager --module PinModule --archive-tool builtin\n\n",
    "  Run unattended with passwords from the environment:\n",
    "    $ WALLET_ADMIN_PASSWORD=... WALLET_KEYSTORE_PASSWORD=... \\\n",
    "      wallet-packager --non-interactive\n\n",
    "  Check the published jars:\n",
    "    $ wallet-packager verify --json\n\n",
    "  Rebuild the frontend and refresh the backend assets:\n",
    "    $ wallet-packager webapp",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Packaging arguments (used when no subcommand is given).
    #[command(flatten)]
    pub modules: ModulesArgs,

    /// Show what would be done and exit without touching anything.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Package, sign and publish modules (default when no subcommand given).
    Modules(ModulesArgs),

    /// Verify the signatures of published modules.
    Verify(VerifyArgs),

    /// Build the web frontend and copy it into the backend assets.
    Webapp(WebappArgs),
}

/// Arguments for the modules command.
#[derive(Parser, Debug, Clone, Default)]
pub struct ModulesArgs {
    /// Configuration file [default: <PROJECT_ROOT>/packager.toml].
    #[arg(long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Backend project root [default: searched upwards from the current directory].
    #[arg(long, value_name = "DIR")]
    pub project_root: Option<Utf8PathBuf>,

    /// Package a specific module by name (can be repeated).
    #[arg(short, long, value_name = "NAME")]
    pub module: Vec<String>,

    /// System staging directory [default: /opt/wallet/modules].
    #[arg(long, value_name = "DIR")]
    pub staging_dir: Option<Utf8PathBuf>,

    /// Directory receiving signed modules [default: <PROJECT_ROOT>/modules].
    #[arg(long, value_name = "DIR")]
    pub publish_dir: Option<Utf8PathBuf>,

    /// Keystore holding the signing key [default: <PROJECT_ROOT>/RaspberryWallet.keystore].
    #[arg(long, value_name = "FILE")]
    pub keystore: Option<Utf8PathBuf>,

    /// Alias of the signing key [default: signModules].
    #[arg(long, value_name = "ALIAS")]
    pub alias: Option<String>,

    /// Tool used to build jars [default: jar].
    #[arg(long, value_enum, value_name = "TOOL")]
    pub archive_tool: Option<ArchiveTool>,

    /// Owner of a newly created staging directory [default: $USER].
    #[arg(long, value_name = "USER")]
    pub user: Option<String>,

    /// Read passwords from WALLET_ADMIN_PASSWORD and WALLET_KEYSTORE_PASSWORD
    /// instead of prompting.
    #[arg(long)]
    pub non_interactive: bool,
}

impl ModulesArgs {
    /// The configuration layer these flags describe.
    ///
    /// # Examples
    ///
    /// ```
    /// use wallet_packager::cli::ModulesArgs;
    ///
    /// let args = ModulesArgs {
    ///     module: vec!["PinModule".to_owned()],
    ///     ..ModulesArgs::default()
    /// };
    /// let layer = args.to_layer();
    /// assert_eq!(layer.modules.map(|m| m.len()), Some(1));
    /// assert!(layer.staging_dir.is_none());
    /// ```
    #[must_use]
    pub fn to_layer(&self) -> ConfigLayer {
        let modules = (!self.module.is_empty()).then(|| {
            self.module
                .iter()
                .map(|name| ModuleName::from(name.as_str()))
                .collect()
        });

        ConfigLayer {
            modules,
            staging_dir: self.staging_dir.clone(),
            publish_dir: self.publish_dir.clone(),
            keystore: self.keystore.clone(),
            key_alias: self.alias.clone(),
            archive_tool: self.archive_tool,
            user: self.user.clone(),
        }
    }
}

/// Arguments for the verify command.
#[derive(Parser, Debug, Clone, Default)]
pub struct VerifyArgs {
    /// Configuration file [default: <PROJECT_ROOT>/packager.toml].
    #[arg(long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Backend project root [default: searched upwards from the current directory].
    #[arg(long, value_name = "DIR")]
    pub project_root: Option<Utf8PathBuf>,

    /// Directory holding signed modules [default: <PROJECT_ROOT>/modules].
    #[arg(long, value_name = "DIR")]
    pub publish_dir: Option<Utf8PathBuf>,

    /// Keystore holding the signing key.
    #[arg(long, value_name = "FILE")]
    pub keystore: Option<Utf8PathBuf>,

    /// Alias of the signing key.
    #[arg(long, value_name = "ALIAS")]
    pub alias: Option<String>,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

impl VerifyArgs {
    /// The configuration layer these flags describe.
    #[must_use]
    pub fn to_layer(&self) -> ConfigLayer {
        ConfigLayer {
            publish_dir: self.publish_dir.clone(),
            keystore: self.keystore.clone(),
            key_alias: self.alias.clone(),
            ..ConfigLayer::default()
        }
    }
}

/// Arguments for the webapp command.
#[derive(Parser, Debug, Clone, Default)]
pub struct WebappArgs {
    /// Backend project root [default: searched upwards from the current directory].
    #[arg(long, value_name = "DIR")]
    pub project_root: Option<Utf8PathBuf>,

    /// Frontend checkout [default: <PROJECT_ROOT>/../../JSProjects/raspberry-wallet-frontend].
    #[arg(long, value_name = "DIR")]
    pub frontend_dir: Option<Utf8PathBuf>,

    /// Backend asset directory [default: <PROJECT_ROOT>/ServerHttp/src/main/resources/assets].
    #[arg(long, value_name = "DIR")]
    pub assets_dir: Option<Utf8PathBuf>,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
