//! Output formatting for the packager CLI.
//!
//! Progress and summaries go to stderr; the packager writes nothing to
//! stdout except machine-readable reports such as `verify --json`.

use crate::config::PackagerConfig;
use camino::Utf8Path;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Format a success message after publishing.
#[must_use]
pub fn success_message(count: usize, publish_dir: &Utf8Path) -> String {
    let plural = if count == 1 { "module" } else { "modules" };
    format!("Successfully published {count} signed {plural} to {publish_dir}")
}

/// Configuration information for dry-run output.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use wallet_packager::config::PackagerConfig;
/// use wallet_packager::output::DryRunInfo;
///
/// let config = PackagerConfig::defaults(Utf8Path::new("/srv/backend"));
/// let info = DryRunInfo { config: &config, non_interactive: false };
///
/// let output = info.display_text();
/// assert!(output.contains("Dry run"));
/// assert!(output.contains("PinModule"));
/// ```
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// The resolved configuration.
    pub config: &'a PackagerConfig,
    /// Whether credentials come from the environment.
    pub non_interactive: bool,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let config = self.config;
        let owner = config.invoking_user.as_deref().unwrap_or("(unknown)");
        let credentials = if self.non_interactive {
            "environment"
        } else {
            "prompt"
        };

        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Project root: {}", config.project_root),
            format!("Staging directory: {}", config.staging_dir),
            format!("Publish directory: {}", config.publish_dir),
            format!("Keystore: {}", config.keystore_path),
            format!("Key alias: {}", config.key_alias),
            format!("Archive tool: {}", config.archive_tool),
            format!("Staging owner: {owner}"),
            format!("Credentials: {credentials}"),
            String::new(),
            "Modules to package:".to_owned(),
        ];

        for module in &config.module_names {
            lines.push(format!(
                "  - {module} ({})",
                module.source_path(&config.project_root)
            ));
        }

        lines.join("\n")
    }
}
