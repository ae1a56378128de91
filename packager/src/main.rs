//! Wallet packager CLI entrypoint.
//!
//! This binary packages RaspberryWallet modules into signed jars, verifies
//! published jars, and syncs the web frontend into the backend assets.

use camino::Utf8Path;
use clap::Parser;
use std::io::Write;
use wallet_packager::cli::{Cli, Command, ModulesArgs, VerifyArgs, WebappArgs};
use wallet_packager::config::{ConfigLayer, PackagerConfig};
use wallet_packager::credentials::{
    CredentialProvider, EnvCredentialProvider, PromptCredentialProvider,
};
use wallet_packager::error::{PackagerError, Result};
use wallet_packager::executor::SystemCommandExecutor;
use wallet_packager::output::{DryRunInfo, write_stderr_line};
use wallet_packager::pipeline::{PipelineContext, run_packaging};
use wallet_packager::project::{MANAGER_MARKER, SERVER_HTTP_MARKER, resolve_project_root};
use wallet_packager::signer::SigningKey;
use wallet_packager::verify::{format_human, format_json, verify_published};
use wallet_packager::webapp::{WebappConfig, sync_webapp};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Maps `-v` occurrences onto a log level; `RUST_LOG` still wins.
fn log_filter(verbosity: u8) -> log::LevelFilter {
    match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn init_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log_filter(verbosity))
        .parse_default_env()
        .format_timestamp(None);
    if builder.try_init().is_err() {
        // A logger is already installed; keep it.
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    match &cli.command {
        None => run_modules(cli, &cli.modules, stderr),
        Some(Command::Modules(args)) => run_modules(cli, args, stderr),
        Some(Command::Verify(args)) => run_verify(cli, args, stdout, stderr),
        Some(Command::Webapp(args)) => run_webapp(cli, args, stderr),
    }
}

/// Resolves configuration for a command operating on the module layout.
fn load_config(
    project_root: Option<&Utf8Path>,
    config_file: Option<&Utf8Path>,
    overrides: ConfigLayer,
) -> Result<PackagerConfig> {
    let project_root = resolve_project_root(project_root, &[MANAGER_MARKER])?;
    PackagerConfig::load(&project_root, config_file, overrides)
}

fn run_modules(cli: &Cli, args: &ModulesArgs, stderr: &mut dyn Write) -> Result<()> {
    let config = load_config(
        args.project_root.as_deref(),
        args.config.as_deref(),
        args.to_layer(),
    )?;

    if cli.dry_run {
        let info = DryRunInfo {
            config: &config,
            non_interactive: args.non_interactive,
        };
        write_stderr_line(stderr, info.display_text());
        return Ok(());
    }

    let credentials: Box<dyn CredentialProvider> = if args.non_interactive {
        Box::new(EnvCredentialProvider)
    } else {
        Box::new(PromptCredentialProvider::stdio())
    };
    let executor = SystemCommandExecutor::default();
    let context = PipelineContext {
        config: &config,
        executor: &executor,
        credentials: credentials.as_ref(),
        quiet: cli.quiet,
    };

    run_packaging(&context, stderr).map(|_| ())
}

fn run_verify(
    cli: &Cli,
    args: &VerifyArgs,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    let config = load_config(
        args.project_root.as_deref(),
        args.config.as_deref(),
        args.to_layer(),
    )?;
    let key = SigningKey {
        keystore: &config.keystore_path,
        alias: &config.key_alias,
    };

    if cli.dry_run {
        write_stderr_line(stderr, "Dry run - no files will be modified");
        write_stderr_line(stderr, "");
        write_stderr_line(stderr, format!("Publish directory: {}", config.publish_dir));
        write_stderr_line(stderr, format!("Keystore: {}", config.keystore_path));
        write_stderr_line(stderr, format!("Key alias: {}", config.key_alias));
        return Ok(());
    }

    let records = verify_published(&config.publish_dir, &key, &SystemCommandExecutor::default())?;
    let report = if args.json {
        format_json(&records, &config.publish_dir)
    } else {
        format_human(&records, &config.publish_dir)
    };
    writeln!(stdout, "{report}").map_err(PackagerError::Io)
}

fn run_webapp(cli: &Cli, args: &WebappArgs, stderr: &mut dyn Write) -> Result<()> {
    let backend_root = resolve_project_root(args.project_root.as_deref(), &[SERVER_HTTP_MARKER])?;
    let config = WebappConfig::with_overrides(
        &backend_root,
        args.frontend_dir.clone(),
        args.assets_dir.clone(),
    );

    if cli.dry_run {
        write_stderr_line(stderr, config.display_text());
        return Ok(());
    }

    if !cli.quiet {
        write_stderr_line(
            stderr,
            format!("Building frontend in {}...", config.frontend_dir),
        );
    }

    let copied = sync_webapp(&config, &SystemCommandExecutor::default())?;

    if !cli.quiet {
        write_stderr_line(
            stderr,
            format!("Copied {copied} file(s) to {}", config.assets_dir),
        );
    }
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error [{}]: {err}", err.stage()));
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use rstest::rstest;
    use wallet_packager::module_name::ModuleName;

    #[test]
    fn exit_code_for_run_result_returns_zero_on_success() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Ok(()), &mut stderr);
        assert_eq!(exit_code, 0);
        assert!(stderr.is_empty());
    }

    #[test]
    fn exit_code_for_run_result_prints_stage_and_artifact() {
        let err = PackagerError::MissingArtifact {
            module: ModuleName::from("ExampleModule"),
            path: Utf8PathBuf::from("/srv/backend/Manager/ExampleModule.class"),
        };

        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(err), &mut stderr);
        assert_eq!(exit_code, 1);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert!(stderr_text.starts_with("error [stage]:"));
        assert!(stderr_text.contains("ExampleModule"));
    }

    #[rstest]
    #[case::default(0, log::LevelFilter::Warn)]
    #[case::verbose(1, log::LevelFilter::Info)]
    #[case::debug(2, log::LevelFilter::Debug)]
    #[case::trace(3, log::LevelFilter::Trace)]
    #[case::saturates(9, log::LevelFilter::Trace)]
    fn log_filter_follows_verbosity(#[case] verbosity: u8, #[case] expected: log::LevelFilter) {
        assert_eq!(log_filter(verbosity), expected);
    }

    #[test]
    fn dry_run_prints_plan_without_side_effects() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_owned()).expect("utf8");
        std::fs::create_dir_all(root.join("Manager")).expect("Manager");
        let staging = root.join("staging");
        let cli = Cli::parse_from([
            "wallet-packager",
            "--dry-run",
            "--project-root",
            root.as_str(),
            "--staging-dir",
            staging.as_str(),
            "--user",
            "pi",
        ]);

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        run(&cli, &mut stdout, &mut stderr).expect("dry run");

        let text = String::from_utf8(stderr).expect("utf8");
        assert!(text.contains("Dry run - no files will be modified"));
        assert!(text.contains("AuthorizationServerModule"));
        assert!(!staging.exists());
        assert!(!root.join("modules").exists());
    }
}
