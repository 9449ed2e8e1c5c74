use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use da_engine::{WorkflowOptions, run_workflow};
use da_util::{PackageError, credentials_from_env, default_config_path, load_config_from_path, package_directory};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "da-sample", version, about = "Design Automation part and assembly sample")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Publish the app bundle and activity, then run the work items.
    Run {
        /// Configuration file; defaults to $DA_CONFIG_PATH or ./config.json.
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
        /// Only run the part work item.
        #[arg(long)]
        skip_assembly: bool,
        /// Where reports and results are written.
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
    /// Zip a bundle directory into DEST_DIR/ARCHIVE_NAME.
    Package {
        source_dir: PathBuf,
        dest_dir: PathBuf,
        archive_name: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => return usage_exit(err),
    };

    let result = match cli.command {
        Command::Run {
            config,
            skip_assembly,
            output_dir,
        } => run_command(config, skip_assembly, output_dir).await,
        Command::Package {
            source_dir,
            dest_dir,
            archive_name,
        } => match package_command(&source_dir, &dest_dir, &archive_name) {
            Err(PackageError::SourceNotFound(path)) => {
                eprintln!("source directory {} does not exist\n\n{}", path.display(), package_usage());
                return ExitCode::FAILURE;
            }
            other => other.map_err(anyhow::Error::from),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "da-sample failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

/// Prints help/version normally; any other parse error prints usage and exits 1.
fn usage_exit(err: clap::Error) -> ExitCode {
    let _ = err.print();
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

fn package_usage() -> String {
    let mut command = Cli::command();
    command
        .find_subcommand_mut("package")
        .map(|sub| sub.render_usage().to_string())
        .unwrap_or_default()
}

async fn run_command(config: Option<PathBuf>, skip_assembly: bool, output_dir: Option<PathBuf>) -> Result<()> {
    let config_path = config.unwrap_or_else(default_config_path);
    let config = load_config_from_path(&config_path)?;
    let credentials = credentials_from_env()?;
    let options = WorkflowOptions {
        skip_assembly,
        output_dir,
        ..WorkflowOptions::default()
    };
    info!(config = %config_path.display(), app_id = %config.app_id, "starting workflow");
    run_workflow(config, credentials, options).await.context("workflow failed")
}

fn package_command(source_dir: &Path, dest_dir: &Path, archive_name: &str) -> Result<(), PackageError> {
    let archive = package_directory(source_dir, dest_dir, archive_name)?;
    info!(archive = %archive.display(), "bundle packaged");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from(["da-sample", "run", "--config", "cfg.json", "--skip-assembly"]).unwrap();
        match cli.command {
            Command::Run {
                config,
                skip_assembly,
                output_dir,
            } => {
                assert_eq!(config, Some(PathBuf::from("cfg.json")));
                assert!(skip_assembly);
                assert!(output_dir.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn package_requires_three_positionals() {
        let err = Cli::try_parse_from(["da-sample", "package", "src", "dest"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert!(Cli::try_parse_from(["da-sample", "package", "a", "b", "c", "d"]).is_err());
    }

    #[test]
    fn package_usage_names_the_positionals() {
        let usage = package_usage();
        assert!(usage.contains("<SOURCE_DIR>"));
        assert!(usage.contains("<ARCHIVE_NAME>"));
    }

    #[test]
    fn package_command_writes_the_archive() {
        let workspace = tempdir().unwrap();
        let source = workspace.path().join("bundle");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("PackageContents.xml"), "<xml/>").unwrap();

        package_command(&source, &workspace.path().join("out"), "app.zip").unwrap();
        assert!(workspace.path().join("out").join("app.zip").is_file());
    }

    #[test]
    fn package_command_reports_a_missing_source() {
        let workspace = tempdir().unwrap();
        let error = package_command(&workspace.path().join("missing"), workspace.path(), "app.zip").unwrap_err();
        assert!(matches!(error, PackageError::SourceNotFound(_)));
    }
}
