mod cli;
mod commands;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use output::{CliOutput, QuietOutput, UserOutput};
use std::path::{Path, PathBuf};
use turbine::{Error as TurbineError, Parser as SettingsParser, ProjectManager, Workspace};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if let Some(turbine_error) = e.downcast_ref::<TurbineError>() {
            if matches!(turbine_error, TurbineError::Aborted) {
                eprintln!("Cancelled.");
            } else {
                eprintln!("Error: {}", turbine_error);
                if let Some(suggestion) = turbine_error.suggestion() {
                    eprintln!("\nHint: {}", suggestion);
                }
            }
            std::process::exit(turbine_error.exit_code());
        }
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let Cli {
        config,
        workdir,
        verbose,
        log_file,
        yes,
        quiet,
        command,
    } = Cli::parse();
    init_tracing(verbose, log_file.as_deref())?;

    let out: Box<dyn UserOutput> = if quiet {
        Box::new(QuietOutput::new(yes))
    } else {
        Box::new(CliOutput::new(yes))
    };
    let out = out.as_ref();

    // Settings are only read by commands that touch the workspace.
    let open_workspace = || -> anyhow::Result<ProjectManager> {
        let work_dir = resolve_work_dir(workdir.clone())?;
        let parser = SettingsParser::new();
        let settings = match &config {
            Some(path) => parser.load_settings(path)?,
            None => parser.load_settings_or_default(&work_dir)?,
        };
        tracing::debug!(work_dir = %work_dir.display(), ?settings, "Resolved workspace");
        Ok(ProjectManager::new(Workspace::new(work_dir), settings))
    };

    match command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(())
        }
        Commands::InitFarm { force } => {
            let manager = open_workspace()?;
            commands::run_init_farm(&manager, force, out)
        }
        Commands::CreateProject {
            name,
            kind,
            remote_logging,
            vault,
            code_server,
            force,
        } => {
            let manager = open_workspace()?;
            let args = commands::CreateArgs {
                name,
                kind,
                remote_logging,
                vault,
                code_server,
                force,
            };
            commands::run_create_project(&manager, args, out).await
        }
        Commands::StartProject { name } => {
            let manager = open_workspace()?;
            commands::run_start_project(&manager, &name, out).await
        }
        Commands::StopProject { name } => {
            let manager = open_workspace()?;
            commands::run_stop_project(&manager, &name, out).await
        }
        Commands::DeleteProject { name } => {
            let manager = open_workspace()?;
            commands::run_delete_project(&manager, &name, out).await
        }
        Commands::DeleteFarm => {
            let manager = open_workspace()?;
            commands::run_delete_farm(&manager, out).await
        }
        Commands::DeleteAll => {
            let manager = open_workspace()?;
            commands::run_delete_all(&manager, out).await
        }
        Commands::ListProjects { json } => {
            let manager = open_workspace()?;
            commands::run_list_projects(&manager, json, out)
        }
    }
}

/// Resolve the work directory from CLI `--workdir` or the current directory.
fn resolve_work_dir(workdir: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match workdir {
        Some(workdir) => Ok(workdir),
        None => Ok(std::env::current_dir()?),
    }
}

fn init_tracing(verbose: u8, log_file: Option<&Path>) -> anyhow::Result<()> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr.and(std::sync::Mutex::new(file)))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}
