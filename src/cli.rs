use clap::{Parser, Subcommand};
use std::path::PathBuf;
use turbine::ProjectKind;

#[derive(Parser)]
#[command(name = "turbine")]
#[command(version)]
#[command(about = "Turbine - Provision local Airflow projects on a shared farm")]
pub struct Cli {
    /// Settings file path (defaults to turbine.yaml in the working directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Working directory holding the farm, the registry and projects
    #[arg(short, long, global = true)]
    pub workdir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Append logs to this file in addition to stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Only print errors and machine-readable output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the shared farm, or refresh its files if it exists
    InitFarm {
        /// Delete the farm scaffold and build it again
        #[arg(long)]
        force: bool,
    },
    /// Create a new Airflow project
    CreateProject {
        /// Project name (prompted for when omitted)
        #[arg(short, long)]
        name: Option<String>,

        /// Project kind: astro, oss or oss_dev (prompted for when omitted)
        #[arg(short, long, value_parser = parse_kind)]
        kind: Option<ProjectKind>,

        /// Ship task logs to the farm's OpenSearch
        #[arg(long)]
        remote_logging: bool,

        /// Use the farm's Vault as secrets backend
        #[arg(long)]
        vault: bool,

        /// Add a code-server IDE container
        #[arg(long)]
        code_server: bool,

        /// Delete an existing project of the same name and recreate it
        #[arg(long)]
        force: bool,
    },
    /// Start a project's containers
    StartProject {
        /// Canonical project name (e.g. demo-astro-airflow)
        name: String,
    },
    /// Stop a project's containers
    StopProject {
        /// Canonical project name (e.g. demo-astro-airflow)
        name: String,
    },
    /// Delete a project, its registry entry and its database
    DeleteProject {
        /// Canonical project name (e.g. demo-astro-airflow)
        name: String,
    },
    /// Delete the farm, asking about each project first
    DeleteFarm,
    /// Delete every project and the farm
    DeleteAll,
    /// List registered projects and their resources
    ListProjects {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

fn parse_kind(value: &str) -> Result<ProjectKind, String> {
    value.parse().map_err(|e: turbine::Error| e.to_string())
}
