// Allow unused_assignments at module level because thiserror's generated code
// for struct variants triggers false positive warnings - the fields ARE used
// in the Display impl but rustc's lint pass doesn't see this.
#![allow(unused_assignments)]

use crate::docker::DockerError;
use miette::Diagnostic;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Project '{name}' already exists{}", describe_sides(.registered, .on_disk))]
    #[diagnostic(
        code(turbine::project::already_exists),
        help("Pick another name, or recreate it with: turbine create-project --force")
    )]
    AlreadyExists {
        name: String,
        registered: bool,
        on_disk: bool,
    },

    #[error("Project '{0}' not found")]
    #[diagnostic(
        code(turbine::project::not_found),
        help("List known projects with `turbine list-projects`")
    )]
    NotFound(String),

    #[error("Project '{name}' is in an inconsistent state: {detail}")]
    #[diagnostic(
        code(turbine::project::inconsistent),
        help("Run `turbine delete-project {name}` to reconcile, then create it again")
    )]
    InconsistentState { name: String, detail: String },

    #[error("No free {resource} left: {detail}")]
    #[diagnostic(
        code(turbine::allocator::exhausted),
        help("Delete unused projects with `turbine delete-project <name>` to free resources")
    )]
    ResourceExhausted { resource: String, detail: String },

    #[error("Project registry {} is corrupt: {reason}", .path.display())]
    #[diagnostic(
        code(turbine::registry::corrupt),
        help("Fix or move the file aside; an absent registry is treated as empty")
    )]
    StorageCorrupt { path: PathBuf, reason: String },

    #[error("Failed to write project files for '{name}': {reason}")]
    #[diagnostic(code(turbine::materialize::failed))]
    Materialization { name: String, reason: String },

    #[error("Invalid project name '{name}': {reason}")]
    #[diagnostic(
        code(turbine::project::invalid_name),
        help("Use letters, digits, '-' and '_' only")
    )]
    InvalidName { name: String, reason: String },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(turbine::config::error))]
    Config(String),

    #[error("Registry lock error: {0}")]
    #[diagnostic(code(turbine::registry::lock))]
    Lock(String),

    #[error("Docker error: {0}")]
    #[diagnostic(
        code(turbine::docker::error),
        help("Check that Docker is running with `docker ps`")
    )]
    Docker(#[from] DockerError),

    #[error("Operation aborted by user")]
    Aborted,

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn describe_sides(registered: &bool, on_disk: &bool) -> &'static str {
    match (*registered, *on_disk) {
        (true, true) => "",
        (true, false) => " (registered, but its directory is missing)",
        (false, true) => " (directory exists, but it is not registered)",
        (false, false) => "",
    }
}

impl Error {
    pub(crate) fn exhausted(resource: impl Into<String>, detail: impl Into<String>) -> Self {
        Error::ResourceExhausted {
            resource: resource.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn materialization(name: impl Into<String>, reason: impl ToString) -> Self {
        Error::Materialization {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::AlreadyExists {
                name,
                registered,
                on_disk,
            } if registered != on_disk => Some(format!(
                "The registry and the project directory disagree. Run `turbine delete-project {}` to clean up both sides.",
                name
            )),
            Error::AlreadyExists { .. } => Some(
                "Choose a different name, or pass --force to delete and recreate the project."
                    .to_string(),
            ),
            Error::NotFound(_) => {
                Some("Check `turbine list-projects` for registered project names.".to_string())
            }
            Error::InconsistentState { name, .. } => Some(format!(
                "Run `turbine delete-project {}` to reconcile the registry with the filesystem.",
                name
            )),
            Error::ResourceExhausted { .. } => Some(
                "Every slot in this namespace is in use. Delete projects you no longer need."
                    .to_string(),
            ),
            Error::StorageCorrupt { path, .. } => Some(format!(
                "Inspect {} by hand. Moving it aside resets the registry to empty, which forgets every allocation.",
                path.display()
            )),
            Error::Materialization { .. } => Some(
                "Check free disk space and write permissions in the working directory.".to_string(),
            ),
            Error::Lock(_) => Some(
                "Another turbine invocation may be running in this directory. Wait for it to finish."
                    .to_string(),
            ),
            Error::Docker(_) => Some("Check that Docker is running: docker ps".to_string()),
            Error::Config(_) | Error::Yaml(_) => {
                Some("Review turbine.yaml; every field is optional.".to_string())
            }
            _ => None,
        }
    }

    /// Formats the error with its suggestion (if any) for user-friendly display.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Aborted => 130,
            Error::AlreadyExists { .. } => 3,
            Error::NotFound(_) => 4,
            Error::ResourceExhausted { .. } => 5,
            Error::StorageCorrupt { .. } => 6,
            _ => 1,
        }
    }
}
