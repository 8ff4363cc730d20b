use super::naming::kind_from_canonical;
use crate::config::Workspace;
use crate::error::Result;
use crate::registry::{ProjectRecord, Registry};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;

/// Agreement between the registry and the project directory on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectHealth {
    Ok,
    /// Registered, but the directory is gone.
    MissingDirectory,
    /// A project directory the registry does not know about.
    Unregistered,
}

impl ProjectHealth {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectHealth::Ok => "ok",
            ProjectHealth::MissingDirectory => "missing-directory",
            ProjectHealth::Unregistered => "unregistered-directory",
        }
    }
}

/// One project as seen from both sides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectEntry {
    pub name: String,
    pub health: ProjectHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ProjectRecord>,
}

/// Every registered project plus every directory in the workspace root whose
/// name looks like a project (`*-{astro,oss,oss_dev}-airflow`), ordered by
/// name.
pub(super) fn scan(workspace: &Workspace, registry: &Registry) -> Result<Vec<ProjectEntry>> {
    let mut entries: BTreeMap<String, ProjectEntry> = registry
        .iter()
        .map(|(name, record)| {
            let health = if workspace.project_dir(name).is_dir() {
                ProjectHealth::Ok
            } else {
                ProjectHealth::MissingDirectory
            };
            (
                name.to_string(),
                ProjectEntry {
                    name: name.to_string(),
                    health,
                    record: Some(record.clone()),
                },
            )
        })
        .collect();

    let dir_entries = match fs::read_dir(workspace.root()) {
        Ok(dir_entries) => dir_entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(entries.into_values().collect()),
        Err(e) => return Err(e.into()),
    };

    for entry in dir_entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if kind_from_canonical(&name).is_none() || entries.contains_key(&name) {
            continue;
        }
        entries.insert(
            name.clone(),
            ProjectEntry {
                name,
                health: ProjectHealth::Unregistered,
                record: None,
            },
        );
    }

    Ok(entries.into_values().collect())
}
