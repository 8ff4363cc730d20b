use std::path::{Path, PathBuf};

/// Directory holding the shared infrastructure scaffold.
pub const FARM_DIR_NAME: &str = "farm";
/// Registry file, relative to the working directory.
pub const REGISTRY_FILE_NAME: &str = ".cache";
/// Advisory lock guarding registry read-modify-write cycles.
pub const LOCK_FILE_NAME: &str = ".cache.lock";

/// Filesystem layout rooted at the working directory.
///
/// The farm, the registry and every project directory are siblings:
///
/// ```text
/// <root>/
///   .cache
///   .cache.lock
///   farm/
///   demo-astro-airflow/
///     dags/ logs/ plugins/
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn farm_dir(&self) -> PathBuf {
        self.root.join(FARM_DIR_NAME)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE_NAME)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE_NAME)
    }

    /// Directory of a project, by canonical name.
    pub fn project_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let ws = Workspace::new("/work");
        assert_eq!(ws.farm_dir(), PathBuf::from("/work/farm"));
        assert_eq!(ws.registry_path(), PathBuf::from("/work/.cache"));
        assert_eq!(ws.lock_path(), PathBuf::from("/work/.cache.lock"));
        assert_eq!(
            ws.project_dir("demo-astro-airflow"),
            PathBuf::from("/work/demo-astro-airflow")
        );
    }
}
