use super::Settings;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory.
pub const SETTINGS_FILE_NAME: &str = "turbine.yaml";

pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Settings file inside `dir`, accepting the `.yml` spelling too.
    pub fn find_settings_in_dir(dir: &Path) -> Option<PathBuf> {
        let path = dir.join(SETTINGS_FILE_NAME);
        if path.exists() {
            return Some(path);
        }
        let alt_path = dir.join("turbine.yml");
        if alt_path.exists() {
            return Some(alt_path);
        }
        None
    }

    /// Load settings from an explicit path. The file must exist.
    pub fn load_settings<P: AsRef<Path>>(&self, path: P) -> Result<Settings> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read settings file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        self.parse_settings(&content)
    }

    /// Load `turbine.yaml` from `dir`, or defaults when there is none.
    pub fn load_settings_or_default(&self, dir: &Path) -> Result<Settings> {
        match Self::find_settings_in_dir(dir) {
            Some(path) => {
                tracing::debug!("Loading settings from {}", path.display());
                self.load_settings(path)
            }
            None => Ok(Settings::default()),
        }
    }

    pub fn parse_settings(&self, content: &str) -> Result<Settings> {
        // An empty file deserializes to `null`, which is not a mapping.
        if content.trim().is_empty() {
            return Ok(Settings::default());
        }
        let settings: Settings = serde_yaml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}
