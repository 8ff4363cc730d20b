//! Farm lifecycle.
//!
//! The farm is the shared infrastructure scaffold (`farm/`) plus the
//! registry file that records every project attached to it. Creating it is
//! idempotent: a second run refreshes the static files and leaves the
//! registry alone.

use crate::config::{Settings, Workspace};
use crate::error::Result;
use crate::materialize::{FarmSpec, Materializer};
use crate::registry::RegistryStore;
use std::fs;
use std::io::ErrorKind;
use tracing::{info, warn};

/// Backup target directories created inside a new farm.
const BACKUP_DIRS: [&str; 3] = ["backups-s3", "backups-gcs", "backups-azure"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FarmState {
    Absent,
    Present,
}

/// What [`FarmManager::ensure`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FarmOutcome {
    Created,
    Updated,
}

pub struct FarmManager<'a> {
    workspace: &'a Workspace,
    settings: &'a Settings,
    materializer: &'a dyn Materializer,
}

impl<'a> FarmManager<'a> {
    pub fn new(
        workspace: &'a Workspace,
        settings: &'a Settings,
        materializer: &'a dyn Materializer,
    ) -> Self {
        Self {
            workspace,
            settings,
            materializer,
        }
    }

    pub fn state(&self) -> FarmState {
        if self.workspace.farm_dir().is_dir() {
            FarmState::Present
        } else {
            FarmState::Absent
        }
    }

    fn store(&self) -> RegistryStore {
        RegistryStore::for_workspace(self.workspace)
    }

    /// Create the farm, or refresh its files when it already exists.
    ///
    /// Never touches an existing registry. A farm created by this call is
    /// removed again if writing its files fails.
    pub fn ensure(&self) -> Result<FarmOutcome> {
        let farm_dir = self.workspace.farm_dir();
        let outcome = match self.state() {
            FarmState::Absent => {
                fs::create_dir_all(&farm_dir)?;
                for dir in BACKUP_DIRS {
                    fs::create_dir_all(farm_dir.join(dir))?;
                }
                FarmOutcome::Created
            }
            FarmState::Present => FarmOutcome::Updated,
        };

        let spec = FarmSpec::from_settings(self.settings);
        if let Err(e) = self.materializer.write_farm(&farm_dir, &spec) {
            if outcome == FarmOutcome::Created {
                if let Err(cleanup) = fs::remove_dir_all(&farm_dir) {
                    warn!("Failed to remove partial farm {}: {}", farm_dir.display(), cleanup);
                }
            }
            return Err(e);
        }

        if self.store().ensure_exists()? {
            info!("Initialised empty project registry");
        }

        match outcome {
            FarmOutcome::Created => info!(
                network = %self.settings.network.name,
                "Created farm at {} using {}.0.0/16",
                farm_dir.display(),
                self.settings.network.subnet_prefix
            ),
            FarmOutcome::Updated => info!("Refreshed farm files in {}", farm_dir.display()),
        }
        Ok(outcome)
    }

    /// Destroy the farm scaffold and build it again.
    ///
    /// With `reset_registry` the registry is discarded too, forgetting every
    /// allocation; project directories are left where they are.
    pub fn recreate(&self, reset_registry: bool) -> Result<FarmOutcome> {
        self.remove_scaffold()?;
        if reset_registry {
            let store = self.store();
            let _lock = store.lock()?;
            store.discard()?;
            warn!("Registry reset; existing project directories are no longer tracked");
        }
        self.ensure()
    }

    /// Remove the farm scaffold and discard the registry. Returns whether
    /// anything was removed. Callers hold the registry lock.
    pub fn remove(&self) -> Result<bool> {
        let removed_dir = self.remove_scaffold()?;
        let removed_registry = self.store().discard()?;
        if removed_dir || removed_registry {
            info!("Removed farm and registry from {}", self.workspace.root().display());
        }
        Ok(removed_dir || removed_registry)
    }

    fn remove_scaffold(&self) -> Result<bool> {
        let farm_dir = self.workspace.farm_dir();
        match fs::remove_dir_all(&farm_dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
