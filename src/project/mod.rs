//! Project lifecycle.
//!
//! [`ProjectManager`] is the only place that allocates, materializes and
//! records a project as one unit. Every registry read-modify-write runs under
//! the registry lock, so two invocations in the same working directory never
//! hand out the same resources.
//!
//! A create that fails after its directory was made removes the directory
//! again and leaves the registry untouched. A delete converges to "neither
//! directory nor record" from any starting combination.

mod audit;
mod naming;

pub use audit::{ProjectEntry, ProjectHealth};
pub use naming::{canonical_name, kind_from_canonical};

use crate::allocator::{allocate, HostProbe, PortProbe, ResourceBundle};
use crate::config::{Settings, Workspace, FARM_DIR_NAME};
use crate::error::{Error, Result};
use crate::farm::{FarmManager, FarmState};
use crate::materialize::{Arch, Materializer, ProjectSpec, TemplateMaterializer};
use crate::registry::{ProjectKind, ProjectOptions, ProjectRecord, Registry, RegistryStore};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Subdirectories every project starts with.
const PROJECT_SUBDIRS: [&str; 3] = ["dags", "logs", "plugins"];

/// Asks whether a project directory may be deleted. Receives the project
/// name and its directory.
pub type ConfirmFn<'a> = dyn FnMut(&str, &Path) -> bool + 'a;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    /// Name as typed by the user; canonicalized before use.
    pub name: String,
    pub kind: ProjectKind,
    pub options: ProjectOptions,
}

impl CreateRequest {
    pub fn new(name: impl Into<String>, kind: ProjectKind, options: ProjectOptions) -> Self {
        Self {
            name: name.into(),
            kind,
            options,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedProject {
    pub name: String,
    pub dir: PathBuf,
    pub bundle: ResourceBundle,
    pub record: ProjectRecord,
    /// Whether the farm had to be initialised first.
    pub farm_created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub name: String,
    /// Database of the removed record, for the caller to drop.
    pub db_name: Option<String>,
    pub removed_dir: bool,
    pub removed_record: bool,
}

/// Result of tearing down every project and the farm.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub deleted: Vec<DeleteOutcome>,
    /// Projects whose deletion was declined.
    pub skipped: Vec<String>,
    pub failed: Vec<(String, Error)>,
    pub farm_removed: bool,
}

pub struct ProjectManager {
    workspace: Workspace,
    settings: Settings,
    store: RegistryStore,
    materializer: Box<dyn Materializer>,
    probe: Box<dyn PortProbe>,
    arch: Option<Arch>,
}

impl ProjectManager {
    /// Manager with the template materializer and a localhost port probe.
    pub fn new(workspace: Workspace, settings: Settings) -> Self {
        let probe = HostProbe::new(settings.probe.timeout());
        Self {
            store: RegistryStore::for_workspace(&workspace),
            workspace,
            settings,
            materializer: Box::new(TemplateMaterializer::new()),
            probe: Box::new(probe),
            arch: None,
        }
    }

    pub fn with_materializer(mut self, materializer: impl Materializer + 'static) -> Self {
        self.materializer = Box::new(materializer);
        self
    }

    pub fn with_probe(mut self, probe: impl PortProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    /// Pin the image platform instead of detecting it.
    pub fn with_arch(mut self, arch: Arch) -> Self {
        self.arch = Some(arch);
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    pub fn farm(&self) -> FarmManager<'_> {
        FarmManager::new(&self.workspace, &self.settings, self.materializer.as_ref())
    }

    /// Create a project, initialising the farm first when it is absent.
    pub fn create(&self, request: &CreateRequest) -> Result<CreatedProject> {
        let farm_created = self.ensure_farm()?;
        let _lock = self.store.lock()?;
        let mut registry = self.store.load()?;
        let mut created = self.provision(&mut registry, request)?;
        created.farm_created = farm_created;
        self.commit(&registry, created)
    }

    /// Delete `request`'s project if it exists, then create it afresh, all
    /// under one lock. Returns the deletion outcome, if there was anything
    /// to delete, alongside the new project.
    pub fn recreate(
        &self,
        request: &CreateRequest,
        confirm: &mut ConfirmFn<'_>,
    ) -> Result<(Option<DeleteOutcome>, CreatedProject)> {
        let name = canonical_name(&request.name, request.kind)?;
        let farm_created = self.ensure_farm()?;
        let _lock = self.store.lock()?;
        let mut registry = self.store.load()?;

        let removed = match self.remove_from(&mut registry, &name, confirm) {
            Ok(outcome) => Some(outcome),
            Err(Error::NotFound(_)) => None,
            Err(e) => return Err(e),
        };
        if removed.is_some() {
            // The old directory is gone; persist that before anything else can fail.
            self.store.save(&registry)?;
        }

        let mut created = self.provision(&mut registry, request)?;
        created.farm_created = farm_created;
        Ok((removed, self.commit(&registry, created)?))
    }

    /// Allocate, create and materialize a project against `registry`,
    /// inserting its record on success. Does not persist or lock; callers
    /// hold the lock and save.
    pub fn provision(
        &self,
        registry: &mut Registry,
        request: &CreateRequest,
    ) -> Result<CreatedProject> {
        let name = canonical_name(&request.name, request.kind)?;
        let dir = self.workspace.project_dir(&name);

        let registered = registry.contains(&name);
        let on_disk = dir.exists();
        if registered || on_disk {
            if registered != on_disk {
                warn!(
                    project = %name,
                    registered, on_disk, "Registry and project directory disagree"
                );
            }
            return Err(Error::AlreadyExists {
                name,
                registered,
                on_disk,
            });
        }

        let bundle = allocate(
            registry,
            &self.settings,
            self.probe.as_ref(),
            &name,
            request.options.code_server,
        )?;
        let arch = match self.arch {
            Some(arch) => arch,
            None => Arch::detect()?,
        };

        if let Err(e) = fs::create_dir(&dir) {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                return Err(Error::AlreadyExists {
                    name,
                    registered: false,
                    on_disk: true,
                });
            }
            return Err(Error::materialization(&name, e));
        }

        let spec = ProjectSpec::new(
            &name,
            request.kind,
            request.options,
            bundle.clone(),
            arch,
            &self.settings,
        );
        if let Err(e) = self.materialize(&dir, &spec) {
            discard_dir(&dir);
            return Err(e);
        }

        let record = ProjectRecord::new(request.kind, request.options, &bundle);
        registry.insert(name.clone(), record.clone());
        info!(
            project = %name,
            webserver = bundle.webserver_port,
            flower = bundle.flower_port,
            redis_db = bundle.redis_db,
            subnet = %bundle.subnet,
            "Provisioned project"
        );

        Ok(CreatedProject {
            name,
            dir,
            bundle,
            record,
            farm_created: false,
        })
    }

    /// Delete one project by canonical name.
    ///
    /// `confirm` is asked only when a directory exists; declining aborts with
    /// [`Error::Aborted`] and changes nothing.
    pub fn delete(&self, name: &str, confirm: &mut ConfirmFn<'_>) -> Result<DeleteOutcome> {
        let _lock = self.store.lock()?;
        let mut registry = self.store.load()?;
        let outcome = self.remove_from(&mut registry, name, confirm)?;
        if outcome.removed_record {
            self.store.save(&registry)?;
        }
        Ok(outcome)
    }

    /// Remove a project's directory and its record from `registry`.
    pub fn remove_from(
        &self,
        registry: &mut Registry,
        name: &str,
        confirm: &mut ConfirmFn<'_>,
    ) -> Result<DeleteOutcome> {
        check_project_name(name)?;
        let dir = self.workspace.project_dir(name);
        let registered = registry.contains(name);
        let on_disk = dir.is_dir();

        match (registered, on_disk) {
            (false, false) => return Err(Error::NotFound(name.to_string())),
            (true, false) => warn!(
                project = name,
                "Directory {} is missing; removing the registry entry only",
                dir.display()
            ),
            (false, true) => warn!(
                project = name,
                "Directory {} is not registered; removing it anyway",
                dir.display()
            ),
            (true, true) => {}
        }

        if on_disk {
            if !confirm(name, &dir) {
                info!(project = name, "Deletion cancelled");
                return Err(Error::Aborted);
            }
            fs::remove_dir_all(&dir)?;
            info!(project = name, "Removed {}", dir.display());
        }

        let removed = registry.remove(name);
        if removed.is_some() {
            debug!(project = name, "Removed registry entry");
        }
        Ok(DeleteOutcome {
            name: name.to_string(),
            db_name: removed.as_ref().and_then(|r| r.db_name.clone()),
            removed_dir: on_disk,
            removed_record: removed.is_some(),
        })
    }

    /// Delete every registered project, then the farm and the registry.
    ///
    /// Failures and declined confirmations are collected per project and do
    /// not stop the batch.
    pub fn delete_all(&self, confirm: &mut ConfirmFn<'_>) -> Result<TeardownReport> {
        let mut report = TeardownReport::default();
        // Held through the farm removal; no create may land in between.
        let _lock = self.store.lock()?;
        let mut registry = self.store.load()?;
        for name in registry.names() {
            match self.remove_from(&mut registry, &name, confirm) {
                Ok(outcome) => report.deleted.push(outcome),
                Err(Error::Aborted) => report.skipped.push(name),
                Err(e) => {
                    warn!(project = %name, "Failed to delete project: {}", e);
                    report.failed.push((name, e));
                }
            }
        }
        if self.store.exists() {
            self.store.save(&registry)?;
        }

        report.farm_removed = self.farm().remove()?;
        info!(
            deleted = report.deleted.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Teardown finished"
        );
        Ok(report)
    }

    /// Directory of a project that is safe to start or stop.
    pub fn locate(&self, name: &str) -> Result<PathBuf> {
        check_project_name(name)?;
        let dir = self.workspace.project_dir(name);
        let registered = self.store.get(name)?.is_some();
        match (registered, dir.is_dir()) {
            (true, true) => Ok(dir),
            (false, false) => Err(Error::NotFound(name.to_string())),
            (true, false) => Err(Error::InconsistentState {
                name: name.to_string(),
                detail: format!("registered, but {} is missing", dir.display()),
            }),
            (false, true) => Err(Error::InconsistentState {
                name: name.to_string(),
                detail: format!("{} exists, but it is not registered", dir.display()),
            }),
        }
    }

    /// Every known project with its registry/disk health, ordered by name.
    pub fn overview(&self) -> Result<Vec<ProjectEntry>> {
        audit::scan(&self.workspace, &self.store.load()?)
    }

    /// Projects where the registry and the filesystem disagree.
    pub fn audit(&self) -> Result<Vec<ProjectEntry>> {
        Ok(self
            .overview()?
            .into_iter()
            .filter(|entry| entry.health != ProjectHealth::Ok)
            .collect())
    }

    fn ensure_farm(&self) -> Result<bool> {
        let farm = self.farm();
        if farm.state() == FarmState::Present {
            return Ok(false);
        }
        info!("No farm found; initialising one first");
        farm.ensure()?;
        Ok(true)
    }

    fn materialize(&self, dir: &Path, spec: &ProjectSpec) -> Result<()> {
        for sub in PROJECT_SUBDIRS {
            fs::create_dir(dir.join(sub)).map_err(|e| Error::materialization(&spec.name, e))?;
        }
        self.materializer.write_project(dir, spec)
    }

    /// Persist `registry` for a freshly provisioned project, removing the
    /// project directory if the save fails.
    fn commit(&self, registry: &Registry, created: CreatedProject) -> Result<CreatedProject> {
        if let Err(e) = self.store.save(registry) {
            discard_dir(&created.dir);
            return Err(e);
        }
        Ok(created)
    }
}

/// Reject names that would resolve outside the workspace or onto the farm.
fn check_project_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name == "." || name == ".." || name.contains(|c: char| c == '/' || c == '\\') {
        Some("name must be a single directory name")
    } else if name == FARM_DIR_NAME {
        Some("the farm is not a project")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(Error::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

fn discard_dir(dir: &Path) {
    if let Err(e) = fs::remove_dir_all(dir) {
        warn!("Failed to remove partial project {}: {}", dir.display(), e);
    } else {
        debug!("Rolled back {}", dir.display());
    }
}
