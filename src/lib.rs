#![allow(unused_assignments)]

//! # Turbine
//!
//! Provisions and tears down local multi-container Airflow development
//! environments ("projects") that share one infrastructure stack (the
//! "farm": Postgres, Redis, Vault, an SMTP sink, OpenSearch and Marquez).
//!
//! ## Features
//!
//! - **Resource allocation**: every project gets its own webserver, flower
//!   and (optionally) code-server host ports, a Redis logical database, a
//!   subnet octet and a Postgres database name, lowest free value first
//! - **Project registry**: allocations persist in a `.cache` JSON file,
//!   rewritten atomically under an advisory lock
//! - **Lifecycle**: idempotent farm setup, create with rollback, delete that
//!   converges from any registry/disk disagreement
//!
//! ## Quick Start
//!
//! ```no_run
//! use turbine::{CreateRequest, ProjectKind, ProjectManager, ProjectOptions, Settings, Workspace};
//!
//! # fn example() -> Result<(), turbine::Error> {
//! let manager = ProjectManager::new(Workspace::new("."), Settings::default());
//! let created = manager.create(&CreateRequest::new(
//!     "sales",
//!     ProjectKind::Oss,
//!     ProjectOptions::default(),
//! ))?;
//! println!("webserver on port {}", created.bundle.webserver_port);
//! # Ok(())
//! # }
//! ```

pub mod allocator;
pub mod config;
pub mod docker;
pub mod error;
pub mod farm;
pub mod materialize;
pub mod project;
pub mod registry;

// Re-export commonly used types
pub use allocator::{HostProbe, PortProbe, ResourceBundle, StaticProbe};
pub use config::{Parser, Settings, Workspace};
pub use error::{Error, Result};
pub use farm::{FarmManager, FarmOutcome, FarmState};
pub use materialize::{Arch, Materializer, TemplateMaterializer};
pub use project::{
    canonical_name, CreateRequest, CreatedProject, DeleteOutcome, ProjectEntry, ProjectHealth,
    ProjectManager, TeardownReport,
};
pub use registry::{ProjectKind, ProjectOptions, ProjectRecord, Registry, RegistryStore};
