//! Project registry.
//!
//! [`Registry`] is the in-memory mapping from canonical project name to
//! [`ProjectRecord`]; [`RegistryStore`] persists it to the `.cache` file in
//! the working directory. The registry is the only source of the used-sets
//! the allocator works from.

mod record;
mod store;

pub use record::{ProjectKind, ProjectOptions, ProjectRecord};
pub use store::{RegistryLock, RegistryStore};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Mapping from project name to its record.
///
/// Backed by a `BTreeMap` so the persisted file has a stable key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    projects: BTreeMap<String, ProjectRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Returns the previous record, if any.
    pub fn insert(&mut self, name: impl Into<String>, record: ProjectRecord) -> Option<ProjectRecord> {
        self.projects.insert(name.into(), record)
    }

    /// Remove a record. Absent names are not an error.
    pub fn remove(&mut self, name: &str) -> Option<ProjectRecord> {
        self.projects.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&ProjectRecord> {
        self.projects.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.projects.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProjectRecord)> {
        self.projects.iter().map(|(name, record)| (name.as_str(), record))
    }

    /// Owned snapshot of every entry, ordered by name.
    pub fn list(&self) -> Vec<(String, ProjectRecord)> {
        self.projects
            .iter()
            .map(|(name, record)| (name.clone(), record.clone()))
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.projects.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn used_webserver_ports(&self) -> BTreeSet<u16> {
        self.projects.values().filter_map(|r| r.webserver).collect()
    }

    pub fn used_flower_ports(&self) -> BTreeSet<u16> {
        self.projects.values().filter_map(|r| r.flower).collect()
    }

    pub fn used_code_ports(&self) -> BTreeSet<u16> {
        self.projects.values().filter_map(|r| r.code).collect()
    }

    pub fn used_redis_dbs(&self) -> BTreeSet<u32> {
        self.projects.values().filter_map(|r| r.redisdb).collect()
    }

    pub fn used_subnet_octets(&self) -> BTreeSet<u8> {
        self.projects
            .values()
            .filter_map(ProjectRecord::subnet_octet)
            .collect()
    }

    pub fn used_database_names(&self) -> BTreeSet<&str> {
        self.projects
            .values()
            .filter_map(|r| r.db_name.as_deref())
            .collect()
    }
}
