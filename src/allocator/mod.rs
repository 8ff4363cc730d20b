//! Resource allocation.
//!
//! Pure functions that pick the next free value in each namespace a project
//! needs: host ports (webserver, flower, code-server), a Redis logical
//! database and the third octet of its subnet. Inputs are used-sets taken
//! from the [`Registry`]; nothing here reads or writes files.
//!
//! Every namespace hands out the lowest value its policy allows, so a given
//! registry snapshot (and probe) always yields the same bundle.

mod database;
mod probe;

pub use database::{derive_database_name, unique_database_name};
pub use probe::{HostProbe, PortProbe, StaticProbe};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::registry::Registry;
use serde::Serialize;
use std::collections::BTreeSet;

/// Octet reserved for the farm gateway (`<prefix>.1`).
pub const GATEWAY_OCTET: u8 = 1;
pub const FIRST_PROJECT_OCTET: u8 = 2;
pub const LAST_PROJECT_OCTET: u8 = 254;

/// Everything allocated to one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceBundle {
    pub webserver_port: u16,
    pub flower_port: u16,
    pub code_port: Option<u16>,
    pub redis_db: u32,
    pub subnet_octet: u8,
    /// `<prefix>.<octet>`, e.g. `172.27.5`.
    pub subnet: String,
    pub database_name: String,
}

/// Next host port in a namespace.
///
/// Probing starts at `max(base, 1 + max(used))` and walks upward, skipping
/// values already recorded in `used` and ports the probe reports as bound.
pub fn next_port(base: u16, used: &BTreeSet<u16>, probe: &dyn PortProbe) -> Result<u16> {
    let after_used = used.last().map(|&max| u32::from(max) + 1).unwrap_or(0);
    let start = u32::from(base).max(after_used);

    for candidate in start..u32::from(u16::MAX) {
        // Range is bounded by u16::MAX, so the conversion cannot truncate.
        let port = candidate as u16;
        if used.contains(&port) {
            continue;
        }
        if probe.is_bound(port) {
            tracing::debug!(port, "skipping port bound by another process");
            continue;
        }
        return Ok(port);
    }

    Err(Error::exhausted(
        "host port",
        format!("no unbound port between {} and {}", start, u16::MAX),
    ))
}

/// Smallest Redis database index not in `used`.
///
/// The instance's `databases` ceiling is checked by [`allocate`].
pub fn next_redis_db(used: &BTreeSet<u32>) -> u32 {
    let mut candidate = 0;
    while used.contains(&candidate) {
        candidate += 1;
    }
    candidate
}

/// Smallest subnet octet in `[2, 254]` not in `used`.
///
/// Octet 1 is the farm gateway and is never handed out.
pub fn next_subnet_octet(used: &BTreeSet<u8>) -> Result<u8> {
    (FIRST_PROJECT_OCTET..=LAST_PROJECT_OCTET)
        .find(|octet| !used.contains(octet))
        .ok_or_else(|| {
            Error::exhausted(
                "subnet octet",
                format!(
                    "all {} project subnets are allocated",
                    LAST_PROJECT_OCTET - FIRST_PROJECT_OCTET + 1
                ),
            )
        })
}

/// Allocate a full bundle for `project_name` against a registry snapshot.
pub fn allocate(
    registry: &Registry,
    settings: &Settings,
    probe: &dyn PortProbe,
    project_name: &str,
    code_server: bool,
) -> Result<ResourceBundle> {
    let webserver_port = next_port(settings.ports.webserver, &registry.used_webserver_ports(), probe)?;
    let flower_port = next_port(settings.ports.flower, &registry.used_flower_ports(), probe)?;
    let code_port = if code_server {
        Some(next_port(settings.ports.code_server, &registry.used_code_ports(), probe)?)
    } else {
        None
    };

    let redis_db = next_redis_db(&registry.used_redis_dbs());
    if redis_db >= settings.redis.max_databases {
        return Err(Error::exhausted(
            "redis database",
            format!(
                "indices 0..{} are all allocated",
                settings.redis.max_databases
            ),
        ));
    }

    let subnet_octet = next_subnet_octet(&registry.used_subnet_octets())?;
    let subnet = format!("{}.{}", settings.network.subnet_prefix, subnet_octet);

    let database_name = unique_database_name(
        &derive_database_name(project_name),
        &registry.used_database_names(),
    );

    let bundle = ResourceBundle {
        webserver_port,
        flower_port,
        code_port,
        redis_db,
        subnet_octet,
        subnet,
        database_name,
    };
    tracing::debug!(project = project_name, ?bundle, "allocated resources");
    Ok(bundle)
}
