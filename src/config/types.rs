use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level settings read from `turbine.yaml`.
///
/// Every field is optional in the file; a missing file yields
/// `Settings::default()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub ports: PortSettings,
    pub network: NetworkSettings,
    pub redis: RedisSettings,
    pub probe: ProbeSettings,
    pub docker: DockerSettings,
}

/// Base value of each host port namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortSettings {
    pub webserver: u16,
    pub flower: u16,
    pub code_server: u16,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            webserver: 8080,
            flower: 5555,
            code_server: 7000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkSettings {
    /// First two octets of the farm's /16 bridge subnet.
    pub subnet_prefix: String,
    /// Docker network shared by the farm and every project.
    pub name: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            subnet_prefix: "172.27".to_string(),
            name: "airflow-network".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedisSettings {
    /// `databases` setting of the farm's Redis; db indices must stay below it.
    pub max_databases: u32,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            max_databases: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeSettings {
    /// Connect timeout per candidate port, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self { timeout_ms: 200 }
    }
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockerSettings {
    /// Upper bound on any single docker invocation.
    pub timeout_secs: u64,
    pub postgres_image: String,
    pub postgres_user: String,
}

impl Default for DockerSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            postgres_image: "postgres:13".to_string(),
            postgres_user: "airflow".to_string(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let ports = [
            ("ports.webserver", self.ports.webserver),
            ("ports.flower", self.ports.flower),
            ("ports.code_server", self.ports.code_server),
        ];
        for (field, value) in ports {
            if value == 0 {
                return Err(Error::Config(format!("{} must be a non-zero port", field)));
            }
        }

        let octets: Vec<&str> = self.network.subnet_prefix.split('.').collect();
        if octets.len() != 2 || octets.iter().any(|o| o.parse::<u8>().is_err()) {
            return Err(Error::Config(format!(
                "network.subnet_prefix '{}' must be two dotted octets, e.g. 172.27",
                self.network.subnet_prefix
            )));
        }

        if self.network.name.trim().is_empty() {
            return Err(Error::Config("network.name cannot be empty".to_string()));
        }
        if self.redis.max_databases == 0 {
            return Err(Error::Config(
                "redis.max_databases must be at least 1".to_string(),
            ));
        }
        if self.probe.timeout_ms == 0 {
            return Err(Error::Config("probe.timeout_ms must be non-zero".to_string()));
        }
        if self.docker.timeout_secs == 0 {
            return Err(Error::Config(
                "docker.timeout_secs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
