use crate::allocator::ResourceBundle;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Airflow flavour a project is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectKind {
    /// Astronomer runtime image.
    Astro,
    /// Released Apache Airflow image.
    Oss,
    /// Apache Airflow built from the main branch.
    OssDev,
}

impl ProjectKind {
    pub const ALL: [ProjectKind; 3] = [ProjectKind::Astro, ProjectKind::Oss, ProjectKind::OssDev];

    /// Tag used in canonical project names and in the registry file.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectKind::Astro => "astro",
            ProjectKind::Oss => "oss",
            ProjectKind::OssDev => "oss_dev",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ProjectKind::Astro => "Astro",
            ProjectKind::Oss => "OSS",
            ProjectKind::OssDev => "OSS main branch",
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "astro" | "1" | "" => Ok(ProjectKind::Astro),
            "oss" | "2" => Ok(ProjectKind::Oss),
            "oss_dev" | "oss-dev" | "3" => Ok(ProjectKind::OssDev),
            other => Err(Error::Config(format!(
                "Unknown project kind '{}' (expected astro, oss or oss_dev)",
                other
            ))),
        }
    }
}

/// Feature switches chosen at creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectOptions {
    pub remote_logging: bool,
    pub vault: bool,
    pub code_server: bool,
}

/// One registry entry.
///
/// Resource fields are optional so records written by older versions, which
/// did not track every namespace, still load. Such records simply do not
/// contribute to the corresponding used-set. Keys this version does not know
/// about are carried in `extra` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(alias = "type")]
    pub kind: ProjectKind,
    #[serde(default)]
    pub remote_logging: bool,
    #[serde(default)]
    pub vault: bool,
    #[serde(default)]
    pub code_server: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redisdb: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webserver: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flower: Option<u16>,
    /// Code-server (IDE) host port, only when code-server is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    /// Subnet fragment such as `172.27.5`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProjectRecord {
    pub fn new(kind: ProjectKind, options: ProjectOptions, bundle: &ResourceBundle) -> Self {
        Self {
            kind,
            remote_logging: options.remote_logging,
            vault: options.vault,
            code_server: options.code_server,
            redisdb: Some(bundle.redis_db),
            webserver: Some(bundle.webserver_port),
            flower: Some(bundle.flower_port),
            code: bundle.code_port,
            network: Some(bundle.subnet.clone()),
            db_name: Some(bundle.database_name.clone()),
            created_at: Some(Utc::now()),
            extra: serde_json::Map::new(),
        }
    }

    pub fn options(&self) -> ProjectOptions {
        ProjectOptions {
            remote_logging: self.remote_logging,
            vault: self.vault,
            code_server: self.code_server,
        }
    }

    /// Third octet of `network`, if present and well-formed.
    pub fn subnet_octet(&self) -> Option<u8> {
        self.network
            .as_deref()
            .and_then(|net| net.rsplit('.').next())
            .and_then(|octet| octet.trim().parse::<u8>().ok())
    }
}
