//! File materialization.
//!
//! Writes the concrete environment for the farm and for each project:
//! Dockerfiles, compose files and helper scripts. The lifecycle managers
//! create directories and hand a filled [`FarmSpec`] or [`ProjectSpec`] to a
//! [`Materializer`]; they never format file contents themselves.

mod arch;
mod templates;

pub use arch::Arch;

use crate::allocator::ResourceBundle;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::registry::{ProjectKind, ProjectOptions};
use regex::{Captures, Regex};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

fn placeholder_regex() -> &'static Regex {
    PLACEHOLDER_REGEX
        .get_or_init(|| Regex::new(r"\{\{([a-z_]+)\}\}").expect("static regex pattern is valid"))
}

/// Values for the shared farm scaffold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FarmSpec {
    pub network: String,
    pub subnet_prefix: String,
    pub redis_databases: u32,
    pub postgres_image: String,
    pub postgres_user: String,
}

impl FarmSpec {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            network: settings.network.name.clone(),
            subnet_prefix: settings.network.subnet_prefix.clone(),
            redis_databases: settings.redis.max_databases,
            postgres_image: settings.docker.postgres_image.clone(),
            postgres_user: settings.docker.postgres_user.clone(),
        }
    }
}

/// Everything needed to write one project's files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSpec {
    /// Canonical project name, also the directory and image name.
    pub name: String,
    pub kind: ProjectKind,
    pub options: ProjectOptions,
    pub bundle: ResourceBundle,
    pub arch: Arch,
    pub network: String,
    pub postgres_image: String,
    pub postgres_user: String,
}

impl ProjectSpec {
    pub fn new(
        name: impl Into<String>,
        kind: ProjectKind,
        options: ProjectOptions,
        bundle: ResourceBundle,
        arch: Arch,
        settings: &Settings,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            options,
            bundle,
            arch,
            network: settings.network.name.clone(),
            postgres_image: settings.docker.postgres_image.clone(),
            postgres_user: settings.docker.postgres_user.clone(),
        }
    }

    fn base_image(&self) -> &'static str {
        match self.kind {
            ProjectKind::Astro => "quay.io/astronomer/astro-runtime:9.1.0",
            ProjectKind::Oss => "apache/airflow:2.7.2-python3.11",
            ProjectKind::OssDev => "ghcr.io/apache/airflow/main/prod/python3.11:latest",
        }
    }
}

/// Writes skeleton files into directories the caller has already created.
///
/// Implementations must only write inside the directory they are given.
pub trait Materializer {
    fn write_farm(&self, farm_dir: &Path, spec: &FarmSpec) -> Result<()>;
    fn write_project(&self, project_dir: &Path, spec: &ProjectSpec) -> Result<()>;
}

/// Default materializer backed by the built-in templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateMaterializer;

impl TemplateMaterializer {
    pub fn new() -> Self {
        Self
    }
}

impl Materializer for TemplateMaterializer {
    fn write_farm(&self, farm_dir: &Path, spec: &FarmSpec) -> Result<()> {
        let values = BTreeMap::from([
            ("network", spec.network.clone()),
            ("subnet_prefix", spec.subnet_prefix.clone()),
            ("redis_databases", spec.redis_databases.to_string()),
            ("postgres_image", spec.postgres_image.clone()),
            ("postgres_user", spec.postgres_user.clone()),
        ]);
        let fail = |e: Error| Error::materialization("farm", e);

        let files = [
            ("docker-compose.yaml", templates::FARM_COMPOSE),
            ("vault.Dockerfile", templates::VAULT_DOCKERFILE),
            ("vault.json", templates::VAULT_JSON),
            ("smtp.Dockerfile", templates::SMTP_DOCKERFILE),
            ("marquez.dev.yaml", templates::MARQUEZ_CONFIG),
            ("postgresql.conf", templates::POSTGRES_CONF),
            ("redis.Dockerfile", templates::REDIS_DOCKERFILE),
        ];
        for (file, template) in files {
            write_file(&farm_dir.join(file), &render(template, &values).map_err(fail)?)
                .map_err(fail)?;
        }
        write_script(&farm_dir.join("start.sh"), &render(templates::FARM_START, &values).map_err(fail)?)
            .map_err(fail)?;
        write_script(&farm_dir.join("stop.sh"), &render(templates::FARM_STOP, &values).map_err(fail)?)
            .map_err(fail)?;

        tracing::debug!("Wrote farm scaffold to {}", farm_dir.display());
        Ok(())
    }

    fn write_project(&self, project_dir: &Path, spec: &ProjectSpec) -> Result<()> {
        let values = project_values(spec).map_err(|e| Error::materialization(&spec.name, e))?;
        let fail = |e: Error| Error::materialization(&spec.name, e);

        write_file(
            &project_dir.join("Dockerfile"),
            &render(templates::PROJECT_DOCKERFILE, &values).map_err(fail)?,
        )
        .map_err(fail)?;
        write_file(
            &project_dir.join("docker-compose.yaml"),
            &render(templates::PROJECT_COMPOSE, &values).map_err(fail)?,
        )
        .map_err(fail)?;
        write_file(&project_dir.join("requirements.txt"), templates::REQUIREMENTS).map_err(fail)?;
        write_script(
            &project_dir.join("start.sh"),
            &render(templates::PROJECT_START, &values).map_err(fail)?,
        )
        .map_err(fail)?;
        write_script(
            &project_dir.join("stop.sh"),
            &render(templates::PROJECT_STOP, &values).map_err(fail)?,
        )
        .map_err(fail)?;
        if spec.options.code_server {
            write_file(&project_dir.join("code.Dockerfile"), templates::CODE_SERVER_DOCKERFILE)
                .map_err(fail)?;
        }

        tracing::debug!(project = %spec.name, "Wrote project files to {}", project_dir.display());
        Ok(())
    }
}

fn project_values(spec: &ProjectSpec) -> Result<BTreeMap<&'static str, String>> {
    let bundle = &spec.bundle;
    let mut values = BTreeMap::from([
        ("project", spec.name.clone()),
        ("arch", spec.arch.to_string()),
        ("base_image", spec.base_image().to_string()),
        ("network", spec.network.clone()),
        ("subnet", bundle.subnet.clone()),
        ("webserver_port", bundle.webserver_port.to_string()),
        ("flower_port", bundle.flower_port.to_string()),
        ("redis_db", bundle.redis_db.to_string()),
        ("db_name", bundle.database_name.clone()),
        ("postgres_image", spec.postgres_image.clone()),
        ("postgres_user", spec.postgres_user.clone()),
        ("remote_logging", spec.options.remote_logging.to_string()),
    ]);

    if spec.options.vault {
        values.insert(
            "secrets_backend",
            "airflow.providers.hashicorp.secrets.vault.VaultBackend".to_string(),
        );
        values.insert(
            "secrets_backend_kwargs",
            r#"'{"url": "http://vault:8200", "connections_path": "connections", "variables_path": "variables"}'"#
                .to_string(),
        );
    } else {
        values.insert("secrets_backend", "''".to_string());
        values.insert("secrets_backend_kwargs", "''".to_string());
    }

    let code_service = match (spec.options.code_server, bundle.code_port) {
        (true, Some(port)) => {
            values.insert("code_port", port.to_string());
            render(templates::CODE_SERVER_SERVICE, &values)?
        }
        (true, None) => {
            return Err(Error::Config(
                "code-server is enabled but no code-server port was allocated".to_string(),
            ))
        }
        (false, _) => String::new(),
    };
    values.insert("code_server_service", code_service);
    Ok(values)
}

/// Substitute every `{{key}}` in `template`. Unknown keys are an error.
pub fn render(template: &str, values: &BTreeMap<&str, String>) -> Result<String> {
    let mut missing = BTreeSet::new();
    let rendered = placeholder_regex().replace_all(template, |caps: &Captures| {
        let key = &caps[1];
        match values.get(key) {
            Some(value) => value.clone(),
            None => {
                missing.insert(key.to_string());
                String::new()
            }
        }
    });

    if !missing.is_empty() {
        let missing: Vec<String> = missing.into_iter().collect();
        return Err(Error::Config(format!(
            "template placeholder(s) without a value: {}",
            missing.join(", ")
        )));
    }
    Ok(rendered.into_owned())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)?;
    Ok(())
}

/// Write a shell script and mark it executable.
fn write_script(path: &Path, contents: &str) -> Result<()> {
    write_file(path, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o775))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(code_port: Option<u16>) -> ResourceBundle {
        ResourceBundle {
            webserver_port: 8081,
            flower_port: 5556,
            code_port,
            redis_db: 1,
            subnet_octet: 3,
            subnet: "172.27.3".to_string(),
            database_name: "demoossairflowdb".to_string(),
        }
    }

    fn spec(options: ProjectOptions, code_port: Option<u16>) -> ProjectSpec {
        ProjectSpec::new(
            "demo-oss-airflow",
            ProjectKind::Oss,
            options,
            bundle(code_port),
            Arch::Arm64,
            &Settings::default(),
        )
    }

    #[test]
    fn test_render_substitutes_and_leaves_shell_vars() {
        let values = BTreeMap::from([("name", "demo".to_string())]);
        let out = render("hi {{name}} from ${HOME}", &values).unwrap();
        assert_eq!(out, "hi demo from ${HOME}");
    }

    #[test]
    fn test_render_reports_missing_keys() {
        let err = render("{{a}} {{b}}", &BTreeMap::new()).unwrap_err();
        assert!(err.to_string().contains("a, b"));
    }

    #[test]
    fn test_render_reports_each_missing_key_once() {
        let err = render("{{b}} {{a}} {{b}}", &BTreeMap::new()).unwrap_err();
        assert!(err.to_string().ends_with("without a value: a, b"), "{}", err);
    }

    #[test]
    fn test_write_project_files() {
        let dir = tempfile::tempdir().unwrap();
        TemplateMaterializer::new()
            .write_project(dir.path(), &spec(ProjectOptions::default(), None))
            .unwrap();

        let compose = fs::read_to_string(dir.path().join("docker-compose.yaml")).unwrap();
        assert!(compose.contains("\"8081:8080\""));
        assert!(compose.contains("\"5556:5555\""));
        assert!(compose.contains("ipv4_address: 172.27.3.2"));
        assert!(!compose.contains("code-server"));
        assert!(!compose.contains("{{"));

        let dockerfile = fs::read_to_string(dir.path().join("Dockerfile")).unwrap();
        assert!(dockerfile.starts_with("FROM --platform=linux/arm64 apache/airflow"));
        assert!(dockerfile.contains("redis://:@redis:6379/1"));
        assert!(dockerfile.contains("@postgres/demoossairflowdb"));

        assert!(dir.path().join("requirements.txt").exists());
        assert!(!dir.path().join("code.Dockerfile").exists());
    }

    #[test]
    fn test_write_project_with_code_server_and_vault() {
        let dir = tempfile::tempdir().unwrap();
        let options = ProjectOptions {
            remote_logging: true,
            vault: true,
            code_server: true,
        };
        TemplateMaterializer::new()
            .write_project(dir.path(), &spec(options, Some(7000)))
            .unwrap();

        let compose = fs::read_to_string(dir.path().join("docker-compose.yaml")).unwrap();
        assert!(compose.contains("\"7000:8443\""));
        assert!(dir.path().join("code.Dockerfile").exists());

        let dockerfile = fs::read_to_string(dir.path().join("Dockerfile")).unwrap();
        assert!(dockerfile.contains("VaultBackend"));
        assert!(dockerfile.contains("AIRFLOW__LOGGING__REMOTE_LOGGING=true"));
    }

    #[test]
    fn test_code_server_without_port_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let options = ProjectOptions {
            code_server: true,
            ..ProjectOptions::default()
        };
        let err = TemplateMaterializer::new()
            .write_project(dir.path(), &spec(options, None))
            .unwrap_err();
        assert!(matches!(err, Error::Materialization { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_farm_scripts_are_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        TemplateMaterializer::new()
            .write_farm(dir.path(), &FarmSpec::from_settings(&Settings::default()))
            .unwrap();

        let mode = fs::metadata(dir.path().join("start.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
        let redis = fs::read_to_string(dir.path().join("redis.Dockerfile")).unwrap();
        assert!(redis.contains("databases 1000"));
        let compose = fs::read_to_string(dir.path().join("docker-compose.yaml")).unwrap();
        assert!(compose.contains("name: airflow-network"));
        assert!(compose.contains("subnet: 172.27.0.0/16"));
    }
}
