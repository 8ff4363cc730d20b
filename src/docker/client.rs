//! Centralized Docker CLI client.
//!
//! All docker interactions go through `DockerClient`, which provides
//! consistent timeout handling, error mapping to [`DockerError`], and a single
//! point where `Command::new("docker")` is constructed.

use super::DockerError;
use crate::config::DockerSettings;
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

/// Database the farm's Postgres is created with; project databases are
/// dropped while connected to it.
const MAINTENANCE_DATABASE: &str = "airflow";

/// Host name of the farm's Postgres service on the shared network.
const POSTGRES_HOST: &str = "postgres";

/// Thin async wrapper over the `docker` binary.
#[derive(Debug, Clone)]
pub struct DockerClient {
    timeout: Duration,
    postgres_image: String,
    postgres_user: String,
}

impl DockerClient {
    pub fn new(settings: &DockerSettings) -> Self {
        Self {
            timeout: Duration::from_secs(settings.timeout_secs),
            postgres_image: settings.postgres_image.clone(),
            postgres_user: settings.postgres_user.clone(),
        }
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    /// Run a docker command with a timeout, returning raw Output.
    async fn run(&self, args: &[&str], cwd: Option<&Path>) -> Result<Output, DockerError> {
        let mut cmd = tokio::process::Command::new("docker");
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        let cmd_str = format!("docker {}", args.join(" "));
        tracing::debug!(command = %cmd_str, cwd = ?cwd, "running docker");

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(DockerError::exec_failed(cmd_str, e)),
            Err(_) => Err(DockerError::timeout(cmd_str, self.timeout)),
        }
    }

    /// Run a docker command, returning Output only if exit 0.
    async fn run_success(&self, args: &[&str], cwd: Option<&Path>) -> Result<Output, DockerError> {
        let output = self.run(args, cwd).await?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(DockerError::failed(
                format!("docker {}", args.join(" ")),
                &output,
            ))
        }
    }

    // ========================================================================
    // Compose lifecycle
    // ========================================================================

    /// `docker compose up -d` inside a project or farm directory.
    pub async fn compose_up(&self, dir: &Path) -> Result<(), DockerError> {
        self.run_success(&["compose", "up", "-d"], Some(dir)).await?;
        Ok(())
    }

    /// `docker compose down` inside a project or farm directory.
    pub async fn compose_down(&self, dir: &Path) -> Result<(), DockerError> {
        self.run_success(&["compose", "down"], Some(dir)).await?;
        Ok(())
    }

    // ========================================================================
    // Farm database
    // ========================================================================

    /// Drop a project's database on the farm Postgres.
    ///
    /// Runs a throwaway `psql` container attached to the farm network.
    pub async fn drop_database(&self, network: &str, db_name: &str) -> Result<(), DockerError> {
        let statement = drop_database_statement(db_name);
        // The farm creates its superuser with the password equal to the name.
        let password = format!("PGPASSWORD={}", self.postgres_user);
        self.run_success(
            &[
                "run",
                "--rm",
                "--network",
                network,
                "-e",
                &password,
                &self.postgres_image,
                "psql",
                "-h",
                POSTGRES_HOST,
                "-U",
                &self.postgres_user,
                "-d",
                MAINTENANCE_DATABASE,
                "-c",
                &statement,
            ],
            None,
        )
        .await?;
        Ok(())
    }

    /// Whether `docker info` answers within `timeout`.
    pub async fn daemon_healthy(&self, timeout: Duration) -> bool {
        let probe = tokio::process::Command::new("docker")
            .args(["info", "--format", "{{.ServerVersion}}"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();
        matches!(
            tokio::time::timeout(timeout, probe).await,
            Ok(Ok(status)) if status.success()
        )
    }
}

/// Quote the identifier so the statement stays a single statement even if a
/// hand-edited registry carries an unexpected name.
fn drop_database_statement(db_name: &str) -> String {
    format!(
        "DROP DATABASE IF EXISTS \"{}\";",
        db_name.replace('"', "\"\"")
    )
}
