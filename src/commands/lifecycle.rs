use crate::output::UserOutput;
use std::time::Duration;
use turbine::docker::DockerClient;
use turbine::{FarmState, ProjectManager};

const DAEMON_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run_start_project(
    manager: &ProjectManager,
    name: &str,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let dir = manager.locate(name)?;
    let client = docker_client(manager).await?;

    // Projects attach to the farm network, so the farm has to be up first.
    if manager.farm().state() == FarmState::Present {
        out.status("Starting farm...");
        client
            .compose_up(&manager.workspace().farm_dir())
            .await
            .map_err(turbine::Error::from)?;
    }

    out.status(&format!("Starting {}...", name));
    client.compose_up(&dir).await.map_err(turbine::Error::from)?;
    out.success(&format!("Project {} is running", name));

    if let Some(record) = manager.store().get(name)? {
        if let Some(port) = record.webserver {
            out.status(&format!("  Webserver:   http://localhost:{}", port));
        }
        if let Some(port) = record.flower {
            out.status(&format!("  Flower:      http://localhost:{}", port));
        }
        if let Some(port) = record.code {
            out.status(&format!("  Code server: http://localhost:{}", port));
        }
    }
    Ok(())
}

pub async fn run_stop_project(
    manager: &ProjectManager,
    name: &str,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let dir = manager.locate(name)?;
    let client = docker_client(manager).await?;

    out.status(&format!("Stopping {}...", name));
    client.compose_down(&dir).await.map_err(turbine::Error::from)?;
    out.success(&format!("Project {} has been stopped", name));
    Ok(())
}

async fn docker_client(manager: &ProjectManager) -> anyhow::Result<DockerClient> {
    let client = DockerClient::new(&manager.settings().docker);
    if !client.daemon_healthy(DAEMON_CHECK_TIMEOUT).await {
        anyhow::bail!("Docker daemon is not reachable. Start Docker and try again.");
    }
    Ok(client)
}
