use crate::output::UserOutput;
use std::path::Path;
use turbine::docker::DockerClient;
use turbine::{FarmState, ProjectManager, TeardownReport};

pub async fn run_delete_project(
    manager: &ProjectManager,
    name: &str,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let mut confirm = |name: &str, dir: &Path| {
        out.confirm(
            &format!("Are you sure you want to delete project {} ({})?", name, dir.display()),
            false,
        )
    };
    let outcome = manager.delete(name, &mut confirm)?;

    match (outcome.removed_dir, outcome.removed_record) {
        (true, true) => out.success(&format!("Project {} deleted", outcome.name)),
        (true, false) => out.success(&format!(
            "Removed unregistered directory for {}",
            outcome.name
        )),
        (false, true) => out.success(&format!(
            "Project {} had no directory; removed its registry entry",
            outcome.name
        )),
        (false, false) => {}
    }
    drop_project_database(manager, outcome.db_name.as_deref(), out).await;
    Ok(())
}

/// Delete the farm after asking about each project individually.
pub async fn run_delete_farm(manager: &ProjectManager, out: &dyn UserOutput) -> anyhow::Result<()> {
    if manager.farm().state() == FarmState::Absent && !manager.store().exists() {
        out.warning("No farm found; nothing to delete.");
        return Ok(());
    }
    if !out.confirm(
        "Are you sure you want to delete the farm? Projects you keep will no longer be tracked.",
        false,
    ) {
        return Err(turbine::Error::Aborted.into());
    }

    let mut confirm = |name: &str, _dir: &Path| out.confirm(&format!("Delete project {}?", name), false);
    let report = manager.delete_all(&mut confirm)?;
    summarize(manager, report, out).await
}

/// Delete every project and the farm after a single confirmation.
pub async fn run_delete_all(manager: &ProjectManager, out: &dyn UserOutput) -> anyhow::Result<()> {
    if !out.confirm(
        "Are you sure you want to delete all projects and the farm? This cannot be undone.",
        false,
    ) {
        return Err(turbine::Error::Aborted.into());
    }

    let report = manager.delete_all(&mut |_: &str, _: &Path| true)?;
    summarize(manager, report, out).await
}

async fn summarize(
    manager: &ProjectManager,
    report: TeardownReport,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    for outcome in &report.deleted {
        out.status(&format!("  deleted  {}", outcome.name));
        drop_project_database(manager, outcome.db_name.as_deref(), out).await;
    }
    for name in &report.skipped {
        out.status(&format!("  kept     {}", name));
    }
    for (name, error) in &report.failed {
        out.error(&format!("  failed   {}: {}", name, error));
    }
    if report.farm_removed {
        out.success("Farm and registry removed");
    }

    if !report.failed.is_empty() {
        anyhow::bail!(
            "{} project(s) could not be deleted; remove their directories by hand",
            report.failed.len()
        );
    }
    Ok(())
}

/// Drop a project's database on the farm Postgres. Failures only warn: the
/// farm may be stopped, and an orphaned database is harmless.
pub(super) async fn drop_project_database(
    manager: &ProjectManager,
    db_name: Option<&str>,
    out: &dyn UserOutput,
) {
    let Some(db_name) = db_name else {
        return;
    };
    let settings = manager.settings();
    let client = DockerClient::new(&settings.docker);
    match client.drop_database(&settings.network.name, db_name).await {
        Ok(()) => out.status(&format!("Database {} dropped", db_name)),
        Err(e) => {
            tracing::warn!(database = db_name, "Failed to drop database: {}", e);
            out.warning(&format!(
                "Could not drop database {} ({}). Drop it by hand once the farm is running.",
                db_name,
                if e.is_missing_binary() { "docker not found" } else { "farm unreachable" }
            ));
        }
    }
}
