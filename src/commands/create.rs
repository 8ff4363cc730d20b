use super::delete::drop_project_database;
use crate::output::UserOutput;
use std::path::Path;
use turbine::{CreateRequest, CreatedProject, ProjectKind, ProjectManager, ProjectOptions};

/// Flags of `create-project`.
pub struct CreateArgs {
    pub name: Option<String>,
    pub kind: Option<ProjectKind>,
    pub remote_logging: bool,
    pub vault: bool,
    pub code_server: bool,
    pub force: bool,
}

pub async fn run_create_project(
    manager: &ProjectManager,
    args: CreateArgs,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let request = build_request(args.name, args.kind, args.remote_logging, args.vault, args.code_server, out)?;

    let created = if args.force {
        let mut confirm = |name: &str, dir: &Path| {
            out.confirm(
                &format!("Project {} exists at {}. Delete it and recreate?", name, dir.display()),
                false,
            )
        };
        let (removed, created) = manager.recreate(&request, &mut confirm)?;
        if let Some(removed) = removed {
            out.status(&format!("Deleted previous project {}", removed.name));
            drop_project_database(manager, removed.db_name.as_deref(), out).await;
        }
        created
    } else {
        manager.create(&request)?
    };

    report(&created, out);
    Ok(())
}

/// Fill in anything not given on the command line, prompting when a
/// terminal is attached. Feature prompts only appear when the name was
/// prompted for too.
fn build_request(
    name: Option<String>,
    kind: Option<ProjectKind>,
    remote_logging: bool,
    vault: bool,
    code_server: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<CreateRequest> {
    let (name, prompted) = match name {
        Some(name) => (name, false),
        None => match out.ask("Project name:") {
            Some(name) => (name, true),
            None => anyhow::bail!("--name is required when not running interactively"),
        },
    };

    let kind = match kind {
        Some(kind) => kind,
        None if prompted => {
            let menu: Vec<String> = ProjectKind::ALL
                .iter()
                .enumerate()
                .map(|(i, kind)| format!("[{}] {}", i + 1, kind.description()))
                .collect();
            let answer = out
                .ask(&format!("Project kind {} (default 1):", menu.join(" ")))
                .unwrap_or_default();
            answer.parse()?
        }
        None => ProjectKind::Astro,
    };

    let options = if prompted {
        ProjectOptions {
            remote_logging: remote_logging || out.confirm("Enable remote logging?", false),
            vault: vault || out.confirm("Use Vault as secrets backend?", false),
            code_server: code_server || out.confirm("Add a code-server IDE?", false),
        }
    } else {
        ProjectOptions {
            remote_logging,
            vault,
            code_server,
        }
    };

    Ok(CreateRequest::new(name, kind, options))
}

fn report(created: &CreatedProject, out: &dyn UserOutput) {
    if created.farm_created {
        out.status("No farm was found, so one was created first.");
    }
    let bundle = &created.bundle;
    out.success(&format!("Project {} created in {}", created.name, created.dir.display()));
    out.status(&format!("  Webserver:   http://localhost:{}", bundle.webserver_port));
    out.status(&format!("  Flower:      http://localhost:{}", bundle.flower_port));
    if let Some(port) = bundle.code_port {
        out.status(&format!("  Code server: http://localhost:{}", port));
    }
    out.status(&format!("  Redis db:    {}", bundle.redis_db));
    out.status(&format!("  Subnet:      {}.0/24", bundle.subnet));
    out.status(&format!("  Database:    {}", bundle.database_name));
    out.blank();
    out.status(&format!("Start it with: turbine start-project {}", created.name));
}
