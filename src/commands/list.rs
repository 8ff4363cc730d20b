use crate::output::UserOutput;
use serde_json::json;
use turbine::{ProjectHealth, ProjectManager};

pub fn run_list_projects(manager: &ProjectManager, json: bool, out: &dyn UserOutput) -> anyhow::Result<()> {
    let entries = manager.overview()?;

    if json {
        let rows: Vec<serde_json::Value> = entries
            .iter()
            .map(|entry| {
                let record = entry.record.as_ref();
                json!({
                    "name": entry.name,
                    "status": entry.health.as_str(),
                    "kind": record.map(|r| r.kind.as_str()),
                    "webserver": record.and_then(|r| r.webserver),
                    "flower": record.and_then(|r| r.flower),
                    "code": record.and_then(|r| r.code),
                    "redisdb": record.and_then(|r| r.redisdb),
                    "network": record.and_then(|r| r.network.as_deref()),
                    "db_name": record.and_then(|r| r.db_name.as_deref()),
                })
            })
            .collect();
        out.data(&serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if entries.is_empty() {
        out.status("No projects. Create one with: turbine create-project");
        return Ok(());
    }

    out.status(&format!(
        "  {:<32} {:<8} {:>9} {:>6} {:>6} {:>5} {:<12} {}",
        "NAME", "KIND", "WEBSERVER", "FLOWER", "CODE", "REDIS", "SUBNET", "STATUS"
    ));
    out.status(&format!("{:-<100}", ""));
    for entry in &entries {
        let icon = match entry.health {
            ProjectHealth::Ok => "+",
            ProjectHealth::MissingDirectory | ProjectHealth::Unregistered => "x",
        };
        let field = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
        let record = entry.record.as_ref();
        out.status(&format!(
            "{} {:<32} {:<8} {:>9} {:>6} {:>6} {:>5} {:<12} {}",
            icon,
            entry.name,
            field(record.map(|r| r.kind.to_string())),
            field(record.and_then(|r| r.webserver).map(|p| p.to_string())),
            field(record.and_then(|r| r.flower).map(|p| p.to_string())),
            field(record.and_then(|r| r.code).map(|p| p.to_string())),
            field(record.and_then(|r| r.redisdb).map(|d| d.to_string())),
            field(record.and_then(|r| r.network.clone())),
            entry.health.as_str(),
        ));
    }

    let problems = entries
        .iter()
        .filter(|entry| entry.health != ProjectHealth::Ok)
        .count();
    if problems > 0 {
        out.blank();
        out.warning(&format!(
            "{} project(s) disagree with the filesystem; `turbine delete-project <name>` reconciles them",
            problems
        ));
    }
    Ok(())
}
