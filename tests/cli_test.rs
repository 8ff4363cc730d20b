//! CLI smoke tests
//!
//! Runs the `turbine` binary against temporary working directories and checks
//! exit codes, stdout and the files it leaves behind. Nothing here needs a
//! Docker daemon: database drops are best effort and only warn.

use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn turbine_binary() -> String {
    env!("CARGO_BIN_EXE_turbine").to_string()
}

/// Working directory with a settings file that keeps docker calls short.
fn create_workdir() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(
        dir.path().join("turbine.yaml"),
        "docker:\n  timeout_secs: 1\nprobe:\n  timeout_ms: 50\n",
    )
    .expect("Failed to write settings");
    dir
}

fn turbine(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(turbine_binary())
        .arg("--workdir")
        .arg(dir.path())
        .args(args)
        .env("TURBINE_NON_INTERACTIVE", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run turbine")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

// ============================================================================
// Help and completions
// ============================================================================

#[test]
fn test_help_lists_commands() {
    let output = Command::new(turbine_binary())
        .arg("--help")
        .output()
        .expect("Failed to run turbine");

    assert!(output.status.success());
    let text = stdout(&output);
    for command in [
        "init-farm",
        "create-project",
        "start-project",
        "stop-project",
        "delete-project",
        "delete-farm",
        "delete-all",
        "list-projects",
    ] {
        assert!(text.contains(command), "help is missing {}", command);
    }
}

#[test]
fn test_unknown_kind_is_rejected_by_parser() {
    let dir = create_workdir();
    let output = turbine(&dir, &["create-project", "--name", "x", "--kind", "spark"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("spark"));
    assert!(!dir.path().join(".cache").exists());
}

#[test]
fn test_completions_bash() {
    let output = Command::new(turbine_binary())
        .args(["completions", "bash"])
        .output()
        .expect("Failed to run turbine");
    assert!(output.status.success());
    assert!(stdout(&output).contains("turbine"));
}

#[test]
fn test_completions_ignore_workspace_settings() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("turbine.yaml"), "ports: [not, a, map]\n").unwrap();
    let output = Command::new(turbine_binary())
        .current_dir(dir.path())
        .args(["completions", "zsh"])
        .output()
        .expect("Failed to run turbine");
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("turbine"));
}

// ============================================================================
// Farm and registry
// ============================================================================

#[test]
fn test_list_projects_empty_workdir() {
    let dir = create_workdir();
    let output = turbine(&dir, &["list-projects", "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let rows: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(rows, serde_json::json!([]));
}

#[test]
fn test_init_farm_creates_scaffold_and_registry() {
    let dir = create_workdir();
    let output = turbine(&dir, &["init-farm"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let farm = dir.path().join("farm");
    assert!(farm.join("docker-compose.yaml").is_file());
    assert!(farm.join("start.sh").is_file());
    assert!(farm.join("backups-s3").is_dir());
    assert_eq!(
        fs::read_to_string(dir.path().join(".cache")).unwrap().trim(),
        "{}"
    );

    // Running it again refreshes files and leaves the registry alone.
    fs::write(dir.path().join(".cache"), "{\n  \"kept-oss-airflow\": {\"type\": \"oss\"}\n}\n").unwrap();
    let output = turbine(&dir, &["init-farm"]);
    assert!(output.status.success());
    assert!(fs::read_to_string(dir.path().join(".cache"))
        .unwrap()
        .contains("kept-oss-airflow"));
}

#[test]
fn test_invalid_settings_fail_before_anything_is_written() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("turbine.yaml"), "ports:\n  webserver: not-a-port\n").unwrap();
    let output = turbine(&dir, &["init-farm"]);
    assert!(!output.status.success());
    assert!(!dir.path().join("farm").exists());
}

// ============================================================================
// Projects
// ============================================================================

#[test]
fn test_create_list_delete_project() {
    let dir = create_workdir();

    let output = turbine(&dir, &["create-project", "--name", "Demo", "--kind", "oss"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let project = dir.path().join("demo-oss-airflow");
    assert!(project.join("Dockerfile").is_file());
    assert!(project.join("docker-compose.yaml").is_file());
    assert!(project.join("dags").is_dir());
    assert!(dir.path().join("farm").is_dir(), "farm is initialised on demand");

    let output = turbine(&dir, &["list-projects", "--json"]);
    let rows: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(rows[0]["name"], "demo-oss-airflow");
    assert_eq!(rows[0]["kind"], "oss");
    assert_eq!(rows[0]["status"], "ok");
    assert_eq!(rows[0]["redisdb"], 0);
    assert_eq!(rows[0]["db_name"], "demoossairflowdb");

    // A second create with the same name is refused.
    let output = turbine(&dir, &["create-project", "--name", "demo", "--kind", "oss"]);
    assert_eq!(output.status.code(), Some(3));

    let output = turbine(&dir, &["--yes", "delete-project", "demo-oss-airflow"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(!project.exists());
    let registry = fs::read_to_string(dir.path().join(".cache")).unwrap();
    assert!(!registry.contains("demo-oss-airflow"));
}

#[test]
fn test_create_without_name_fails_when_not_interactive() {
    let dir = create_workdir();
    let output = turbine(&dir, &["create-project"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("--name"));
}

#[test]
fn test_delete_unknown_project_exits_not_found() {
    let dir = create_workdir();
    let output = turbine(&dir, &["--yes", "delete-project", "ghost-astro-airflow"]);
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("ghost-astro-airflow"));
}

#[test]
fn test_delete_declined_without_yes() {
    let dir = create_workdir();
    let output = turbine(&dir, &["create-project", "--name", "keep", "--kind", "astro"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = turbine(&dir, &["delete-project", "keep-astro-airflow"]);
    assert_eq!(output.status.code(), Some(130));
    assert!(dir.path().join("keep-astro-airflow").is_dir());
}

#[test]
fn test_start_unregistered_directory_is_inconsistent() {
    let dir = create_workdir();
    fs::create_dir(dir.path().join("stray-oss-airflow")).unwrap();
    let output = turbine(&dir, &["start-project", "stray-oss-airflow"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("not registered"));
}

#[test]
fn test_delete_all_removes_everything() {
    let dir = create_workdir();
    for (name, kind) in [("a", "astro"), ("b", "oss_dev")] {
        let output = turbine(&dir, &["create-project", "--name", name, "--kind", kind]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
    }

    let output = turbine(&dir, &["--yes", "delete-all"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(!dir.path().join("farm").exists());
    assert!(!dir.path().join("a-astro-airflow").exists());
    assert!(!dir.path().join("b-oss_dev-airflow").exists());
    assert!(!dir.path().join(".cache").exists());
    assert!(dir.path().join("turbine.yaml").exists());
}
