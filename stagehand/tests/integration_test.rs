use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

fn write_workspace(root: &Path, location: &str, manifest: &str, tasks: Option<&str>) {
    let dir = root.join(location);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("stagehand.toml"), manifest).unwrap();
    if let Some(tasks) = tasks {
        fs::write(dir.join("tasks.toml"), tasks).unwrap();
    }
}

fn create_test_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_workspace(
        dir.path(),
        "",
        "name = \"root\"\nprivate = true\n",
        Some("[pre-commit]\nsequential = [\"echo root-check\"]\n"),
    );
    write_workspace(dir.path(), "libs/ui", "name = \"@acme/ui\"\n", None);
    write_workspace(
        dir.path(),
        "apps/web",
        "name = \"@acme/web\"\n\n[dependencies]\n\"@acme/ui\" = \"^1.0.0\"\n",
        Some("[pre-commit]\nparallel = [\"echo web-check\"]\n"),
    );

    let status = Command::new("git")
        .arg("init")
        .current_dir(dir.path())
        .status()
        .expect("failed to run git init");
    assert!(status.success());

    dir
}

fn get_stagehand_binary() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop();
    path.join("target").join("debug").join("stagehand")
}

#[test]
#[ignore]
fn test_graph_command() {
    let repo = create_test_repo();

    let output = Command::new(get_stagehand_binary())
        .arg("graph")
        .arg("--root")
        .arg(repo.path())
        .output()
        .expect("failed to execute stagehand graph");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("@acme/web"));
    assert!(stdout.contains("@acme/ui"));
    assert!(stdout.contains("root"));
}

#[test]
#[ignore]
fn test_graph_command_json() {
    let repo = create_test_repo();

    let output = Command::new(get_stagehand_binary())
        .arg("graph")
        .arg("--json")
        .arg("--root")
        .arg(repo.path())
        .output()
        .expect("failed to execute stagehand graph");

    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("graph output is not valid JSON");
    let nodes = parsed.as_array().expect("graph output is not an array");
    assert_eq!(nodes.len(), 3);
    assert!(nodes.iter().any(|n| n["name"] == "@acme/web"));
}

#[test]
#[ignore]
fn test_affected_command() {
    let repo = create_test_repo();

    let output = Command::new(get_stagehand_binary())
        .arg("affected")
        .arg("@acme/ui")
        .arg("--root")
        .arg(repo.path())
        .output()
        .expect("failed to execute stagehand affected");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("@acme/ui"));
    assert!(stdout.contains("@acme/web"));
}

#[test]
#[ignore]
fn test_tasks_list_command() {
    let repo = create_test_repo();

    let output = Command::new(get_stagehand_binary())
        .arg("tasks")
        .arg("-c")
        .arg("pre-commit")
        .arg("--list")
        .arg("--workspaces")
        .arg("@acme/web")
        .arg("--root")
        .arg(repo.path())
        .output()
        .expect("failed to execute stagehand tasks");

    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("task listing is not valid JSON");
    let specs = parsed.as_array().expect("task listing is not an array");
    // The root sequential check plus the affected web workspace's check.
    assert_eq!(specs.len(), 2);
}

#[test]
#[ignore]
fn test_tasks_rejects_unknown_lifecycle() {
    let repo = create_test_repo();

    let output = Command::new(get_stagehand_binary())
        .arg("tasks")
        .arg("-c")
        .arg("restart")
        .arg("--root")
        .arg(repo.path())
        .output()
        .expect("failed to execute stagehand tasks");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("expected one of"));
}

#[test]
#[ignore]
fn test_tasks_rejects_unknown_workspace() {
    let repo = create_test_repo();

    let output = Command::new(get_stagehand_binary())
        .arg("tasks")
        .arg("-c")
        .arg("build")
        .arg("--workspaces")
        .arg("@acme/nope")
        .arg("--root")
        .arg(repo.path())
        .output()
        .expect("failed to execute stagehand tasks");

    assert!(!output.status.success());
}
