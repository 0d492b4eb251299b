use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use stagehand_core::{
    ChangeSet, Lifecycle, ProcessRunner, ScheduleOptions, ScheduleOutcome, Scanner, SpecContext,
    TaskConfig, TaskOutcome, TaskScheduler, TaskSpec, WorkspaceGraph,
};

/// Runner double that records the full command line of everything it was
/// asked to execute and fails the commands it was told to fail.
#[derive(Default)]
struct RecordingRunner {
    executed: Mutex<Vec<String>>,
    fail: HashSet<String>,
}

impl RecordingRunner {
    fn failing(cmds: &[&str]) -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            fail: cmds.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn log(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
    async fn run(&self, spec: &TaskSpec) -> TaskOutcome {
        let line = if spec.args.is_empty() {
            spec.cmd.clone()
        } else {
            format!("{} {}", spec.cmd, spec.args.join(" "))
        };
        self.executed.lock().unwrap().push(line);

        if self.fail.contains(&spec.cmd) {
            TaskOutcome::failure(&spec.name, "exit status: 1")
        } else {
            TaskOutcome {
                name: spec.name.clone(),
                success: true,
                stdout: String::new(),
                stderr: String::new(),
            }
        }
    }

    async fn batch(&self, specs: &[TaskSpec]) -> Vec<TaskOutcome> {
        let mut outcomes = Vec::with_capacity(specs.len());
        for spec in specs {
            outcomes.push(self.run(spec).await);
        }
        outcomes
    }
}

fn write_workspace(root: &Path, location: &str, manifest: &str, tasks: Option<&str>) {
    let dir = root.join(location);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("stagehand.toml"), manifest).unwrap();
    if let Some(tasks) = tasks {
        fs::write(dir.join("tasks.toml"), tasks).unwrap();
    }
}

/// root <- @lib/ui <- @app/web, with a mix of bare and glob tasks under
/// the `commit` lifecycle.
fn fixture() -> (TempDir, WorkspaceGraph) {
    let dir = TempDir::new().unwrap();

    write_workspace(
        dir.path(),
        "",
        "name = \"root\"\nprivate = true\n",
        Some("[commit]\nsequential = [\"root-commit\"]\n"),
    );
    write_workspace(
        dir.path(),
        "libs/ui",
        "name = \"@lib/ui\"\n",
        Some(
            "[commit]\nparallel = [\"ui-commit\", { match = \"**/*.css\", cmd = \"stylecheck\" }]\n",
        ),
    );
    write_workspace(
        dir.path(),
        "apps/web",
        "name = \"@app/web\"\n\n[dependencies]\n\"@lib/ui\" = \"^1.0.0\"\n",
        Some("[commit]\nsequential = [\"webtest\"]\n"),
    );

    let graph = Scanner::new(dir.path()).graph().unwrap();
    (dir, graph)
}

fn options(lifecycle: Lifecycle, list: bool) -> ScheduleOptions {
    ScheduleOptions {
        lifecycle,
        list,
        ignore: Vec::new(),
        context: SpecContext {
            cli_name: "stagehand".to_string(),
            bin_path: PathBuf::from("/usr/local/bin/stagehand"),
            dry_run: false,
            verbosity: 0,
        },
    }
}

fn modified(paths: &[&str]) -> ChangeSet {
    ChangeSet {
        modified: paths.iter().map(|p| p.to_string()).collect(),
        ..ChangeSet::default()
    }
}

fn requested(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn no_changes_and_no_affected_short_circuits() {
    let (_dir, graph) = fixture();
    let runner = RecordingRunner::default();

    let scheduler = TaskScheduler::new(&graph, options(Lifecycle::Commit, false));
    let outcome = scheduler
        .schedule(&[], &ChangeSet::default(), &[], &runner)
        .await
        .unwrap();

    assert!(matches!(outcome, ScheduleOutcome::NoTasks));
    assert!(runner.log().is_empty());
}

#[tokio::test]
async fn list_mode_serializes_empty_on_short_circuit() {
    let (_dir, graph) = fixture();
    let runner = RecordingRunner::default();

    let scheduler = TaskScheduler::new(&graph, options(Lifecycle::Commit, true));
    let outcome = scheduler
        .schedule(&[], &ChangeSet::default(), &[], &runner)
        .await
        .unwrap();

    match outcome {
        ScheduleOutcome::Listed(specs) => {
            assert!(specs.is_empty());
            assert_eq!(serde_json::to_string(&specs).unwrap(), "[]");
        }
        other => panic!("expected empty listing, got {:?}", other),
    }
}

#[tokio::test]
async fn root_bare_tasks_run_even_when_root_is_not_affected() {
    let (_dir, graph) = fixture();
    let runner = RecordingRunner::default();

    // A changed root file, but no requested workspaces: affected is empty.
    let scheduler = TaskScheduler::new(&graph, options(Lifecycle::Commit, false));
    let outcome = scheduler
        .schedule(&[], &modified(&["README.md"]), &[], &runner)
        .await
        .unwrap();

    assert!(outcome.success());
    assert_eq!(runner.log(), vec!["root-commit"]);
}

#[tokio::test]
async fn non_root_bare_tasks_are_gated_on_the_affected_set() {
    let (_dir, graph) = fixture();
    let runner = RecordingRunner::default();

    let scheduler = TaskScheduler::new(&graph, options(Lifecycle::Commit, false));
    scheduler
        .schedule(&requested(&["@lib/ui"]), &ChangeSet::default(), &[], &runner)
        .await
        .unwrap();

    // Parallel lane first, then the sequential lane in collection order
    // (workspaces are name-sorted; stylecheck has no matching file).
    assert_eq!(runner.log(), vec!["ui-commit", "webtest", "root-commit"]);
}

#[tokio::test]
async fn glob_tasks_run_on_file_matches_independent_of_affected() {
    let (_dir, graph) = fixture();

    // Not affected, but a css file changed: the glob task runs; the bare
    // task on the same workspace does not.
    let runner = RecordingRunner::default();
    let scheduler = TaskScheduler::new(&graph, options(Lifecycle::Commit, false));
    scheduler
        .schedule(&[], &modified(&["libs/ui/theme/dark.css"]), &[], &runner)
        .await
        .unwrap();
    assert_eq!(runner.log(), vec!["stylecheck", "root-commit"]);

    // Affected, but no css change: the glob task stays out.
    let runner = RecordingRunner::default();
    let scheduler = TaskScheduler::new(&graph, options(Lifecycle::Commit, false));
    scheduler
        .schedule(&requested(&["@lib/ui"]), &ChangeSet::default(), &[], &runner)
        .await
        .unwrap();
    assert!(!runner.log().iter().any(|line| line == "stylecheck"));
}

#[tokio::test]
async fn ignored_files_are_removed_before_matching() {
    let (_dir, graph) = fixture();
    let runner = RecordingRunner::default();

    let mut opts = options(Lifecycle::Commit, false);
    opts.ignore = vec!["**/*.css".to_string()];
    let scheduler = TaskScheduler::new(&graph, opts);
    let outcome = scheduler
        .schedule(&[], &modified(&["libs/ui/theme/dark.css"]), &[], &runner)
        .await
        .unwrap();

    // The only change was ignored and nothing is affected.
    assert!(matches!(outcome, ScheduleOutcome::NoTasks));
    assert!(runner.log().is_empty());
}

#[tokio::test]
async fn prefixed_lifecycle_resolves_only_its_own_key() {
    let dir = TempDir::new().unwrap();
    write_workspace(
        dir.path(),
        "",
        "name = \"root\"\n",
        Some(
            "[pre-commit]\nsequential = [\"before\"]\n\n\
             [commit]\nsequential = [\"during\"]\n\n\
             [post-commit]\nsequential = [\"after\"]\n",
        ),
    );
    let graph = Scanner::new(dir.path()).graph().unwrap();
    let runner = RecordingRunner::default();

    let scheduler = TaskScheduler::new(&graph, options(Lifecycle::PreCommit, false));
    scheduler
        .schedule(&[], &modified(&["README.md"]), &[], &runner)
        .await
        .unwrap();

    assert_eq!(runner.log(), vec!["before"]);
}

#[tokio::test]
async fn bare_lifecycle_expands_to_pre_run_post() {
    let dir = TempDir::new().unwrap();
    write_workspace(
        dir.path(),
        "",
        "name = \"root\"\n",
        Some(
            "[pre-commit]\nsequential = [\"before\"]\n\n\
             [commit]\nsequential = [\"during\"]\n\n\
             [post-commit]\nsequential = [\"after\"]\n",
        ),
    );
    let graph = Scanner::new(dir.path()).graph().unwrap();
    let runner = RecordingRunner::default();

    let scheduler = TaskScheduler::new(&graph, options(Lifecycle::Commit, false));
    scheduler
        .schedule(&[], &modified(&["README.md"]), &[], &runner)
        .await
        .unwrap();

    assert_eq!(runner.log(), vec!["before", "during", "after"]);
}

#[tokio::test]
async fn list_mode_concatenates_the_six_lanes_in_order() {
    let dir = TempDir::new().unwrap();
    write_workspace(
        dir.path(),
        "",
        "name = \"root\"\n",
        Some(
            "[pre-build]\nparallel = [\"p-pre\"]\nsequential = [\"s-pre\"]\n\n\
             [build]\nparallel = [\"p-run\"]\nsequential = [\"s-run\"]\n\n\
             [post-build]\nparallel = [\"p-post\"]\nsequential = [\"s-post\"]\n",
        ),
    );
    let graph = Scanner::new(dir.path()).graph().unwrap();
    let runner = RecordingRunner::default();

    let scheduler = TaskScheduler::new(&graph, options(Lifecycle::Build, true));
    let outcome = scheduler
        .schedule(&[], &modified(&["README.md"]), &[], &runner)
        .await
        .unwrap();

    let ScheduleOutcome::Listed(specs) = outcome else {
        panic!("expected listing");
    };
    let cmds: Vec<&str> = specs.iter().map(|s| s.cmd.as_str()).collect();
    assert_eq!(
        cmds,
        vec!["p-pre", "s-pre", "p-run", "s-run", "p-post", "s-post"]
    );
    // List mode never executes.
    assert!(runner.log().is_empty());
}

#[tokio::test]
async fn failures_are_collected_without_aborting_the_lane() {
    let dir = TempDir::new().unwrap();
    write_workspace(
        dir.path(),
        "",
        "name = \"root\"\n",
        Some("[commit]\nparallel = [\"boom\", \"fine\"]\nsequential = [\"boom2\", \"fine2\"]\n"),
    );
    let graph = Scanner::new(dir.path()).graph().unwrap();
    let runner = RecordingRunner::failing(&["boom", "boom2"]);

    let scheduler = TaskScheduler::new(&graph, options(Lifecycle::Commit, false));
    let outcome = scheduler
        .schedule(&[], &modified(&["README.md"]), &[], &runner)
        .await
        .unwrap();

    // All four ran despite two failures.
    assert_eq!(runner.log(), vec!["boom", "fine", "boom2", "fine2"]);

    let ScheduleOutcome::Completed { outcomes } = outcome else {
        panic!("expected completion");
    };
    assert_eq!(outcomes.len(), 4);
    assert_eq!(outcomes.iter().filter(|o| !o.success).count(), 2);

    let aggregate = ScheduleOutcome::Completed { outcomes };
    assert!(!aggregate.success());
}

#[tokio::test]
async fn global_tasks_are_forced_and_never_glob_matched() {
    let (_dir, graph) = fixture();
    let runner = RecordingRunner::default();

    let global: TaskConfig = toml::from_str(
        "[commit]\nsequential = [{ match = \"**/*.nomatch\", cmd = \"global-check\" }]\n",
    )
    .unwrap();

    let scheduler = TaskScheduler::new(&graph, options(Lifecycle::Commit, false));
    scheduler
        .schedule(
            &[],
            &modified(&["README.md"]),
            std::slice::from_ref(&global),
            &runner,
        )
        .await
        .unwrap();

    // Globals first (despite the non-matching glob), then workspace tasks.
    assert_eq!(runner.log(), vec!["global-check", "root-commit"]);
}

#[tokio::test]
async fn listed_specs_carry_workspace_cwd_and_meta() {
    let (_dir, graph) = fixture();
    let runner = RecordingRunner::default();

    let scheduler = TaskScheduler::new(&graph, options(Lifecycle::Commit, true));
    let outcome = scheduler
        .schedule(&requested(&["@lib/ui"]), &ChangeSet::default(), &[], &runner)
        .await
        .unwrap();

    let ScheduleOutcome::Listed(specs) = outcome else {
        panic!("expected listing");
    };
    let web = specs.iter().find(|s| s.cmd == "webtest").unwrap();
    assert_eq!(web.cwd, "apps/web");
    assert_eq!(web.meta["name"], "@app/web");
    assert_eq!(web.meta["slug"], "app-web");
}
