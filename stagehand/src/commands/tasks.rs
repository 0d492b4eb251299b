//! The `tasks` command: lifecycle scheduling and execution.

use std::path::PathBuf;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use stagehand_core::{
    ChangeProvider, GitChanges, Lifecycle, ScheduleOptions, ScheduleOutcome, Scanner,
    SpecContext, SubprocessRunner, TaskConfig, TaskScheduler,
};

pub struct TasksArgs {
    pub root: PathBuf,
    pub lifecycle: Lifecycle,
    pub list: bool,
    pub ignore: Vec<String>,
    pub workspaces: Vec<String>,
    pub from_ref: Option<String>,
    pub through_ref: Option<String>,
    pub dry_run: bool,
    pub global_tasks: Vec<PathBuf>,
    pub verbosity: u8,
}

pub fn cmd_tasks(args: TasksArgs) -> Result<()> {
    let root = args
        .root
        .canonicalize()
        .with_context(|| format!("invalid repository root {}", args.root.display()))?;

    let graph = Scanner::new(&root).graph()?;

    let provider = GitChanges::open(&root)?;
    let changes = provider.modified_files(args.from_ref.as_deref(), args.through_ref.as_deref())?;

    // Requested workspaces: the named ones, or the owners of every changed
    // file when none are named.
    let requested: Vec<String> = if args.workspaces.is_empty() {
        graph.workspaces_for_files(changes.all()).into_iter().collect()
    } else {
        args.workspaces
            .iter()
            .map(|name| graph.require(name).map(|ws| ws.name().to_string()))
            .collect::<stagehand_core::Result<_>>()?
    };

    let global: Vec<TaskConfig> = args
        .global_tasks
        .iter()
        .map(|path| {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading global tasks from {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("parsing global tasks from {}", path.display()))
        })
        .collect::<Result<_>>()?;

    let context = SpecContext {
        cli_name: "stagehand".to_string(),
        bin_path: std::env::current_exe()?,
        dry_run: args.dry_run,
        verbosity: args.verbosity,
    };
    let options = ScheduleOptions {
        lifecycle: args.lifecycle,
        list: args.list,
        ignore: args.ignore,
        context,
    };

    let scheduler = TaskScheduler::new(&graph, options);
    let runner = SubprocessRunner::new(&root);

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(scheduler.schedule(&requested, &changes, &global, &runner))?;

    match outcome {
        ScheduleOutcome::Listed(specs) => {
            println!("{}", serde_json::to_string(&specs)?);
        }
        ScheduleOutcome::NoTasks => {}
        ScheduleOutcome::Completed { outcomes } => {
            let mut failed = 0usize;
            for result in &outcomes {
                if result.success {
                    println!("  {} {}", "OK".green(), result.name);
                } else {
                    failed += 1;
                    println!("  {} {}", "FAILED".red().bold(), result.name);
                    let stderr = result.stderr.trim();
                    if !stderr.is_empty() {
                        for line in stderr.lines() {
                            println!("    {}", line.bright_black());
                        }
                    }
                }
            }
            if failed > 0 {
                eprintln!(
                    "{}",
                    format!("{} of {} tasks failed", failed, outcomes.len()).red()
                );
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
