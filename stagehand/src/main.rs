mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use stagehand_core::Lifecycle;
use tracing::Level;

#[derive(Parser)]
#[command(name = "stagehand")]
#[command(about = "Lifecycle-task orchestration for monorepos")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Repository root.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(short, long, action)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run tasks registered for a lifecycle across the affected workspace
    /// set.
    Tasks {
        /// Lifecycle to run. `pre-` and `post-` lifecycles run
        /// automatically for non-prefixed lifecycles.
        #[arg(short = 'c', long, value_parser = parse_lifecycle)]
        lifecycle: Lifecycle,
        /// List found tasks without running anything.
        #[arg(long, action)]
        list: bool,
        /// Filepath globs to ignore when matching tasks to files.
        #[arg(long)]
        ignore: Vec<String>,
        /// Limit the requested workspaces by name instead of deriving them
        /// from changed files.
        #[arg(short, long)]
        workspaces: Vec<String>,
        /// Base revision for change detection.
        #[arg(long)]
        from_ref: Option<String>,
        /// End revision for change detection.
        #[arg(long)]
        through_ref: Option<String>,
        /// Pass `--dry-run` through to every task.
        #[arg(long, action)]
        dry_run: bool,
        /// Auxiliary task configuration files applied at the repository
        /// root.
        #[arg(long)]
        global_tasks: Vec<PathBuf>,
    },
    /// Print the workspaces and their dependency edges.
    Graph {
        #[arg(long, action)]
        json: bool,
    },
    /// Print the affected set for the given seed workspaces.
    Affected {
        workspaces: Vec<String>,
        #[arg(long, action)]
        json: bool,
    },
}

fn parse_lifecycle(s: &str) -> std::result::Result<Lifecycle, String> {
    Lifecycle::from_str(s).ok_or_else(|| {
        let expected: Vec<&str> = Lifecycle::ALL.iter().map(|l| l.as_str()).collect();
        format!("expected one of: {}", expected.join(", "))
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    // Logs go to stderr; stdout carries machine-readable output in list
    // and json modes.
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Tasks {
            lifecycle,
            list,
            ignore,
            workspaces,
            from_ref,
            through_ref,
            dry_run,
            global_tasks,
        } => commands::cmd_tasks(commands::TasksArgs {
            root: cli.root,
            lifecycle,
            list,
            ignore,
            workspaces,
            from_ref,
            through_ref,
            dry_run,
            global_tasks,
            verbosity: cli.verbose,
        })?,
        Commands::Graph { json } => commands::cmd_graph(cli.root, json)?,
        Commands::Affected { workspaces, json } => {
            commands::cmd_affected(cli.root, workspaces, json)?
        }
    }

    Ok(())
}
