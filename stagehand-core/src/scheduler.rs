//! Lifecycle expansion, task collection, and lane execution.

use crate::changes::ChangeSet;
use crate::error::Result;
use crate::graph::WorkspaceGraph;
use crate::manifest::Workspace;
use crate::matcher::should_run;
use crate::runner::{ProcessRunner, TaskOutcome};
use crate::spec::{build_spec, SpecContext, TaskSpec};
use crate::tasks::{Lifecycle, TaskConfig, TaskEntry, Tasks};

/// Caller-facing knobs for one scheduling invocation.
#[derive(Debug, Clone)]
pub struct ScheduleOptions {
    pub lifecycle: Lifecycle,
    /// Collect and return specs without executing anything.
    pub list: bool,
    /// Changed files matching any of these globs are removed before
    /// matching.
    pub ignore: Vec<String>,
    pub context: SpecContext,
}

#[derive(Debug, Default)]
struct Lanes {
    parallel: Vec<TaskSpec>,
    sequential: Vec<TaskSpec>,
}

impl Lanes {
    fn is_empty(&self) -> bool {
        self.parallel.is_empty() && self.sequential.is_empty()
    }
}

#[derive(Debug, Default)]
struct PhaseSet {
    pre: Lanes,
    run: Lanes,
    post: Lanes,
}

impl PhaseSet {
    fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.run.is_empty() && self.post.is_empty()
    }

    /// The six lanes in execution order: parallel-pre, sequential-pre,
    /// parallel-run, sequential-run, parallel-post, sequential-post.
    fn into_ordered(self) -> Vec<TaskSpec> {
        let mut all = Vec::new();
        for lanes in [self.pre, self.run, self.post] {
            all.extend(lanes.parallel);
            all.extend(lanes.sequential);
        }
        all
    }
}

/// Result of one scheduling invocation.
#[derive(Debug)]
pub enum ScheduleOutcome {
    /// Nothing to do: no changed files and no affected workspaces, or no
    /// declared task matched.
    NoTasks,
    /// List mode: the ordered specs that would have run.
    Listed(Vec<TaskSpec>),
    /// Execution mode: one outcome per attempted task, across all lanes.
    Completed { outcomes: Vec<TaskOutcome> },
}

impl ScheduleOutcome {
    /// False iff any executed task failed. Every collected task was still
    /// attempted; aggregation happens only after all lanes finish.
    pub fn success(&self) -> bool {
        match self {
            ScheduleOutcome::NoTasks | ScheduleOutcome::Listed(_) => true,
            ScheduleOutcome::Completed { outcomes } => outcomes.iter().all(|o| o.success),
        }
    }
}

/// Expands a requested lifecycle into phases, collects matched tasks into
/// parallel and sequential lanes, and drives execution.
///
/// The graph, change set, and resolved task configurations are read-only
/// for the duration of an invocation.
pub struct TaskScheduler<'a> {
    graph: &'a WorkspaceGraph,
    options: ScheduleOptions,
}

impl<'a> TaskScheduler<'a> {
    pub fn new(graph: &'a WorkspaceGraph, options: ScheduleOptions) -> Self {
        Self { graph, options }
    }

    /// Runs the collection pipeline and, unless in list mode, executes the
    /// collected lanes via `runner`.
    ///
    /// `requested` seeds the affected set; `global_tasks` are auxiliary
    /// root-level task configurations that are always forced and never
    /// glob-matched.
    pub async fn schedule<R: ProcessRunner>(
        &self,
        requested: &[String],
        changes: &ChangeSet,
        global_tasks: &[TaskConfig],
        runner: &R,
    ) -> Result<ScheduleOutcome> {
        let affected = self.graph.affected(requested.iter().map(String::as_str));
        let files = changes.without_ignored(&self.options.ignore);

        if files.is_empty() && affected.is_empty() {
            tracing::warn!("no tasks to run");
            return Ok(if self.options.list {
                ScheduleOutcome::Listed(Vec::new())
            } else {
                ScheduleOutcome::NoTasks
            });
        }

        let affected_names: Vec<String> = affected.iter().cloned().collect();
        let mut phases = PhaseSet::default();

        // Global task sets behave as bare strings declared on the root:
        // always forced, never subject to file-glob matching.
        for config in global_tasks {
            self.collect(
                &mut phases,
                |key| Ok(config.get(key).cloned().unwrap_or_default()),
                self.graph.root(),
                &|_| true,
                None,
                &affected_names,
            )?;
        }

        // Every workspace is visited; the affected set only feeds the
        // force predicate.
        for workspace in self.graph.workspaces() {
            tracing::debug!("looking for tasks in {}", workspace.name());
            let in_affected = affected.contains(workspace.name());
            let force = |task: &TaskEntry| (task.is_bare() && workspace.is_root()) || in_affected;
            self.collect(
                &mut phases,
                |key| workspace.tasks_for(key),
                workspace,
                &force,
                Some(&files),
                &affected_names,
            )?;
        }

        if self.options.list {
            return Ok(ScheduleOutcome::Listed(phases.into_ordered()));
        }

        if phases.is_empty() {
            tracing::warn!("no tasks to run");
            return Ok(ScheduleOutcome::NoTasks);
        }

        // Fixed lane order. Each lane is attempted in full; failures are
        // collected as outcomes and aggregated only at the end.
        let mut outcomes = Vec::new();
        for lanes in [phases.pre, phases.run, phases.post] {
            if !lanes.parallel.is_empty() {
                outcomes.extend(runner.batch(&lanes.parallel).await);
            }
            for spec in &lanes.sequential {
                outcomes.push(runner.run(spec).await);
            }
        }

        Ok(ScheduleOutcome::Completed { outcomes })
    }

    /// Resolves the applicable phases for the requested lifecycle and adds
    /// matched tasks to their lanes. `files` of `None` disables glob
    /// matching (global task sets).
    fn collect<F>(
        &self,
        phases: &mut PhaseSet,
        mut resolve: F,
        workspace: &Workspace,
        force: &dyn Fn(&TaskEntry) -> bool,
        files: Option<&[String]>,
        affected_names: &[String],
    ) -> Result<()>
    where
        F: FnMut(&str) -> Result<Tasks>,
    {
        let lifecycle = self.options.lifecycle;

        if let Some(key) = lifecycle.pre_key() {
            let tasks = resolve(key)?;
            self.add_tasks(&mut phases.pre, &tasks, workspace, force, files, affected_names);
        }
        if let Some(key) = lifecycle.run_key() {
            let tasks = resolve(key)?;
            self.add_tasks(&mut phases.run, &tasks, workspace, force, files, affected_names);
        }
        if let Some(key) = lifecycle.post_key() {
            let tasks = resolve(key)?;
            self.add_tasks(&mut phases.post, &tasks, workspace, force, files, affected_names);
        }

        Ok(())
    }

    fn add_tasks(
        &self,
        lanes: &mut Lanes,
        tasks: &Tasks,
        workspace: &Workspace,
        force: &dyn Fn(&TaskEntry) -> bool,
        files: Option<&[String]>,
        affected_names: &[String],
    ) {
        let cwd = workspace.location();

        for task in &tasks.sequential {
            let selected = match files {
                Some(files) => should_run(force(task), task, files, cwd),
                None => true,
            };
            if selected {
                lanes
                    .sequential
                    .push(build_spec(&self.options.context, workspace, task, affected_names));
            }
        }

        for task in &tasks.parallel {
            let selected = match files {
                Some(files) => should_run(force(task), task, files, cwd),
                None => true,
            };
            if selected {
                lanes
                    .parallel
                    .push(build_spec(&self.options.context, workspace, task, affected_names));
            }
        }
    }
}
