use crate::cmd::policy::load_policy;
use crate::executor::ShellGateExecutor;
use crate::output::{list_cell, print_json, print_table};
use anyhow::Context;
use clap::Args;
use gatehouse_core::artifacts::{write_summary_artifacts, write_task_artifacts};
use gatehouse_core::report::render_summary_markdown;
use gatehouse_core::supervisor::Supervisor;
use gatehouse_core::task::{select_tasks, Task, TaskSource};
use gatehouse_core::{io, paths, task_list};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct RunArgs {
    /// Markdown task checklist (default: TASKS.md)
    #[arg(long)]
    pub tasks_file: Option<PathBuf>,

    /// Policy file (default: .gatehouse/policy.yaml)
    #[arg(long)]
    pub policy_file: Option<PathBuf>,

    /// Where run artifacts are written (default: .gatehouse/artifacts)
    #[arg(long)]
    pub artifacts_dir: Option<PathBuf>,

    /// Which open tasks to run: pilot, all, or ids
    #[arg(long, default_value = "pilot")]
    pub task_source: TaskSource,

    /// Comma-separated task IDs for --task-source ids
    #[arg(long, value_delimiter = ',')]
    pub task_ids: Vec<String>,
}

pub fn run(root: &Path, args: RunArgs, json: bool) -> anyhow::Result<()> {
    let policy = load_policy(root, args.policy_file)?;

    let tasks_path = args
        .tasks_file
        .map(|p| root.join(p))
        .unwrap_or_else(|| paths::tasks_path(root));
    let artifacts_dir = args
        .artifacts_dir
        .map(|p| root.join(p))
        .unwrap_or_else(|| paths::artifacts_dir(root));

    if args.task_source == TaskSource::Ids {
        if args.task_ids.is_empty() {
            anyhow::bail!("--task-source ids requires --task-ids");
        }
        for id in &args.task_ids {
            paths::validate_task_id(id)?;
        }
    }

    let tasks = task_list::load_tasks(&tasks_path)
        .with_context(|| format!("failed to load tasks from {}", tasks_path.display()))?;
    let selected = select_tasks(&tasks, args.task_source, &policy, &args.task_ids);
    if selected.is_empty() {
        tracing::warn!(source = %args.task_source, "no open tasks selected");
    }

    let supervisor = Supervisor::new(&policy);
    let run_id = supervisor.run_id().to_string();
    tracing::info!(run_id = %run_id, tasks = selected.len(), "starting run");

    let run_dir = paths::run_dir(&artifacts_dir, &run_id);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create {}", run_dir.display()))?;

    let summary = supervisor
        .run_batch(
            &selected,
            args.task_source,
            |task: &Task| ShellGateExecutor::for_task(&policy, root, &run_id, task, &artifacts_dir),
            |run| write_task_artifacts(&artifacts_dir, run).map(|_| ()),
        )
        .context("failed to write task artifacts")?;

    let refs = write_summary_artifacts(&artifacts_dir, &summary)
        .context("failed to write run summary")?;

    if let Some(step_summary) = std::env::var_os("GITHUB_STEP_SUMMARY").filter(|v| !v.is_empty()) {
        let step_summary = PathBuf::from(step_summary);
        io::append_text(&step_summary, &render_summary_markdown(&summary))
            .with_context(|| format!("failed to append to {}", step_summary.display()))?;
    }

    if json {
        print_json(&summary)?;
    } else {
        let rows = summary
            .tasks
            .iter()
            .map(|t| {
                vec![
                    t.task_id.clone(),
                    t.status.to_string(),
                    list_cell(&t.profiles),
                    list_cell(&t.failed_gates),
                ]
            })
            .collect();
        print_table(&["TASK", "STATUS", "PROFILES", "FAILED GATES"], rows);
        println!();
        println!(
            "{} task(s): {} passed, {} escalated ({} blocking, {} advisory)",
            summary.total_tasks,
            summary.passed_tasks,
            summary.escalated_tasks,
            summary.blocking_failures,
            summary.advisory_failures
        );
        println!("summary: {}", refs.markdown.display());
    }

    if summary.has_blocking_failures() {
        anyhow::bail!(
            "{} task(s) escalated with blocking failures",
            summary.blocking_failures
        );
    }
    Ok(())
}
