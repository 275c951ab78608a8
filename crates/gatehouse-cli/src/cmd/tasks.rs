use crate::output::{list_cell, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use gatehouse_core::{paths, task_diff, task_list};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum TasksSubcommand {
    /// List tasks parsed from the checklist
    List {
        /// Include tasks already checked off
        #[arg(long)]
        all: bool,

        /// Markdown task checklist (default: TASKS.md)
        #[arg(long)]
        tasks_file: Option<PathBuf>,
    },

    /// Print task IDs added or edited between two commits
    Changed {
        #[arg(long)]
        base: String,

        #[arg(long)]
        head: String,

        /// Checklist path relative to the repo (default: TASKS.md)
        #[arg(long)]
        tasks_file: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: TasksSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TasksSubcommand::List { all, tasks_file } => list(root, all, tasks_file, json),
        TasksSubcommand::Changed {
            base,
            head,
            tasks_file,
        } => changed(root, &base, &head, tasks_file, json),
    }
}

fn list(root: &Path, all: bool, tasks_file: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let path = tasks_file
        .map(|p| root.join(p))
        .unwrap_or_else(|| paths::tasks_path(root));
    let tasks = task_list::load_tasks(&path)
        .with_context(|| format!("failed to load tasks from {}", path.display()))?;
    let tasks: Vec<_> = tasks.into_iter().filter(|t| all || t.is_open()).collect();

    if json {
        return print_json(&tasks);
    }
    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    let rows = tasks
        .iter()
        .map(|t| {
            vec![
                t.id.clone(),
                t.status.to_string(),
                list_cell(&t.tags),
                t.title.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "STATUS", "TAGS", "TITLE"], rows);
    Ok(())
}

fn changed(
    root: &Path,
    base: &str,
    head: &str,
    tasks_file: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let tasks_file = tasks_file.unwrap_or_else(|| PathBuf::from(paths::TASKS_FILE));
    let ids = task_diff::changed_task_ids_from_git(root, base, head, &tasks_file)
        .context("failed to diff task list")?;
    if json {
        print_json(&ids)?;
    } else {
        println!("{}", ids.join(" "));
    }
    Ok(())
}
