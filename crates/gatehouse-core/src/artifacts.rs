//! Persisted evidence for a run: one JSON + markdown pair per task, and one
//! pair for the run summary.
//!
//! Layout:
//! ```text
//! <artifacts>/<run_id>/<task_id>.json
//! <artifacts>/<run_id>/<task_id>.md
//! <artifacts>/<run_id>/summary.json
//! <artifacts>/<run_id>/summary.md
//! ```

use crate::error::Result;
use crate::io;
use crate::paths;
use crate::report::{render_summary_markdown, render_task_markdown};
use crate::run::{RunSummary, SupervisorRun};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRefs {
    pub json: PathBuf,
    pub markdown: PathBuf,
}

/// Write a task run's JSON and markdown evidence.
///
/// Every gate result's `log_ref` is pointed at the markdown file before
/// anything is serialized, so the JSON on disk already carries it.
pub fn write_task_artifacts(artifacts_dir: &Path, run: &mut SupervisorRun) -> Result<ArtifactRefs> {
    let json = paths::task_json_path(artifacts_dir, &run.run_id, &run.task_id);
    let markdown = paths::task_markdown_path(artifacts_dir, &run.run_id, &run.task_id);

    run.attach_log_ref(&markdown.to_string_lossy());

    let data = serde_json::to_string_pretty(run)?;
    io::atomic_write(&json, data.as_bytes())?;
    io::atomic_write(&markdown, render_task_markdown(run).as_bytes())?;

    tracing::debug!(task = %run.task_id, path = %json.display(), "wrote task artifacts");
    Ok(ArtifactRefs { json, markdown })
}

pub fn write_summary_artifacts(artifacts_dir: &Path, summary: &RunSummary) -> Result<ArtifactRefs> {
    let dir = paths::run_dir(artifacts_dir, &summary.run_id);
    let json = dir.join(paths::SUMMARY_JSON);
    let markdown = dir.join(paths::SUMMARY_MD);

    let data = serde_json::to_string_pretty(summary)?;
    io::atomic_write(&json, data.as_bytes())?;
    io::atomic_write(&markdown, render_summary_markdown(summary).as_bytes())?;
    Ok(ArtifactRefs { json, markdown })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
