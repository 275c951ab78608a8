use crate::error::{GatehouseError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const GATEHOUSE_DIR: &str = ".gatehouse";
pub const POLICY_FILE: &str = ".gatehouse/policy.yaml";
pub const ARTIFACTS_DIR: &str = ".gatehouse/artifacts";
pub const TASKS_FILE: &str = "TASKS.md";

pub const SUMMARY_JSON: &str = "summary.json";
pub const SUMMARY_MD: &str = "summary.md";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn policy_path(root: &Path) -> PathBuf {
    root.join(POLICY_FILE)
}

pub fn artifacts_dir(root: &Path) -> PathBuf {
    root.join(ARTIFACTS_DIR)
}

pub fn tasks_path(root: &Path) -> PathBuf {
    root.join(TASKS_FILE)
}

/// `<artifacts>/<run_id>/`
pub fn run_dir(artifacts: &Path, run_id: &str) -> PathBuf {
    artifacts.join(run_id)
}

pub fn task_json_path(artifacts: &Path, run_id: &str, task_id: &str) -> PathBuf {
    run_dir(artifacts, run_id).join(format!("{}.json", safe_task_id(task_id)))
}

pub fn task_markdown_path(artifacts: &Path, run_id: &str, task_id: &str) -> PathBuf {
    run_dir(artifacts, run_id).join(format!("{}.md", safe_task_id(task_id)))
}

/// Map a task ID onto a file-name-safe stem. Anything other than ASCII
/// alphanumerics, `-`, `_` and `.` becomes `-`.
pub fn safe_task_id(task_id: &str) -> String {
    task_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Task ID validation
// ---------------------------------------------------------------------------

static TASK_ID_RE: OnceLock<Regex> = OnceLock::new();

pub(crate) fn task_id_re() -> &'static Regex {
    TASK_ID_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]+$").unwrap())
}

pub fn is_valid_task_id(id: &str) -> bool {
    task_id_re().is_match(id)
}

pub fn validate_task_id(id: &str) -> Result<()> {
    if !is_valid_task_id(id) {
        return Err(GatehouseError::InvalidTaskId(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
