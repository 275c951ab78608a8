//! Which task IDs were added or edited between two git revisions of the
//! task list. Used by CI to feed `run --task-source ids`.

use crate::error::{GatehouseError, Result};
use crate::paths;
use crate::task_list::task_line_re;
use std::collections::BTreeSet;
use std::path::Path;
use std::process::Command;

/// Collect explicit task IDs from the added lines of a unified diff.
///
/// Only `"<ID> - <title>"` bodies count; slug-ID tasks have no stable
/// identity across edits. Output is sorted and deduplicated.
pub fn extract_changed_task_ids(diff_text: &str) -> Vec<String> {
    let mut ids = BTreeSet::new();
    for line in diff_text.lines() {
        let Some(added) = line.strip_prefix('+') else {
            continue;
        };
        if added.starts_with("++") {
            continue;
        }
        let Some(caps) = task_line_re().captures(added) else {
            continue;
        };
        let body = caps["body"].trim();
        if let Some((id, title)) = body.split_once(" - ") {
            if paths::is_valid_task_id(id) && !title.trim().is_empty() {
                ids.insert(id.to_string());
            }
        }
    }
    ids.into_iter().collect()
}

/// Diff `tasks_file` between `base` and `head` (three-dot range) and return
/// the task IDs touched on the head side.
pub fn changed_task_ids_from_git(
    root: &Path,
    base: &str,
    head: &str,
    tasks_file: &Path,
) -> Result<Vec<String>> {
    for sha in [base, head] {
        let verify = Command::new("git")
            .args(["rev-parse", "--verify"])
            .arg(format!("{sha}^{{commit}}"))
            .current_dir(root)
            .output()?;
        if !verify.status.success() {
            let stderr = String::from_utf8_lossy(&verify.stderr);
            return Err(GatehouseError::Git(format!(
                "invalid commit for task diff: {sha}: {}",
                stderr.trim()
            )));
        }
    }

    let diff = Command::new("git")
        .args(["diff", "--unified=0"])
        .arg(format!("{base}...{head}"))
        .arg("--")
        .arg(tasks_file)
        .current_dir(root)
        .output()?;
    // 1 means "differences found" under some git configs.
    if !matches!(diff.status.code(), Some(0) | Some(1)) {
        let stderr = String::from_utf8_lossy(&diff.stderr);
        return Err(GatehouseError::Git(format!(
            "failed to diff {} between {base} and {head}: {}",
            tasks_file.display(),
            stderr.trim()
        )));
    }

    Ok(extract_changed_task_ids(&String::from_utf8_lossy(
        &diff.stdout,
    )))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
