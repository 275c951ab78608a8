//! Task list loader for markdown checklists such as:
//!
//! ```text
//! - [ ] **S99 - User can archive project** [app][auth][rbac]
//! - [x] **S01 - Public auth pages render**
//! ```

use crate::error::{GatehouseError, Result};
use crate::paths;
use crate::task::Task;
use crate::types::TaskStatus;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

static TASK_LINE_RE: OnceLock<Regex> = OnceLock::new();
static TAG_RE: OnceLock<Regex> = OnceLock::new();
static NON_ALNUM_RE: OnceLock<Regex> = OnceLock::new();

pub(crate) fn task_line_re() -> &'static Regex {
    TASK_LINE_RE.get_or_init(|| {
        Regex::new(
            r"^\s*-\s\[(?P<status>[ xX])]\s\*\*(?P<body>.+?)\*\*(?P<tags>(?:\s*\[[A-Za-z0-9_-]+])*)\s*$",
        )
        .unwrap()
    })
}

fn tag_re() -> &'static Regex {
    TAG_RE.get_or_init(|| Regex::new(r"\[([A-Za-z0-9_-]+)]").unwrap())
}

fn non_alnum_re() -> &'static Regex {
    NON_ALNUM_RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9]+").unwrap())
}

/// Lowercase, collapse non-alphanumeric runs to `-`, trim dashes.
/// Empty results become `"task"`.
pub fn slugify(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    let slug = non_alnum_re().replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "task".to_string()
    } else {
        slug.to_string()
    }
}

/// Split a task body into `(id, title)`. A body of the form `"<ID> - <title>"`
/// with a well-formed ID keeps it; anything else gets a slug ID.
pub fn split_body(body: &str) -> (String, String) {
    if let Some((maybe_id, maybe_title)) = body.split_once(" - ") {
        let maybe_id = maybe_id.trim();
        if paths::is_valid_task_id(maybe_id) {
            return (maybe_id.to_string(), maybe_title.trim().to_string());
        }
    }
    (slugify(body), body.to_string())
}

/// Parse one checklist line. Returns `None` for anything that isn't a task.
pub fn parse_task_line(line: &str, source_line: usize) -> Option<Task> {
    let caps = task_line_re().captures(line)?;

    let status = match &caps["status"] {
        "x" | "X" => TaskStatus::Done,
        _ => TaskStatus::Open,
    };
    let body = caps["body"].trim();
    let tags = caps
        .name("tags")
        .map(|m| {
            tag_re()
                .captures_iter(m.as_str())
                .map(|c| c[1].to_lowercase())
                .collect()
        })
        .unwrap_or_default();

    let (id, title) = split_body(body);
    Some(Task {
        id,
        title,
        tags,
        status,
        source_line,
    })
}

pub fn parse_tasks(content: &str) -> Vec<Task> {
    content
        .lines()
        .enumerate()
        .filter_map(|(i, line)| parse_task_line(line, i + 1))
        .collect()
}

pub fn load_tasks(path: &Path) -> Result<Vec<Task>> {
    if !path.exists() {
        return Err(GatehouseError::TasksNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(parse_tasks(&content))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
