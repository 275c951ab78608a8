//! Markdown rendering for task runs and run summaries.

use crate::run::{RunSummary, SupervisorRun};

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

pub fn render_task_markdown(run: &SupervisorRun) -> String {
    let mut lines = vec![
        format!("# Supervisor Task Run: {}", run.task_id),
        String::new(),
        format!("- **Title:** {}", run.task_title),
        format!("- **Status:** {}", run.status),
        format!("- **Verdict:** {}", run.verdict.label()),
        format!("- **Attempt:** {}", run.attempt),
        format!("- **Profiles:** {}", run.profiles_resolved.join(", ")),
        format!("- **Tags:** {}", join_or_none(&run.tags)),
        format!("- **Failed Gates:** {}", join_or_none(&run.failed_gates)),
        String::new(),
        "## Gate Results".to_string(),
        String::new(),
        "| Gate | Attempt | Status | Duration (ms) | Return Code |".to_string(),
        "|---|---:|---|---:|---:|".to_string(),
    ];
    for r in &run.gate_results {
        lines.push(format!(
            "| `{}` | {} | {} | {} | {} |",
            r.gate_id, r.attempt, r.status, r.duration_ms, r.return_code
        ));
    }

    if !run.warnings.is_empty() {
        lines.extend(["".to_string(), "## Warnings".to_string(), String::new()]);
        lines.extend(run.warnings.iter().map(|w| format!("- {w}")));
    }

    if let Some(esc) = &run.escalation {
        lines.extend([
            String::new(),
            "## Escalation".to_string(),
            String::new(),
            format!("- **Root cause:** {}", esc.root_cause),
            format!("- **Required human action:** {}", esc.required_human_action),
        ]);
    }

    lines.extend([String::new(), "## Retry Timeline".to_string(), String::new()]);
    for attempt in run.attempt_numbers() {
        let failed = run.failed_in_attempt(attempt);
        if failed.is_empty() {
            lines.push(format!("- Attempt {attempt}: all gates passed"));
        } else {
            lines.push(format!(
                "- Attempt {attempt}: failed gates {}",
                failed.join(", ")
            ));
        }
    }

    lines.join("\n") + "\n"
}

pub fn render_summary_markdown(summary: &RunSummary) -> String {
    let mut lines = vec![
        "# Supervisor Run Summary".to_string(),
        String::new(),
        format!("- **Run ID:** {}", summary.run_id),
        format!("- **Task Source:** {}", summary.task_source),
        format!("- **Total Tasks:** {}", summary.total_tasks),
        format!("- **Passed:** {}", summary.passed_tasks),
        format!("- **Escalated:** {}", summary.escalated_tasks),
        format!("- **Blocking Failures:** {}", summary.blocking_failures),
        format!("- **Advisory Failures:** {}", summary.advisory_failures),
        String::new(),
        "## Task Outcomes".to_string(),
        String::new(),
        "| Task | Status | Profiles | Failed Gates |".to_string(),
        "|---|---|---|---|".to_string(),
    ];
    for t in &summary.tasks {
        lines.push(format!(
            "| `{}` | {} | {} | {} |",
            t.task_id,
            t.status,
            t.profiles.join(", "),
            join_or_none(&t.failed_gates)
        ));
    }
    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
