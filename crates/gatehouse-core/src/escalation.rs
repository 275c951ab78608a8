//! Escalation report: the structured hand-off to a human once a task has
//! exhausted its retries.

use serde::{Deserialize, Serialize};

pub const ROOT_CAUSE: &str = "One or more gates failed after maximum retries";
pub const REQUIRED_HUMAN_ACTION: &str =
    "Inspect gate logs, apply targeted fixes, and rerun supervisor";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationReport {
    pub run_id: String,
    pub task_id: String,
    pub failed_gates: Vec<String>,
    pub attempts: u32,
    pub root_cause: String,
    pub required_human_action: String,
}

impl EscalationReport {
    pub fn new(
        run_id: impl Into<String>,
        task_id: impl Into<String>,
        failed_gates: Vec<String>,
        attempts: u32,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            task_id: task_id.into(),
            failed_gates,
            attempts,
            root_cause: ROOT_CAUSE.to_string(),
            required_human_action: REQUIRED_HUMAN_ACTION.to_string(),
        }
    }
}
