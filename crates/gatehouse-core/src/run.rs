use crate::classifier::Verdict;
use crate::escalation::EscalationReport;
use crate::gate::GateResult;
use crate::task::TaskSource;
use crate::types::{RunState, RunStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SupervisorRun
// ---------------------------------------------------------------------------

/// Final record of one task's run. `escalation` is present iff `status` is
/// `escalated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorRun {
    pub run_id: String,
    pub task_id: String,
    pub task_title: String,
    pub tags: Vec<String>,
    pub profiles_resolved: Vec<String>,
    pub gates_run: Vec<String>,
    pub attempt: u32,
    pub status: RunStatus,
    pub failed_gates: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub escalation: Option<EscalationReport>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub gate_results: Vec<GateResult>,
    #[serde(default)]
    pub state_transitions: Vec<RunState>,
    pub verdict: Verdict,
}

impl SupervisorRun {
    /// Point every gate result at the evidence file for this run.
    pub fn attach_log_ref(&mut self, log_ref: &str) {
        for result in &mut self.gate_results {
            result.log_ref = log_ref.to_string();
        }
    }

    /// Distinct attempt numbers present in `gate_results`, ascending.
    pub fn attempt_numbers(&self) -> Vec<u32> {
        let mut attempts: Vec<u32> = self.gate_results.iter().map(|r| r.attempt).collect();
        attempts.sort_unstable();
        attempts.dedup();
        attempts
    }

    /// Gate IDs that failed in the given attempt.
    pub fn failed_in_attempt(&self, attempt: u32) -> Vec<&str> {
        self.gate_results
            .iter()
            .filter(|r| r.attempt == attempt && !r.passed())
            .map(|r| r.gate_id.as_str())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// RunSummary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: String,
    pub task_title: String,
    pub status: RunStatus,
    pub profiles: Vec<String>,
    pub failed_gates: Vec<String>,
    pub warnings: Vec<String>,
}

/// Cross-task counters for one supervisor invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub task_source: TaskSource,
    pub total_tasks: usize,
    pub passed_tasks: usize,
    pub escalated_tasks: usize,
    pub blocking_failures: usize,
    pub advisory_failures: usize,
    pub tasks: Vec<TaskSummary>,
}

impl RunSummary {
    pub fn new(run_id: impl Into<String>, task_source: TaskSource) -> Self {
        Self {
            run_id: run_id.into(),
            task_source,
            total_tasks: 0,
            passed_tasks: 0,
            escalated_tasks: 0,
            blocking_failures: 0,
            advisory_failures: 0,
            tasks: Vec::new(),
        }
    }

    pub fn record(&mut self, run: &SupervisorRun) {
        self.total_tasks += 1;
        match run.status {
            RunStatus::Passed => self.passed_tasks += 1,
            RunStatus::Escalated => self.escalated_tasks += 1,
        }
        if run.verdict.blocking {
            self.blocking_failures += 1;
        }
        if run.verdict.advisory {
            self.advisory_failures += 1;
        }
        self.tasks.push(TaskSummary {
            task_id: run.task_id.clone(),
            task_title: run.task_title.clone(),
            status: run.status,
            profiles: run.profiles_resolved.clone(),
            failed_gates: run.failed_gates.clone(),
            warnings: run.warnings.clone(),
        });
    }

    /// Only blocking failures fail the run; advisory failures and
    /// escalations alone do not.
    pub fn has_blocking_failures(&self) -> bool {
        self.blocking_failures > 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GateStatus;

    fn sample_run(status: RunStatus, verdict: Verdict) -> SupervisorRun {
        let now = Utc::now();
        let gate = |id: &str, attempt: u32, passed: bool| GateResult {
            gate_id: id.to_string(),
            status: GateStatus::from_success(passed),
            attempt,
            duration_ms: 5,
            command: "true".to_string(),
            stdout: String::new(),
            stderr: String::new(),
            return_code: if passed { 0 } else { 1 },
            log_ref: String::new(),
        };
        SupervisorRun {
            run_id: "run-1".to_string(),
            task_id: "S01".to_string(),
            task_title: "Login".to_string(),
            tags: vec!["auth".to_string()],
            profiles_resolved: vec!["safe-baseline".to_string()],
            gates_run: vec!["g1".to_string(), "g2".to_string()],
            attempt: 2,
            status,
            failed_gates: Vec::new(),
            started_at: now,
            ended_at: now,
            duration_ms: 10,
            escalation: None,
            warnings: Vec::new(),
            gate_results: vec![gate("g1", 1, false), gate("g2", 1, true), gate("g1", 2, true)],
            state_transitions: vec![RunState::Queued],
            verdict,
        }
    }

    #[test]
    fn attempt_timeline_helpers() {
        let run = sample_run(RunStatus::Passed, Verdict::CLEAN);
        assert_eq!(run.attempt_numbers(), vec![1, 2]);
        assert_eq!(run.failed_in_attempt(1), vec!["g1"]);
        assert!(run.failed_in_attempt(2).is_empty());
    }

    #[test]
    fn attach_log_ref_sets_every_result() {
        let mut run = sample_run(RunStatus::Passed, Verdict::CLEAN);
        run.attach_log_ref("/tmp/S01.md");
        assert!(run.gate_results.iter().all(|r| r.log_ref == "/tmp/S01.md"));
    }

    #[test]
    fn summary_counts_outcomes() {
        let mut summary = RunSummary::new("run-1", TaskSource::All);
        summary.record(&sample_run(RunStatus::Passed, Verdict::CLEAN));
        summary.record(&sample_run(RunStatus::Escalated, Verdict::ADVISORY));
        assert!(!summary.has_blocking_failures());
        summary.record(&sample_run(RunStatus::Escalated, Verdict::BLOCKING));

        assert_eq!(summary.total_tasks, 3);
        assert_eq!(summary.passed_tasks, 1);
        assert_eq!(summary.escalated_tasks, 2);
        assert_eq!(summary.advisory_failures, 1);
        assert_eq!(summary.blocking_failures, 1);
        assert!(summary.has_blocking_failures());
        assert_eq!(summary.tasks.len(), 3);
    }

    #[test]
    fn run_json_uses_snake_case_states() {
        let run = sample_run(RunStatus::Escalated, Verdict::ADVISORY);
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["status"], "escalated");
        assert_eq!(json["state_transitions"][0], "queued");
        assert!(json["escalation"].is_null());
        assert_eq!(json["verdict"]["advisory"], true);
    }
}
