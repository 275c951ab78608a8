//! Retry/escalation controller.
//!
//! Each round runs every gate still pending, then decides. Gates that pass
//! are never run again; only the failing subset is retried. After
//! `max_retries` rounds with failures left, the task escalates.

use crate::gate::{GateExecutor, GateResult};
use crate::types::{RunState, RunStatus};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryOutcome {
    pub status: RunStatus,
    /// Rounds used, 1-based. Equals `max_retries` when escalated.
    pub attempts: u32,
    /// Gates still failing at the end. Empty when passed.
    pub failed_gates: Vec<String>,
    /// Every attempt of every gate, in execution order.
    pub results: Vec<GateResult>,
    /// Starts at `implementing`; the caller prepends `queued`.
    pub transitions: Vec<RunState>,
}

pub fn run_with_retries<E>(
    gate_ids: &[String],
    max_retries: NonZeroU32,
    executor: &mut E,
) -> RetryOutcome
where
    E: GateExecutor + ?Sized,
{
    let max_retries = max_retries.get();
    let mut results = Vec::new();
    let mut transitions = vec![RunState::Implementing, RunState::Validating];
    let mut pending: Vec<String> = gate_ids.to_vec();
    let mut attempt = 1;

    loop {
        let mut failed = Vec::new();
        for gate_id in &pending {
            let result = executor.execute(gate_id, attempt);
            tracing::debug!(
                gate = %gate_id,
                attempt,
                status = %result.status,
                duration_ms = result.duration_ms,
                "gate attempt finished"
            );
            if !result.passed() {
                failed.push(gate_id.clone());
            }
            results.push(result);
        }

        if failed.is_empty() {
            transitions.push(RunState::Passed);
            return RetryOutcome {
                status: RunStatus::Passed,
                attempts: attempt,
                failed_gates: Vec::new(),
                results,
                transitions,
            };
        }

        if attempt >= max_retries {
            transitions.extend([RunState::Failed, RunState::Escalated]);
            return RetryOutcome {
                status: RunStatus::Escalated,
                attempts: attempt,
                failed_gates: failed,
                results,
                transitions,
            };
        }

        transitions.extend([RunState::Failed, RunState::Retrying, RunState::Validating]);
        pending = failed;
        attempt += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
