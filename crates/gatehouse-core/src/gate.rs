use crate::types::GateStatus;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GateResult
// ---------------------------------------------------------------------------

/// One execution attempt of one gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    pub gate_id: String,
    pub status: GateStatus,
    /// 1-indexed attempt number, matching the controller round it ran in.
    pub attempt: u32,
    pub duration_ms: u64,
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    /// Process exit code; `-1` when the gate never produced one (timeout,
    /// spawn failure, signal).
    pub return_code: i32,
    /// Where fuller evidence lives. Attached after the run, empty until then.
    #[serde(default)]
    pub log_ref: String,
}

impl GateResult {
    pub fn passed(&self) -> bool {
        self.status == GateStatus::Passed
    }

    /// A failed result for a gate that could not be run at all.
    pub fn not_run(gate_id: &str, attempt: u32, command: &str, reason: impl Into<String>) -> Self {
        Self {
            gate_id: gate_id.to_string(),
            status: GateStatus::Failed,
            attempt,
            duration_ms: 0,
            command: command.to_string(),
            stdout: String::new(),
            stderr: reason.into(),
            return_code: -1,
            log_ref: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// GateExecutor
// ---------------------------------------------------------------------------

/// Runs one gate for one attempt.
///
/// Implementations own the execution environment (command, timeout, env)
/// and must fold every outcome into a `GateResult`; the retry controller
/// never sees an error.
pub trait GateExecutor {
    fn execute(&mut self, gate_id: &str, attempt: u32) -> GateResult;
}

impl<F> GateExecutor for F
where
    F: FnMut(&str, u32) -> GateResult,
{
    fn execute(&mut self, gate_id: &str, attempt: u32) -> GateResult {
        self(gate_id, attempt)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
