//! Per-task orchestration: resolve → run with retries → classify.
//!
//! One task runs to completion before the next starts. The policy is
//! borrowed read-only for the whole batch; each run's results are owned by
//! that run alone.

use crate::classifier::classify;
use crate::error::Result;
use crate::escalation::EscalationReport;
use crate::gate::GateExecutor;
use crate::policy::Policy;
use crate::resolver::{resolve, resolve_gates, ProfileResolution};
use crate::retry::run_with_retries;
use crate::run::{RunSummary, SupervisorRun};
use crate::task::{Task, TaskSource};
use crate::types::{RunState, RunStatus};
use chrono::Utc;
use std::time::Instant;

/// Resolved profiles plus the gate list they require.
#[derive(Debug, Clone, PartialEq)]
pub struct GatePlan {
    pub resolution: ProfileResolution,
    pub gates: Vec<String>,
}

pub fn plan(tags: &[String], policy: &Policy) -> GatePlan {
    let resolution = resolve(tags, policy);
    let gates = resolve_gates(&resolution.profiles, policy);
    GatePlan { resolution, gates }
}

pub struct Supervisor<'p> {
    policy: &'p Policy,
    run_id: String,
}

impl<'p> Supervisor<'p> {
    pub fn new(policy: &'p Policy) -> Self {
        Self::with_run_id(policy, uuid::Uuid::new_v4().to_string())
    }

    pub fn with_run_id(policy: &'p Policy, run_id: impl Into<String>) -> Self {
        Self {
            policy,
            run_id: run_id.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Run one task's gates to a terminal outcome.
    pub fn run_task<E>(&self, task: &Task, executor: &mut E) -> SupervisorRun
    where
        E: GateExecutor + ?Sized,
    {
        let started = Instant::now();
        let started_at = Utc::now();

        let GatePlan { resolution, gates } = plan(&task.tags, self.policy);
        tracing::debug!(
            task = %task.id,
            profiles = ?resolution.profiles,
            gates = ?gates,
            "resolved gates"
        );

        let outcome = run_with_retries(&gates, self.policy.max_retries(), executor);

        let escalation = match outcome.status {
            RunStatus::Escalated => {
                tracing::warn!(
                    task = %task.id,
                    attempts = outcome.attempts,
                    failed = ?outcome.failed_gates,
                    "task escalated"
                );
                Some(EscalationReport::new(
                    &self.run_id,
                    &task.id,
                    outcome.failed_gates.clone(),
                    outcome.attempts,
                ))
            }
            RunStatus::Passed => None,
        };

        let verdict = classify(
            outcome.status,
            resolution.has_blocking_profile(),
            &outcome.failed_gates,
            self.policy,
        );
        tracing::info!(
            task = %task.id,
            status = %outcome.status,
            attempts = outcome.attempts,
            verdict = verdict.label(),
            "task finished"
        );

        let mut state_transitions = Vec::with_capacity(outcome.transitions.len() + 1);
        state_transitions.push(RunState::Queued);
        state_transitions.extend(outcome.transitions);

        SupervisorRun {
            run_id: self.run_id.clone(),
            task_id: task.id.clone(),
            task_title: task.title.clone(),
            tags: task.tags.clone(),
            profiles_resolved: resolution.profiles,
            gates_run: gates,
            attempt: outcome.attempts,
            status: outcome.status,
            failed_gates: outcome.failed_gates,
            started_at,
            ended_at: Utc::now(),
            duration_ms: started.elapsed().as_millis() as u64,
            escalation,
            warnings: resolution.warnings,
            gate_results: outcome.results,
            state_transitions,
            verdict,
        }
    }

    /// Run every task in order and accumulate the summary.
    ///
    /// `executor_for` builds the executor for each task (so it can carry
    /// task context); `sink` receives each finished run before it is counted
    /// and may persist it. A sink error aborts the batch.
    pub fn run_batch<F, E, S>(
        &self,
        tasks: &[&Task],
        task_source: TaskSource,
        mut executor_for: F,
        mut sink: S,
    ) -> Result<RunSummary>
    where
        F: FnMut(&Task) -> E,
        E: GateExecutor,
        S: FnMut(&mut SupervisorRun) -> Result<()>,
    {
        let mut summary = RunSummary::new(&self.run_id, task_source);
        for task in tasks {
            let mut executor = executor_for(task);
            let mut run = self.run_task(task, &mut executor);
            sink(&mut run)?;
            summary.record(&run);
        }
        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
