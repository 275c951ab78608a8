use crate::policy::Policy;
use crate::types::RunStatus;
use serde::{Deserialize, Serialize};

/// Whether a task's outcome should fail the overall run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub blocking: bool,
    pub advisory: bool,
}

impl Verdict {
    pub const CLEAN: Verdict = Verdict {
        blocking: false,
        advisory: false,
    };
    pub const BLOCKING: Verdict = Verdict {
        blocking: true,
        advisory: false,
    };
    pub const ADVISORY: Verdict = Verdict {
        blocking: false,
        advisory: true,
    };

    pub fn label(self) -> &'static str {
        match (self.blocking, self.advisory) {
            (true, _) => "blocking",
            (false, true) => "advisory",
            (false, false) => "clean",
        }
    }
}

/// Classify a finished task.
///
/// Precedence, first match wins:
/// 1. passed → clean
/// 2. any failed gate marked `blocking` in the policy → blocking
/// 3. the task matched a blocking profile → blocking
/// 4. otherwise → advisory
///
/// A gate-level `blocking` flag wins even inside an advisory profile.
pub fn classify(
    status: RunStatus,
    has_blocking_profile: bool,
    failed_gates: &[String],
    policy: &Policy,
) -> Verdict {
    if status == RunStatus::Passed {
        return Verdict::CLEAN;
    }
    if failed_gates.iter().any(|g| policy.is_blocking_gate(g)) {
        return Verdict::BLOCKING;
    }
    if has_blocking_profile {
        return Verdict::BLOCKING;
    }
    Verdict::ADVISORY
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> Policy {
        Policy::parse(
            r#"
retry: {max_retries: 2}
defaults: {default_profile: advisory}
tags_to_profiles: {}
gates:
  slice-ui-evidence: {command: "true", blocking: true}
  safe-gate: {command: "true", blocking: false}
profiles:
  advisory: {blocking: false, gates: [slice-ui-evidence, safe-gate]}
"#,
        )
        .unwrap()
    }

    fn failed(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn passed_is_clean_even_with_blocking_signals() {
        let verdict = classify(
            RunStatus::Passed,
            true,
            &failed(&["slice-ui-evidence"]),
            &policy(),
        );
        assert_eq!(verdict, Verdict::CLEAN);
    }

    #[test]
    fn blocking_gate_wins_inside_advisory_profile() {
        let verdict = classify(
            RunStatus::Escalated,
            false,
            &failed(&["slice-ui-evidence"]),
            &policy(),
        );
        assert_eq!(verdict, Verdict::BLOCKING);
    }

    #[test]
    fn blocking_profile_blocks_non_blocking_gate() {
        let verdict = classify(RunStatus::Escalated, true, &failed(&["safe-gate"]), &policy());
        assert_eq!(verdict, Verdict::BLOCKING);
    }

    #[test]
    fn advisory_when_no_blocking_signal() {
        let verdict = classify(RunStatus::Escalated, false, &failed(&["safe-gate"]), &policy());
        assert_eq!(verdict, Verdict::ADVISORY);
        assert_eq!(verdict.label(), "advisory");
    }

    #[test]
    fn unknown_failed_gate_is_not_blocking() {
        let verdict = classify(RunStatus::Escalated, false, &failed(&["ghost"]), &policy());
        assert_eq!(verdict, Verdict::ADVISORY);
    }
}
