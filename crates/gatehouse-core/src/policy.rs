//! Supervisor policy: gates, profiles, the tag → profile map and the retry
//! bound.
//!
//! A [`Policy`] is only ever handed out by [`Policy::load`] or
//! [`Policy::parse`], both of which validate it. Everything downstream
//! (resolver, classifier, supervisor) assumes every referenced gate and
//! profile exists and that `extends` is acyclic.

use crate::error::{GatehouseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU32;
use std::path::Path;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts allowed per task, including the first. Must be >= 1.
    pub max_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDefaults {
    pub default_profile: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PilotConfig {
    #[serde(default)]
    pub include_task_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileDefinition {
    /// Intrinsic to this profile; never inherited from `extends`.
    pub blocking: bool,
    pub gates: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extends: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateDefinition {
    pub command: String,
    /// `0` means no timeout.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// A failure of a blocking gate blocks the run even inside an advisory
    /// profile.
    #[serde(default)]
    pub blocking: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_timeout() -> u64 {
    900
}

fn default_version() -> u32 {
    1
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default = "default_version")]
    pub version: u32,
    pub retry: RetryPolicy,
    pub defaults: PolicyDefaults,
    pub tags_to_profiles: BTreeMap<String, Vec<String>>,
    pub profiles: BTreeMap<String, ProfileDefinition>,
    pub gates: BTreeMap<String, GateDefinition>,
    #[serde(default)]
    pub pilot: PilotConfig,
}

impl Policy {
    /// Read and validate a policy file. YAML and JSON are both accepted.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(GatehouseError::PolicyNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        Self::parse(&data)
    }

    pub fn parse(data: &str) -> Result<Self> {
        let policy: Policy = serde_yaml::from_str(data)?;
        policy.validate()?;
        Ok(policy)
    }

    /// The retry bound. Validation guarantees the configured value is >= 1.
    pub fn max_retries(&self) -> NonZeroU32 {
        NonZeroU32::new(self.retry.max_retries).unwrap_or(NonZeroU32::MIN)
    }

    pub fn profile(&self, name: &str) -> Option<&ProfileDefinition> {
        self.profiles.get(name)
    }

    pub fn gate(&self, id: &str) -> Option<&GateDefinition> {
        self.gates.get(id)
    }

    pub fn is_blocking_gate(&self, id: &str) -> bool {
        self.gate(id).is_some_and(|g| g.blocking)
    }

    pub fn is_blocking_profile(&self, name: &str) -> bool {
        self.profile(name).is_some_and(|p| p.blocking)
    }

    pub fn profiles_for_tag(&self, tag: &str) -> &[String] {
        self.tags_to_profiles
            .get(tag)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_pilot_task(&self, task_id: &str) -> bool {
        self.pilot.include_task_ids.iter().any(|id| id == task_id)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Check every structural invariant. The first violation wins.
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_retries < 1 {
            return Err(GatehouseError::InvalidMaxRetries(self.retry.max_retries));
        }

        let default_profile = &self.defaults.default_profile;
        if !self.profiles.contains_key(default_profile) {
            return Err(GatehouseError::UnknownDefaultProfile(
                default_profile.clone(),
            ));
        }

        for (name, profile) in &self.profiles {
            if let Some(gate) = profile.gates.iter().find(|g| !self.gates.contains_key(*g)) {
                return Err(GatehouseError::UnknownGate {
                    profile: name.clone(),
                    gate: gate.clone(),
                });
            }
            if let Some(parent) = profile
                .extends
                .iter()
                .find(|p| !self.profiles.contains_key(*p))
            {
                return Err(GatehouseError::UnknownParentProfile {
                    profile: name.clone(),
                    parent: parent.clone(),
                });
            }
        }

        for (tag, mapped) in &self.tags_to_profiles {
            if let Some(profile) = mapped.iter().find(|p| !self.profiles.contains_key(*p)) {
                return Err(GatehouseError::UnknownTagProfile {
                    tag: tag.clone(),
                    profile: profile.clone(),
                });
            }
        }

        for (id, gate) in &self.gates {
            if gate.command.trim().is_empty() {
                return Err(GatehouseError::EmptyGateCommand(id.clone()));
            }
        }

        self.check_extends_acyclic()
    }

    /// Iterative three-colour DFS over `extends`. Reports the first cycle as
    /// the path from the re-entered profile back to itself.
    fn check_extends_acyclic(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();

        for start in self.profiles.keys() {
            if marks.contains_key(start.as_str()) {
                continue;
            }
            let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
            marks.insert(start.as_str(), Mark::Visiting);

            loop {
                let (name, next) = match stack.last_mut() {
                    Some(top) => {
                        let frame = (top.0, top.1);
                        top.1 += 1;
                        frame
                    }
                    None => break,
                };
                let parents = self
                    .profiles
                    .get(name)
                    .map(|p| p.extends.as_slice())
                    .unwrap_or(&[]);

                let Some(parent) = parents.get(next) else {
                    marks.insert(name, Mark::Done);
                    stack.pop();
                    continue;
                };

                match marks.get(parent.as_str()) {
                    Some(Mark::Visiting) => {
                        let mut cycle: Vec<String> = stack
                            .iter()
                            .skip_while(|(n, _)| *n != parent.as_str())
                            .map(|(n, _)| n.to_string())
                            .collect();
                        cycle.push(parent.clone());
                        return Err(GatehouseError::ExtendsCycle(cycle));
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(parent.as_str(), Mark::Visiting);
                        stack.push((parent.as_str(), 0));
                    }
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Starter policy
// ---------------------------------------------------------------------------

/// Written by `gatehouse init`. Untagged tasks fall back to `safe-baseline`.
pub const STARTER_POLICY: &str = r#"version: 1
retry:
  max_retries: 3
defaults:
  default_profile: safe-baseline
pilot:
  include_task_ids: []
tags_to_profiles:
  auth: [auth-rbac]
  rbac: [auth-rbac]
  security: [security]
gates:
  lint:
    command: "cargo clippy --all-targets -- -D warnings"
    timeout_seconds: 600
  unit-tests:
    command: "cargo test --workspace"
    timeout_seconds: 900
  security-lite:
    command: "git grep -nE '(AKIA[0-9A-Z]{16}|BEGIN (RSA|EC) PRIVATE KEY)' && exit 1 || exit 0"
    timeout_seconds: 120
    blocking: true
profiles:
  safe-baseline:
    blocking: false
    gates: [lint, unit-tests]
  auth-rbac:
    blocking: true
    extends: [safe-baseline]
    gates: [security-lite]
  security:
    blocking: true
    extends: [safe-baseline]
    gates: [security-lite]
"#;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
retry:
  max_retries: 3
defaults:
  default_profile: safe-baseline
tags_to_profiles:
  auth: [auth-rbac]
gates:
  g1:
    command: "true"
  g2:
    command: "true"
    blocking: true
profiles:
  safe-baseline:
    blocking: false
    gates: [g1]
  auth-rbac:
    blocking: true
    extends: [safe-baseline]
    gates: [g2]
"#;

    #[test]
    fn parses_valid_policy_with_defaults() {
        let policy = Policy::parse(BASE).unwrap();
        assert_eq!(policy.version, 1);
        assert_eq!(policy.max_retries().get(), 3);
        assert!(policy.pilot.include_task_ids.is_empty());
        assert_eq!(policy.gate("g1").unwrap().timeout_seconds, 900);
        assert!(!policy.is_blocking_gate("g1"));
        assert!(policy.is_blocking_gate("g2"));
        assert!(policy.is_blocking_profile("auth-rbac"));
    }

    #[test]
    fn accepts_json_documents() {
        let json = r#"{
            "version": 2,
            "retry": {"max_retries": 1},
            "defaults": {"default_profile": "p"},
            "tags_to_profiles": {},
            "profiles": {"p": {"blocking": false, "gates": ["g"]}},
            "gates": {"g": {"command": "true", "timeout_seconds": 5}},
            "pilot": {"include_task_ids": ["S01"]}
        }"#;
        let policy = Policy::parse(json).unwrap();
        assert_eq!(policy.version, 2);
        assert!(policy.is_pilot_task("S01"));
        assert!(!policy.is_pilot_task("S02"));
    }

    #[test]
    fn starter_policy_is_valid() {
        let policy = Policy::parse(STARTER_POLICY).unwrap();
        assert_eq!(policy.defaults.default_profile, "safe-baseline");
        assert!(policy.is_blocking_profile("auth-rbac"));
    }

    #[test]
    fn rejects_zero_max_retries() {
        let yaml = BASE.replace("max_retries: 3", "max_retries: 0");
        let err = Policy::parse(&yaml).unwrap_err();
        assert!(matches!(err, GatehouseError::InvalidMaxRetries(0)));
        assert!(err.is_config_error());
    }

    #[test]
    fn rejects_missing_retry_section() {
        let yaml = BASE.replace("retry:\n  max_retries: 3\n", "");
        let err = Policy::parse(&yaml).unwrap_err();
        assert!(matches!(err, GatehouseError::Yaml(_)));
        assert!(err.is_config_error());
    }

    #[test]
    fn rejects_unknown_default_profile() {
        let yaml = BASE.replace("default_profile: safe-baseline", "default_profile: nope");
        let err = Policy::parse(&yaml).unwrap_err();
        assert!(matches!(err, GatehouseError::UnknownDefaultProfile(p) if p == "nope"));
    }

    #[test]
    fn rejects_profile_with_missing_gate() {
        let yaml = BASE.replace("gates: [g2]", "gates: [g2, g9]");
        let err = Policy::parse(&yaml).unwrap_err();
        assert!(
            matches!(err, GatehouseError::UnknownGate { ref profile, ref gate } if profile == "auth-rbac" && gate == "g9")
        );
    }

    #[test]
    fn rejects_unknown_parent_profile() {
        let yaml = BASE.replace("extends: [safe-baseline]", "extends: [ghost]");
        let err = Policy::parse(&yaml).unwrap_err();
        assert!(matches!(err, GatehouseError::UnknownParentProfile { parent, .. } if parent == "ghost"));
    }

    #[test]
    fn rejects_tag_mapped_to_unknown_profile() {
        let yaml = BASE.replace("auth: [auth-rbac]", "auth: [auth-rbac, missing]");
        let err = Policy::parse(&yaml).unwrap_err();
        assert!(matches!(err, GatehouseError::UnknownTagProfile { tag, profile } if tag == "auth" && profile == "missing"));
    }

    #[test]
    fn rejects_empty_gate_command() {
        let yaml = BASE.replacen("command: \"true\"", "command: \"  \"", 1);
        let err = Policy::parse(&yaml).unwrap_err();
        assert!(matches!(err, GatehouseError::EmptyGateCommand(id) if id == "g1"));
    }

    #[test]
    fn rejects_unknown_gate_field() {
        let yaml = BASE.replace("blocking: true\nprofiles", "blocking: true\n    timout_seconds: 5\nprofiles");
        assert!(Policy::parse(&yaml).is_err(), "typo in gate field should be rejected");
    }

    #[test]
    fn rejects_self_extending_profile() {
        let yaml = BASE.replace(
            "  safe-baseline:\n    blocking: false\n",
            "  safe-baseline:\n    blocking: false\n    extends: [safe-baseline]\n",
        );
        let err = Policy::parse(&yaml).unwrap_err();
        match err {
            GatehouseError::ExtendsCycle(path) => {
                assert_eq!(path, vec!["safe-baseline", "safe-baseline"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn rejects_mutual_extends_cycle() {
        let yaml = BASE.replace(
            "  safe-baseline:\n    blocking: false\n",
            "  safe-baseline:\n    blocking: false\n    extends: [auth-rbac]\n",
        );
        let err = Policy::parse(&yaml).unwrap_err();
        assert!(err.is_config_error());
        match err {
            GatehouseError::ExtendsCycle(path) => {
                assert_eq!(path, vec!["auth-rbac", "safe-baseline", "auth-rbac"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn diamond_extends_is_not_a_cycle() {
        let yaml = r#"
retry: {max_retries: 2}
defaults: {default_profile: top}
tags_to_profiles: {}
gates:
  g: {command: "true"}
profiles:
  base: {blocking: false, gates: [g]}
  left: {blocking: false, gates: [g], extends: [base]}
  right: {blocking: false, gates: [g], extends: [base]}
  top: {blocking: true, gates: [g], extends: [left, right]}
"#;
        Policy::parse(yaml).unwrap();
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Policy::load(&dir.path().join("policy.yaml")).unwrap_err();
        assert!(matches!(err, GatehouseError::PolicyNotFound(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("policy.yaml");
        std::fs::write(&path, BASE).unwrap();
        let policy = Policy::load(&path).unwrap();
        assert_eq!(policy.profiles_for_tag("auth"), ["auth-rbac".to_string()]);
        assert!(policy.profiles_for_tag("nope").is_empty());
    }
}
