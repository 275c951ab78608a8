//! Tag → profile → gate resolution.

use crate::policy::Policy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileResolution {
    /// Inheritance-expanded, most-general first, no duplicates.
    pub profiles: Vec<String>,
    pub blocking_profiles: Vec<String>,
    pub advisory_profiles: Vec<String>,
    pub unknown_tags: Vec<String>,
    pub warnings: Vec<String>,
}

impl ProfileResolution {
    pub fn has_blocking_profile(&self) -> bool {
        !self.blocking_profiles.is_empty()
    }
}

/// Insertion-ordered set of profile names.
#[derive(Default)]
struct OrderedProfiles {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl OrderedProfiles {
    fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    fn insert(&mut self, name: &str) {
        if self.seen.insert(name.to_string()) {
            self.order.push(name.to_string());
        }
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Add `profile` and its `extends` ancestors to `acc`, ancestors first.
///
/// Explicit post-order DFS. A profile already in `acc` is not revisited, and
/// a profile currently on the stack is skipped, so the walk visits each
/// profile at most once even if the policy slipped past cycle validation.
fn expand_profile(profile: &str, policy: &Policy, acc: &mut OrderedProfiles) {
    if acc.contains(profile) || policy.profile(profile).is_none() {
        return;
    }

    let mut on_stack: HashSet<&str> = HashSet::new();
    let mut stack: Vec<(&str, usize)> = vec![(profile, 0)];
    on_stack.insert(profile);

    while let Some(&(name, next)) = stack.last() {
        let parents = policy
            .profile(name)
            .map(|p| p.extends.as_slice())
            .unwrap_or(&[]);

        match parents.get(next) {
            Some(parent) => {
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                let parent = parent.as_str();
                if !acc.contains(parent)
                    && !on_stack.contains(parent)
                    && policy.profile(parent).is_some()
                {
                    on_stack.insert(parent);
                    stack.push((parent, 0));
                }
            }
            None => {
                acc.insert(name);
                on_stack.remove(name);
                stack.pop();
            }
        }
    }
}

/// Resolve a task's tags into profiles.
///
/// Unknown tags are recorded with a warning and otherwise ignored. When no
/// tag yields a profile, the policy's default profile is used instead.
pub fn resolve(tags: &[String], policy: &Policy) -> ProfileResolution {
    let mut selected = OrderedProfiles::default();
    let mut unknown_tags = Vec::new();
    let mut warnings = Vec::new();

    for tag in tags {
        let mapped = policy.profiles_for_tag(tag);
        if mapped.is_empty() {
            tracing::warn!(tag = %tag, "unknown task tag");
            unknown_tags.push(tag.clone());
            warnings.push(format!("Unknown task tag: {tag}"));
            continue;
        }
        for profile in mapped {
            expand_profile(profile, policy, &mut selected);
        }
    }

    if selected.is_empty() {
        expand_profile(&policy.defaults.default_profile, policy, &mut selected);
    }

    let profiles = selected.order;
    let (blocking_profiles, advisory_profiles): (Vec<String>, Vec<String>) = profiles
        .iter()
        .cloned()
        .partition(|p| policy.is_blocking_profile(p));

    ProfileResolution {
        profiles,
        blocking_profiles,
        advisory_profiles,
        unknown_tags,
        warnings,
    }
}

/// Flatten each profile's gates in profile order, keeping the first
/// occurrence of every gate ID.
pub fn resolve_gates(profiles: &[String], policy: &Policy) -> Vec<String> {
    let mut seen = HashSet::new();
    profiles
        .iter()
        .filter_map(|p| policy.profile(p))
        .flat_map(|p| p.gates.iter())
        .filter(|g| seen.insert(g.as_str()))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = r#"
retry: {max_retries: 3}
defaults: {default_profile: safe-baseline}
tags_to_profiles:
  auth: [auth-rbac]
  rbac: [auth-rbac]
  security: [security]
  billing: [billing, security]
gates:
  g1: {command: "true"}
  auth-flow-tests: {command: "true"}
  permission-matrix-tests: {command: "true"}
  security-lite: {command: "true", blocking: true}
  webhook-replay: {command: "true"}
profiles:
  safe-baseline:
    blocking: false
    gates: [g1]
  auth-rbac:
    blocking: true
    extends: [safe-baseline]
    gates: [auth-flow-tests, permission-matrix-tests, security-lite]
  security:
    blocking: true
    extends: [safe-baseline]
    gates: [security-lite, g1]
  billing:
    blocking: false
    extends: [security]
    gates: [webhook-replay]
"#;

    fn policy() -> Policy {
        Policy::parse(POLICY).unwrap()
    }

    fn tags(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn untagged_uses_default_profile() {
        let resolution = resolve(&[], &policy());
        assert_eq!(resolution.profiles, vec!["safe-baseline"]);
        assert!(resolution.blocking_profiles.is_empty());
        assert_eq!(resolution.advisory_profiles, vec!["safe-baseline"]);
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn tagged_resolves_ancestors_first() {
        let resolution = resolve(&tags(&["auth", "rbac"]), &policy());
        assert_eq!(resolution.profiles, vec!["safe-baseline", "auth-rbac"]);
        assert_eq!(resolution.blocking_profiles, vec!["auth-rbac"]);
        assert_eq!(resolution.advisory_profiles, vec!["safe-baseline"]);
        assert!(resolution.has_blocking_profile());
    }

    #[test]
    fn unknown_tag_warns_and_falls_back() {
        let resolution = resolve(&tags(&["unknown-tag"]), &policy());
        assert_eq!(resolution.unknown_tags, vec!["unknown-tag"]);
        assert_eq!(resolution.warnings.len(), 1);
        assert!(resolution.warnings[0].contains("unknown-tag"));
        assert_eq!(resolution.profiles, vec!["safe-baseline"]);
    }

    const DIAMOND: &str = r#"
retry: {max_retries: 1}
defaults: {default_profile: release}
tags_to_profiles:
  api: [api]
gates:
  lint: {command: "true"}
  unit: {command: "true"}
  contract: {command: "true"}
  smoke: {command: "true"}
profiles:
  base: {blocking: false, gates: [lint]}
  api: {blocking: false, extends: [base], gates: [contract]}
  tests: {blocking: true, extends: [base], gates: [unit]}
  release: {blocking: false, extends: [api, tests], gates: [smoke]}
"#;

    #[test]
    fn fallback_expands_default_profile_ancestors() {
        let policy = Policy::parse(DIAMOND).unwrap();
        let expected = vec!["base", "api", "tests", "release"];

        let untagged = resolve(&[], &policy);
        assert_eq!(untagged.profiles, expected);
        assert!(untagged.unknown_tags.is_empty());

        let unmapped = resolve(&tags(&["x", "y"]), &policy);
        assert_eq!(unmapped.profiles, expected);
        assert_eq!(unmapped.unknown_tags, vec!["x", "y"]);
        assert_eq!(
            unmapped.warnings,
            vec!["Unknown task tag: x", "Unknown task tag: y"]
        );
        assert_eq!(unmapped.blocking_profiles, vec!["tests"]);
        assert_eq!(
            resolve_gates(&unmapped.profiles, &policy),
            vec!["lint", "contract", "unit", "smoke"]
        );
    }

    #[test]
    fn unknown_tag_alongside_known_tag_does_not_add_default_twice() {
        let resolution = resolve(&tags(&["nope", "security"]), &policy());
        assert_eq!(resolution.unknown_tags, vec!["nope"]);
        assert_eq!(resolution.profiles, vec!["safe-baseline", "security"]);
    }

    #[test]
    fn multi_level_inheritance_is_topological() {
        let resolution = resolve(&tags(&["billing"]), &policy());
        assert_eq!(
            resolution.profiles,
            vec!["safe-baseline", "security", "billing"]
        );
        // blocking-ness is intrinsic, not inherited from `security`
        assert_eq!(resolution.blocking_profiles, vec!["security"]);
        assert_eq!(
            resolution.advisory_profiles,
            vec!["safe-baseline", "billing"]
        );
    }

    #[test]
    fn gates_are_deduplicated_in_first_seen_order() {
        let policy = policy();
        let resolution = resolve(&tags(&["auth", "security", "billing"]), &policy);
        let gates = resolve_gates(&resolution.profiles, &policy);
        assert_eq!(
            gates,
            vec![
                "g1",
                "auth-flow-tests",
                "permission-matrix-tests",
                "security-lite",
                "webhook-replay"
            ]
        );
        let unique: HashSet<&String> = gates.iter().collect();
        assert_eq!(unique.len(), gates.len());
    }

    #[test]
    fn every_gate_belongs_to_a_resolved_profile() {
        let policy = policy();
        for tag_set in [vec![], tags(&["auth"]), tags(&["billing", "rbac"]), tags(&["x"])] {
            let resolution = resolve(&tag_set, &policy);
            for gate in resolve_gates(&resolution.profiles, &policy) {
                assert!(
                    resolution
                        .profiles
                        .iter()
                        .any(|p| policy.profile(p).unwrap().gates.contains(&gate)),
                    "gate {gate} has no owning profile"
                );
            }
        }
    }

    #[test]
    fn expansion_terminates_on_unvalidated_cycle() {
        let mut policy = policy();
        policy
            .profiles
            .get_mut("safe-baseline")
            .unwrap()
            .extends
            .push("auth-rbac".to_string());
        let resolution = resolve(&tags(&["auth"]), &policy);
        assert_eq!(resolution.profiles.len(), 2);
        assert!(resolution.profiles.contains(&"auth-rbac".to_string()));
        assert!(resolution.profiles.contains(&"safe-baseline".to_string()));
    }
}
