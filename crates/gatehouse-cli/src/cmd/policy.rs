use crate::output::{list_cell, print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use gatehouse_core::paths;
use gatehouse_core::policy::Policy;
use gatehouse_core::supervisor::plan;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum PolicySubcommand {
    /// Load the policy and check every structural rule
    Validate {
        /// Policy file (default: .gatehouse/policy.yaml)
        #[arg(long)]
        policy_file: Option<PathBuf>,
    },

    /// Show the profiles and gates a set of tags resolves to
    Resolve {
        /// Comma-separated task tags (empty resolves to the default profile)
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Policy file (default: .gatehouse/policy.yaml)
        #[arg(long)]
        policy_file: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: PolicySubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        PolicySubcommand::Validate { policy_file } => validate(root, policy_file, json),
        PolicySubcommand::Resolve { tags, policy_file } => resolve(root, policy_file, &tags, json),
    }
}

pub(crate) fn load_policy(root: &Path, policy_file: Option<PathBuf>) -> anyhow::Result<Policy> {
    let path = policy_file
        .map(|p| root.join(p))
        .unwrap_or_else(|| paths::policy_path(root));
    Policy::load(&path).with_context(|| format!("invalid policy {}", path.display()))
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(root: &Path, policy_file: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let policy = load_policy(root, policy_file)?;

    if json {
        print_json(&serde_json::json!({
            "ok": true,
            "version": policy.version,
            "max_retries": policy.retry.max_retries,
            "default_profile": policy.defaults.default_profile,
            "profiles": policy.profiles.len(),
            "gates": policy.gates.len(),
        }))?;
    } else {
        println!(
            "policy OK: {} profile(s), {} gate(s), max_retries {}",
            policy.profiles.len(),
            policy.gates.len(),
            policy.retry.max_retries
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// resolve
// ---------------------------------------------------------------------------

fn resolve(
    root: &Path,
    policy_file: Option<PathBuf>,
    tags: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let policy = load_policy(root, policy_file)?;
    let tags: Vec<String> = tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    let plan = plan(&tags, &policy);

    if json {
        return print_json(&serde_json::json!({
            "tags": tags,
            "resolution": plan.resolution,
            "gates": plan.gates,
        }));
    }

    println!("profiles:  {}", list_cell(&plan.resolution.profiles));
    println!("blocking:  {}", list_cell(&plan.resolution.blocking_profiles));
    println!("advisory:  {}", list_cell(&plan.resolution.advisory_profiles));
    if !plan.resolution.unknown_tags.is_empty() {
        println!("unknown:   {}", list_cell(&plan.resolution.unknown_tags));
    }
    for warning in &plan.resolution.warnings {
        println!("warning:   {warning}");
    }
    println!();

    let rows = plan
        .gates
        .iter()
        .filter_map(|id| policy.gate(id).map(|g| (id, g)))
        .map(|(id, g)| {
            vec![
                id.clone(),
                if g.blocking { "yes" } else { "no" }.to_string(),
                g.timeout_seconds.to_string(),
                g.command.clone(),
            ]
        })
        .collect();
    print_table(&["GATE", "BLOCKING", "TIMEOUT", "COMMAND"], rows);
    Ok(())
}
