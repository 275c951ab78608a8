use anyhow::Context;
use gatehouse_core::{io, paths, policy::STARTER_POLICY};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing gatehouse in: {}", root.display());

    let policy_path = paths::policy_path(root);
    let created = io::write_if_missing(&policy_path, STARTER_POLICY.as_bytes())
        .with_context(|| format!("failed to write {}", policy_path.display()))?;
    if created {
        println!("  created: {}", paths::POLICY_FILE);
    } else {
        println!("  exists:  {}", paths::POLICY_FILE);
    }

    if !paths::tasks_path(root).exists() {
        println!("  note:    no {} yet; gates run against its checklist", paths::TASKS_FILE);
    }
    Ok(())
}
