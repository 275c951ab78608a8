//! File writes for policies, run records and reports.
//!
//! Every artifact a run produces goes through [`atomic_write`], so a report
//! reader (or a CI upload step) never sees a truncated JSON record even if
//! the supervisor is killed mid-run.

use crate::error::Result;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

fn ensure_parent(path: &Path) -> Result<&Path> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    Ok(parent)
}

/// Replace `path` with `data` via a sibling tempfile + rename.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = ensure_parent(path)?;
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(data)?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Used by `init` so a hand-edited policy is never overwritten.
/// Returns whether the file was created.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    atomic_write(path, data)?;
    Ok(true)
}

/// Append a report fragment, e.g. the run summary onto
/// `$GITHUB_STEP_SUMMARY`, which other steps of the same job also write to.
pub fn append_text(path: &Path, text: &str) -> Result<()> {
    ensure_parent(path)?;
    let mut f = fs::OpenOptions::new().create(true).append(true).open(path)?;
    f.write_all(text.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/run.json");
        atomic_write(&path, b"{}").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn write_if_missing_skips_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("policy.yaml");
        std::fs::write(&path, b"original").unwrap();
        assert!(!write_if_missing(&path, b"new").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }

    #[test]
    fn append_text_accumulates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("step-summary.md");
        append_text(&path, "one\n").unwrap();
        append_text(&path, "two\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn append_text_creates_missing_parent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ci/step-summary.md");
        append_text(&path, "# Summary\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Summary\n");
    }
}
