//! Run outputs in CI `key=value` form
//!
//! Each step contributes the identifiers it produced (ticket keys,
//! release URL, version names). The collected pairs are printed for
//! humans and appended to the CI output file so follow-up workflow steps
//! can pick them up.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReleaseError, Result};

/// Ordered `key=value` pairs produced by a run. Insertion order is
/// preserved; keys are not deduplicated (CI output files are last-write-
/// wins anyway).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOutputs {
    pairs: Vec<(String, String)>,
}

impl RunOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.pairs.push((key.to_string(), value.to_string()));
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// One `key=value` line per pair, each newline-terminated.
    pub fn lines(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.pairs {
            out.push_str(&format!("{key}={value}\n"));
        }
        out
    }

    /// Append the lines to a `GITHUB_OUTPUT`-style file, creating it when
    /// absent. Existing content is never truncated.
    pub fn append_to(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| ReleaseError::OutputFile {
                path: path.display().to_string(),
                source,
            })?;
        file.write_all(self.lines().as_bytes())
            .map_err(|source| ReleaseError::OutputFile {
                path: path.display().to_string(),
                source,
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_preserve_insertion_order() {
        let mut outputs = RunOutputs::new();
        outputs.set("ticket_key", "REL-100");
        outputs.set("release_url", "https://gh.test/releases/1");
        assert_eq!(
            outputs.lines(),
            "ticket_key=REL-100\nrelease_url=https://gh.test/releases/1\n"
        );
    }

    #[test]
    fn test_append_to_keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("github_output");
        std::fs::write(&path, "earlier=1\n").unwrap();

        let mut outputs = RunOutputs::new();
        outputs.set("ticket_key", "REL-100");
        outputs.append_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "earlier=1\nticket_key=REL-100\n");
    }

    #[test]
    fn test_append_to_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh_output");

        let mut outputs = RunOutputs::new();
        outputs.set("version", "11.44.2");
        outputs.append_to(&path).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "version=11.44.2\n");
    }
}
