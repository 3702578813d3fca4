//! Run report: per-step records and the markdown summary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::output::RunOutputs;

/// How a single step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl StepStatus {
    fn label(&self) -> &'static str {
        match self {
            StepStatus::Succeeded => "ok",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        }
    }
}

/// One orchestration step as it actually ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: String,
    pub status: StepStatus,
    /// Failure text, skip reason, or a short success note
    pub detail: Option<String>,
    pub duration_ms: u64,
}

/// Everything a run did: step records in execution order plus the
/// artifacts it created. Artifacts are never retracted on failure, so the
/// outputs of a failed run list what exists and needs attention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub steps: Vec<StepRecord>,
    pub outputs: RunOutputs,
}

impl RunReport {
    pub fn new() -> Self {
        RunReport {
            started_at: Utc::now(),
            steps: Vec::new(),
            outputs: RunOutputs::new(),
        }
    }

    pub fn succeeded(&mut self, step: &str, duration_ms: u64) {
        self.steps.push(StepRecord {
            step: step.to_string(),
            status: StepStatus::Succeeded,
            detail: None,
            duration_ms,
        });
    }

    pub fn failed(&mut self, step: &str, detail: &str, duration_ms: u64) {
        self.steps.push(StepRecord {
            step: step.to_string(),
            status: StepStatus::Failed,
            detail: Some(detail.to_string()),
            duration_ms,
        });
    }

    pub fn skipped(&mut self, step: &str, reason: &str) {
        self.steps.push(StepRecord {
            step: step.to_string(),
            status: StepStatus::Skipped,
            detail: Some(reason.to_string()),
            duration_ms: 0,
        });
    }

    /// A run succeeds when no step failed.
    pub fn success(&self) -> bool {
        self.steps.iter().all(|s| s.status != StepStatus::Failed)
    }

    /// First failed step, if any.
    pub fn failed_step(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }

    pub fn passed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Succeeded)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .count()
    }

    /// Whether a step with this name was recorded at all.
    pub fn has_step(&self, step: &str) -> bool {
        self.steps.iter().any(|s| s.step == step)
    }

    /// Markdown summary for CI job summaries and PR comments.
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Release run summary\n\n");
        match self.failed_step() {
            None => out.push_str("Result: **success**\n\n"),
            Some(failed) => {
                out.push_str(&format!("Result: **failed** at `{}`\n\n", failed.step))
            }
        }

        out.push_str("## Steps\n");
        for record in &self.steps {
            match &record.detail {
                Some(detail) => out.push_str(&format!(
                    "- [{}] {}: {}\n",
                    record.status.label(),
                    record.step,
                    detail
                )),
                None => out.push_str(&format!(
                    "- [{}] {} ({} ms)\n",
                    record.status.label(),
                    record.step,
                    record.duration_ms
                )),
            }
        }

        if !self.outputs.is_empty() {
            out.push_str("\n## Outputs\n");
            for (key, value) in self.outputs.pairs() {
                out.push_str(&format!("- `{key}` = {value}\n"));
            }
        }
        out
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_requires_no_failed_step() {
        let mut report = RunReport::new();
        report.succeeded("resolve-version", 3);
        report.skipped("lock-branch", "disabled");
        assert!(report.success());

        report.failed("publish-release", "duplicate title", 10);
        assert!(!report.success());
        assert_eq!(report.failed_step().unwrap().step, "publish-release");
        assert_eq!(report.passed_count(), 1);
        assert_eq!(report.failed_count(), 1);
    }

    #[test]
    fn test_markdown_renders_stable_output() {
        let mut report = RunReport::new();
        report.succeeded("resolve-version", 3);
        report.failed("publish-release", "duplicate title", 10);
        report.outputs.set("ticket_key", "REL-100");

        let md = report.render_markdown();
        assert!(md.starts_with("# Release run summary\n\n"));
        assert!(md.contains("Result: **failed** at `publish-release`"));
        assert!(md.contains("- [ok] resolve-version (3 ms)\n"));
        assert!(md.contains("- [failed] publish-release: duplicate title\n"));
        assert!(md.contains("- `ticket_key` = REL-100\n"));
    }
}
