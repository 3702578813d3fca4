//! Wire models for the source-host REST API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One commit-status entry, newest first in listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitStatus {
    pub state: String,
    pub context: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A release record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    pub tag_name: String,
    pub target_commitish: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    pub html_url: String,
}

/// Payload for creating a release.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRelease {
    pub tag_name: String,
    pub target_commitish: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub draft: bool,
    pub prerelease: bool,
}

// ---------------------------------------------------------------------------
// Branch protection
// ---------------------------------------------------------------------------

/// A single `{ "enabled": bool }` wrapper used all over the protection
/// payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnabledFlag {
    pub enabled: bool,
}

/// Required status checks section (read shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredStatusChecks {
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub contexts: Vec<String>,
}

/// Required pull-request reviews section (read shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredPullRequestReviews {
    #[serde(default)]
    pub dismiss_stale_reviews: bool,
    #[serde(default)]
    pub require_code_owner_reviews: bool,
    #[serde(default)]
    pub required_approving_review_count: Option<u32>,
}

/// Push restrictions section (read shape).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restrictions {
    #[serde(default)]
    pub users: Vec<Actor>,
    #[serde(default)]
    pub teams: Vec<SlugRef>,
    #[serde(default)]
    pub apps: Vec<SlugRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlugRef {
    pub slug: String,
}

/// Branch protection as read from the API. Every section is optional;
/// a branch without protection is represented as `None` upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchProtection {
    #[serde(default)]
    pub required_status_checks: Option<RequiredStatusChecks>,
    #[serde(default)]
    pub enforce_admins: Option<EnabledFlag>,
    #[serde(default)]
    pub required_pull_request_reviews: Option<RequiredPullRequestReviews>,
    #[serde(default)]
    pub restrictions: Option<Restrictions>,
    #[serde(default)]
    pub required_linear_history: Option<EnabledFlag>,
    #[serde(default)]
    pub allow_force_pushes: Option<EnabledFlag>,
    #[serde(default)]
    pub allow_deletions: Option<EnabledFlag>,
    #[serde(default)]
    pub block_creations: Option<EnabledFlag>,
    #[serde(default)]
    pub required_conversation_resolution: Option<EnabledFlag>,
    #[serde(default)]
    pub lock_branch: Option<EnabledFlag>,
    #[serde(default)]
    pub allow_fork_syncing: Option<EnabledFlag>,
}

impl BranchProtection {
    /// Current state of the lock flag, absent meaning unlocked.
    pub fn locked(&self) -> bool {
        self.lock_branch.as_ref().is_some_and(|f| f.enabled)
    }
}

/// Write shape of the protection update. The update endpoint requires the
/// four nullable sections to be present even when null, so none of them is
/// skipped during serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectionUpdate {
    pub required_status_checks: Option<StatusChecksUpdate>,
    pub enforce_admins: bool,
    pub required_pull_request_reviews: Option<ReviewsUpdate>,
    pub restrictions: Option<RestrictionsUpdate>,
    pub lock_branch: bool,
    pub required_linear_history: bool,
    pub allow_force_pushes: bool,
    pub allow_deletions: bool,
    pub block_creations: bool,
    pub required_conversation_resolution: bool,
    pub allow_fork_syncing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChecksUpdate {
    pub strict: bool,
    pub contexts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewsUpdate {
    pub dismiss_stale_reviews: bool,
    pub require_code_owner_reviews: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_approving_review_count: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RestrictionsUpdate {
    pub users: Vec<String>,
    pub teams: Vec<String>,
    pub apps: Vec<String>,
}

// ---------------------------------------------------------------------------
// Workflow runs
// ---------------------------------------------------------------------------

/// A workflow run as returned by the runs listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    pub status: String,
    #[serde(default)]
    pub conclusion: Option<String>,
    pub created_at: DateTime<Utc>,
    pub html_url: String,
    #[serde(default)]
    pub head_branch: Option<String>,
}

impl WorkflowRun {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protection_reads_partial_payload() {
        let payload = serde_json::json!({
            "required_status_checks": { "strict": true, "contexts": ["ci/test"] },
            "lock_branch": { "enabled": true }
        });
        let protection: BranchProtection = serde_json::from_value(payload).unwrap();
        assert!(protection.locked());
        assert!(protection.enforce_admins.is_none());
        assert_eq!(
            protection.required_status_checks.unwrap().contexts,
            vec!["ci/test".to_string()]
        );
    }

    #[test]
    fn test_update_serializes_null_sections() {
        let update = ProtectionUpdate {
            required_status_checks: None,
            enforce_admins: true,
            required_pull_request_reviews: None,
            restrictions: None,
            lock_branch: true,
            required_linear_history: true,
            allow_force_pushes: false,
            allow_deletions: false,
            block_creations: false,
            required_conversation_resolution: false,
            allow_fork_syncing: false,
        };
        let value = serde_json::to_value(&update).unwrap();
        assert!(value.get("required_status_checks").unwrap().is_null());
        assert!(value.get("restrictions").unwrap().is_null());
        assert_eq!(value["lock_branch"], true);
    }

    #[test]
    fn test_workflow_run_deserializes() {
        let run: WorkflowRun = serde_json::from_value(serde_json::json!({
            "id": 42,
            "status": "in_progress",
            "conclusion": null,
            "created_at": "2024-05-01T10:00:00Z",
            "html_url": "https://github.test/runs/42"
        }))
        .unwrap();
        assert!(!run.is_completed());
        assert!(run.conclusion.is_none());
    }
}
