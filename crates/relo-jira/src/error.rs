//! Error types for the issue-tracker client

use thiserror::Error;

/// Errors that can occur while talking to the issue tracker or while
/// enforcing ticket/version lifecycle rules on top of it.
#[derive(Error, Debug)]
pub enum JiraError {
    /// Transport-level failure (connection, TLS, timeout)
    #[error("jira request failed: {0}")]
    Http(String),

    /// Non-success response from the tracker
    #[error("jira api error: status {status}: {body}")]
    Api { status: u16, body: String },

    /// Ticket referenced by key does not exist
    #[error("ticket not found: {0}")]
    TicketNotFound(String),

    /// The ticket a new integration ticket should link to does not exist
    #[error("linked ticket not found: {0}")]
    LinkedTicketNotFound(String),

    /// Requested status is not reachable from the ticket's current status
    #[error("no transition to '{target}' available on {ticket} (available: {available:?})")]
    InvalidTransition {
        ticket: String,
        target: String,
        available: Vec<String>,
    },

    /// No tracker account matches the given email
    #[error("no jira user matches '{0}'")]
    UserNotFound(String),

    /// Named version does not exist in the project
    #[error("project {project} has no version named '{name}'")]
    VersionNotFound { project: String, name: String },

    /// Named version exists but is already released
    #[error("version '{name}' of project {project} is already released")]
    AlreadyReleased { project: String, name: String },

    /// Auto-selection found no unreleased version
    #[error("project {0} has no unreleased version")]
    NoUnreleasedVersion(String),

    /// Auto-selection found more than one unreleased version
    #[error("project {project} has several unreleased versions, name one explicitly: {candidates:?}")]
    AmbiguousUnreleasedVersion {
        project: String,
        candidates: Vec<String>,
    },

    /// Project create-metadata exposes no issue types
    #[error("no issue type available in project {0}")]
    NoIssueType(String),

    /// Linked-ticket discovery expects exactly one match per project
    #[error("expected exactly one linked {project} ticket on {ticket}, found {found}")]
    LinkedTicketCount {
        ticket: String,
        project: String,
        found: usize,
    },

    /// Version name cannot be auto-incremented
    #[error("cannot increment version name '{0}': last component is not numeric")]
    VersionIncrement(String),

    /// Required environment variable is missing
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    /// JSON (de)serialization error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for JiraError {
    fn from(err: reqwest::Error) -> Self {
        JiraError::Http(err.to_string())
    }
}

/// Result type for issue-tracker operations
pub type Result<T> = std::result::Result<T, JiraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_the_ticket() {
        let err = JiraError::InvalidTransition {
            ticket: "REL-100".to_string(),
            target: "Technical Release Done".to_string(),
            available: vec!["Start Progress".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("REL-100"));
        assert!(msg.contains("Technical Release Done"));
        assert!(msg.contains("Start Progress"));
    }

    #[test]
    fn test_ambiguous_version_lists_candidates() {
        let err = JiraError::AmbiguousUnreleasedVersion {
            project: "SONARIAC".to_string(),
            candidates: vec!["11.44".to_string(), "11.45".to_string()],
        };
        assert!(err.to_string().contains("11.45"));
    }
}
