//! Error types for the source-host client

use thiserror::Error;

/// Errors from the source host or from the release policies layered on it.
#[derive(Error, Debug)]
pub enum GithubError {
    /// Transport-level failure (connection, TLS, timeout)
    #[error("github request failed: {0}")]
    Http(String),

    /// Non-success response
    #[error("github api error: status {status}: {body}")]
    Api { status: u16, body: String },

    /// No commit status matched the expected context
    #[error("no '{context_prefix}' status found on branch {branch}")]
    StatusNotFound {
        branch: String,
        context_prefix: String,
    },

    /// Status description carries no quoted version token
    #[error("no version token in status description: {description:?}")]
    VersionParse { description: String },

    /// Quoted version token was empty
    #[error("empty version token in '{context}' status")]
    EmptyVersion { context: String },

    /// Releasability status exists but is not successful
    #[error("branch {branch} is not releasable: {state} ({detail})")]
    NotReleasable {
        branch: String,
        state: String,
        detail: String,
    },

    /// A published release with the target title already exists
    #[error("release '{title}' already published: {url}")]
    DuplicateRelease { title: String, url: String },

    /// Dispatched run never showed up in the run listing
    #[error("no run of '{workflow}' appeared within {waited_secs}s of dispatch")]
    DispatchTimeout { workflow: String, waited_secs: u64 },

    /// Run never reached a terminal state within the ceiling
    #[error("run {run_id} did not complete within {waited_secs}s: {url}")]
    RunTimeout {
        run_id: u64,
        url: String,
        waited_secs: u64,
    },

    /// Run completed with a non-success conclusion
    #[error("downstream run concluded '{conclusion}': {url}")]
    RunFailed { conclusion: String, url: String },

    /// Credential cannot write branch protection
    #[error("not allowed to change protection of branch {branch}")]
    PermissionDenied { branch: String },

    /// JSON (de)serialization error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for GithubError {
    fn from(err: reqwest::Error) -> Self {
        GithubError::Http(err.to_string())
    }
}

/// Result type for source-host operations
pub type Result<T> = std::result::Result<T, GithubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_release_names_url() {
        let err = GithubError::DuplicateRelease {
            title: "SonarIaC 11.44".to_string(),
            url: "https://github.test/releases/9".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("SonarIaC 11.44"));
        assert!(msg.contains("releases/9"));
    }
}
