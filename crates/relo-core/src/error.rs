//! Error type for the orchestration core

use thiserror::Error;

/// Errors surfaced by the orchestrator and its supporting types. Client
/// errors pass through unchanged; the extra variants cover input
/// validation, which fails before any network call.
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error(transparent)]
    Jira(#[from] relo_jira::JiraError),

    #[error(transparent)]
    Github(#[from] relo_github::GithubError),

    #[error(transparent)]
    Notify(#[from] relo_notify::NotifyError),

    /// Version string is not a dotted numeric of at least two components
    #[error("invalid release version '{0}': expected dotted numerals like 11.44.2.12345")]
    InvalidVersion(String),

    /// A required input is neither configured nor derivable
    #[error("missing required input: {0}")]
    MissingInput(&'static str),

    /// CI output file could not be written
    #[error("cannot write run outputs to {path}: {source}")]
    OutputFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, ReleaseError>;
