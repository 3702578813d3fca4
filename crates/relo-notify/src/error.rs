//! Error types for the chat notifier

use thiserror::Error;

/// Errors that can occur while posting a notification.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Transport-level failure (connection, TLS, timeout)
    #[error("slack request failed: {0}")]
    Http(String),

    /// Non-success HTTP response
    #[error("slack api error: status {status}: {body}")]
    Api { status: u16, body: String },

    /// HTTP 200 but the body carried `"ok": false`
    #[error("slack rejected the message: {0}")]
    Rejected(String),

    /// Required environment variable is missing
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Http(err.to_string())
    }
}

/// Result type for notification operations
pub type Result<T> = std::result::Result<T, NotifyError>;
