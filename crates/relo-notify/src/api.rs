//! Chat-notifier trait
//!
//! `Notifier` is the seam between release operations and the concrete chat
//! backend. The production implementation is `SlackClient` (reqwest); an
//! in-memory fake for tests lives in the `fakes` module.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Posts one message attachment to a channel. Channel names are passed
/// through verbatim; callers normalize them first (see
/// `message::normalize_channel`).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post_message(&self, channel: &str, attachment: Value) -> Result<()>;
}
