//! In-memory fake of the chat notifier (testing only)
//!
//! `FakeNotifier` records every posted message for inspection and can be
//! toggled to refuse messages, exercising the best-effort paths.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::Notifier;
use crate::error::{NotifyError, Result};

#[derive(Debug, Default)]
struct FakeNotifierState {
    messages: Vec<(String, Value)>,
    reject_with: Option<String>,
}

/// Records (channel, attachment) pairs instead of talking to Slack.
#[derive(Debug, Default)]
pub struct FakeNotifier {
    state: Mutex<FakeNotifierState>,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent post fail like a Slack-side refusal.
    pub fn reject_with(&self, error: &str) {
        self.state.lock().unwrap().reject_with = Some(error.to_string());
    }

    /// Everything posted so far, in order.
    pub fn messages(&self) -> Vec<(String, Value)> {
        self.state.lock().unwrap().messages.clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn post_message(&self, channel: &str, attachment: Value) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = &state.reject_with {
            return Err(NotifyError::Rejected(error.clone()));
        }
        state
            .messages
            .push((channel.to_string(), attachment));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_records_messages_in_order() {
        let notifier = FakeNotifier::new();
        notifier
            .post_message("#a", json!({"color": "warning"}))
            .await
            .unwrap();
        notifier
            .post_message("#b", json!({"color": "good"}))
            .await
            .unwrap();
        let sent = notifier.messages();
        assert_eq!(sent[0].0, "#a");
        assert_eq!(sent[1].0, "#b");
    }

    #[tokio::test]
    async fn test_rejection_toggle() {
        let notifier = FakeNotifier::new();
        notifier.reject_with("channel_not_found");
        let err = notifier
            .post_message("#a", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Rejected(reason) if reason == "channel_not_found"));
    }
}
