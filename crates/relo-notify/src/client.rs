//! reqwest-backed Slack client
//!
//! Posts through `chat.postMessage` with a bot token. Slack answers HTTP
//! 200 even for refused messages, so success requires both the status code
//! and `"ok": true` in the body.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::api::Notifier;
use crate::error::{NotifyError, Result};

/// Slack Web API root.
pub const SLACK_API_URL: &str = "https://slack.com/api";

/// Connection settings for the Slack Web API.
#[derive(Debug, Clone)]
pub struct SlackConfig {
    /// API root without a trailing slash
    pub base_url: String,
    /// Bot token with `chat:write`
    pub token: String,
}

impl SlackConfig {
    pub fn new(base_url: &str, token: &str) -> Self {
        SlackConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Read the bot token from `SLACK_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let token =
            std::env::var("SLACK_TOKEN").map_err(|_| NotifyError::MissingEnv("SLACK_TOKEN"))?;
        Ok(Self::new(SLACK_API_URL, &token))
    }
}

/// Chat notifier over HTTP.
pub struct SlackClient {
    config: SlackConfig,
    http_client: reqwest::Client,
}

impl SlackClient {
    pub fn new(config: SlackConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent("relo-notify/0.1.0")
            .build()
            .expect("Failed to create HTTP client");

        SlackClient {
            config,
            http_client,
        }
    }
}

#[async_trait]
impl Notifier for SlackClient {
    async fn post_message(&self, channel: &str, attachment: Value) -> Result<()> {
        let url = format!("{}/chat.postMessage", self.config.base_url);
        let payload = json!({
            "channel": channel,
            "attachments": [attachment],
        });
        let resp = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if status.as_u16() != 200 {
            return Err(NotifyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
        if parsed["ok"] != json!(true) {
            let reason = parsed["error"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            return Err(NotifyError::Rejected(reason));
        }

        debug!(channel = %channel, "message posted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_strips_trailing_slash() {
        let config = SlackConfig::new("https://slack.com/api/", "xoxb-1");
        assert_eq!(config.base_url, "https://slack.com/api");
    }
}
