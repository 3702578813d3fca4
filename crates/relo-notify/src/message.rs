//! Branch freeze/unfreeze message rendering

use serde_json::{json, Value};
use tracing::info;

use crate::api::Notifier;
use crate::error::Result;

/// A branch lock state change worth telling the team about.
#[derive(Debug, Clone)]
pub struct LockNotice {
    /// Branch that changed state
    pub branch: String,
    /// Repository in `owner/name` form
    pub repository: String,
    /// true after a freeze, false after an unfreeze
    pub locked: bool,
    /// Link to the CI run that flipped the lock
    pub run_url: Option<String>,
}

impl LockNotice {
    pub fn new(branch: &str, repository: &str, locked: bool) -> Self {
        LockNotice {
            branch: branch.to_string(),
            repository: repository.to_string(),
            locked,
            run_url: None,
        }
    }

    pub fn with_run_url(mut self, run_url: &str) -> Self {
        self.run_url = Some(run_url.to_string());
        self
    }

    /// Attachment body: a colored section line plus, when the run link is
    /// known, a context block pointing at it.
    pub fn attachment(&self) -> Value {
        let (icon, action, color) = if self.locked {
            (":ice_cube:", "frozen", "warning")
        } else {
            (":sun_with_face:", "unfrozen", "good")
        };
        let mut blocks = vec![json!({
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!(
                    "{icon} Branch `{}` has been {action} in `{}`",
                    self.branch, self.repository
                ),
            },
        })];
        if let Some(run_url) = &self.run_url {
            blocks.push(json!({
                "type": "context",
                "elements": [{
                    "type": "mrkdwn",
                    "text": format!("*Run:* <{run_url}|View workflow run>"),
                }],
            }));
        }
        json!({ "color": color, "blocks": blocks })
    }
}

/// Channel names are accepted with or without the leading `#`.
pub fn normalize_channel(channel: &str) -> String {
    if channel.starts_with('#') {
        channel.to_string()
    } else {
        format!("#{channel}")
    }
}

/// Render and post a lock-change notice.
pub async fn notify_lock_change<N: Notifier + ?Sized>(
    notifier: &N,
    channel: &str,
    notice: &LockNotice,
) -> Result<()> {
    let channel = normalize_channel(channel);
    notifier.post_message(&channel, notice.attachment()).await?;
    info!(channel = %channel, branch = %notice.branch, locked = notice.locked,
        "lock notification sent");
    Ok(())
}
