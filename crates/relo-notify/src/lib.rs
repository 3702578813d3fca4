//! relo-notify - Chat notifications for release runs
//!
//! One message shape today: the branch freeze/unfreeze notice posted when
//! the release run locks or unlocks the target branch. Posting goes through
//! the `Notifier` trait; `SlackClient` is the reqwest implementation and
//! `fakes::FakeNotifier` the in-memory one for tests.

pub mod api;
pub mod client;
mod error;
pub mod fakes;
pub mod message;

pub use api::Notifier;
pub use client::{SlackClient, SlackConfig, SLACK_API_URL};
pub use error::{NotifyError, Result};
pub use message::{normalize_channel, notify_lock_change, LockNotice};
