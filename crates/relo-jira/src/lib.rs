//! relo-jira - Issue-tracker side of the release orchestration
//!
//! Provides the tracker client and the lifecycle operations built on it:
//! - `tickets`: release ticket creation, transitions, reassignment,
//!   integration tickets and linked-ticket discovery
//! - `versions`: unreleased-version resolution and the
//!   release-then-create-next rollover
//! - `notes`: release-notes rendering from fixed issues
//!
//! All operations go through the `JiraApi` trait; `JiraClient` is the
//! reqwest implementation and `fakes::FakeJira` the in-memory one for
//! tests.

pub mod api;
pub mod client;
mod error;
pub mod fakes;
pub mod model;
pub mod notes;
pub mod tickets;
pub mod versions;

pub use api::JiraApi;
pub use client::{instance_url, JiraClient, JiraConfig, JIRA_PROD_URL, JIRA_SANDBOX_URL};
pub use error::{JiraError, Result};
pub use model::{CreatedTicket, ProjectVersion, Ticket, Transition, UserAccount};
pub use notes::{ReleaseNotes, DEFAULT_TYPE_ORDER, EMPTY_NOTES};
pub use tickets::{
    IntegrationTicketInput, ReleaseTicketInput, DEFAULT_LINK_TYPE, RELEASE_ISSUE_TYPE,
    RELEASE_PROJECT_KEY, STATUS_START_PROGRESS, STATUS_TECHNICAL_RELEASE_DONE,
};
pub use versions::{NotesVersion, VersionRollover};
