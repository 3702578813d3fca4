//! Issue-tracker API trait
//!
//! `JiraApi` is the seam between the lifecycle operations and the concrete
//! tracker. The production implementation is `JiraClient` (reqwest); an
//! in-memory fake for tests lives in the `fakes` module.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::model::{CreatedTicket, IssueType, ProjectVersion, Ticket, Transition, UserAccount};

/// Raw tracker operations, one method per REST endpoint the lifecycle
/// operations need. Implementations must not add retry loops; callers own
/// the retry policy.
#[async_trait]
pub trait JiraApi: Send + Sync {
    /// Base URL of the tracker instance, without a trailing slash.
    fn server_url(&self) -> &str;

    /// Human-facing URL of a ticket.
    fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.server_url(), key)
    }

    /// Fetch a ticket by key. Missing tickets are `TicketNotFound`.
    async fn get_ticket(&self, key: &str) -> Result<Ticket>;

    /// Create a ticket from a raw `fields` object and return its key/URL.
    async fn create_ticket(&self, fields: Map<String, Value>) -> Result<CreatedTicket>;

    /// Update fields on an existing ticket.
    async fn update_fields(&self, key: &str, fields: Map<String, Value>) -> Result<()>;

    /// Transitions currently available on a ticket.
    async fn available_transitions(&self, key: &str) -> Result<Vec<Transition>>;

    /// Execute one of the available transitions by id.
    async fn apply_transition(&self, key: &str, transition_id: &str) -> Result<()>;

    /// Set the assignee of a ticket to the given account id.
    async fn assign_ticket(&self, key: &str, account_id: &str) -> Result<()>;

    /// Search user accounts (email or display name query).
    async fn find_users(&self, query: &str) -> Result<Vec<UserAccount>>;

    /// Create a typed link between two tickets. `inward_key` is the new
    /// ticket, `outward_key` the one it points at.
    async fn create_link(&self, link_type: &str, inward_key: &str, outward_key: &str)
        -> Result<()>;

    /// All versions of a project, released and unreleased.
    async fn project_versions(&self, project_key: &str) -> Result<Vec<ProjectVersion>>;

    /// Create a named version in a project.
    async fn create_version(&self, project_key: &str, name: &str) -> Result<ProjectVersion>;

    /// Mark a version released/unreleased, optionally stamping the date.
    async fn update_version(
        &self,
        version_id: &str,
        released: bool,
        release_date: Option<&str>,
    ) -> Result<ProjectVersion>;

    /// Issue types available for creation in a project.
    async fn project_issue_types(&self, project_key: &str) -> Result<Vec<IssueType>>;

    /// Run a JQL search, following pagination, returning all matches.
    async fn search_issues(&self, jql: &str, fields: &[&str]) -> Result<Vec<Ticket>>;
}
