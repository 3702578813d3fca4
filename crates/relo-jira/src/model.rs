//! Wire models for the issue-tracker REST API
//!
//! Only the fields the lifecycle operations read are modelled; everything
//! else in the tracker's payloads is ignored on deserialization.

use serde::{Deserialize, Serialize};

/// A ticket as returned by the issue endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: TicketFields,
}

/// Subset of ticket fields used by the lifecycle operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketFields {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub status: Option<TicketStatus>,
    #[serde(rename = "issuetype", default)]
    pub issue_type: Option<IssueType>,
    #[serde(rename = "issuelinks", default)]
    pub issue_links: Vec<IssueLink>,
}

/// Current workflow status of a ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketStatus {
    pub name: String,
}

/// An issue type exposed by a project's create metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueType {
    pub id: String,
    pub name: String,
}

/// A workflow transition currently available on a ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
}

/// One entry of a ticket's `issuelinks` field. Exactly one of
/// `inward_issue`/`outward_issue` is set depending on link direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueLink {
    #[serde(rename = "inwardIssue", default)]
    pub inward_issue: Option<LinkedIssue>,
    #[serde(rename = "outwardIssue", default)]
    pub outward_issue: Option<LinkedIssue>,
}

impl IssueLink {
    /// Key of the ticket on the far side of the link, whichever
    /// direction it points.
    pub fn other_key(&self) -> Option<&str> {
        self.inward_issue
            .as_ref()
            .or(self.outward_issue.as_ref())
            .map(|issue| issue.key.as_str())
    }
}

/// The far side of an issue link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedIssue {
    pub key: String,
}

/// A project-scoped version entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectVersion {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub released: bool,
    #[serde(rename = "releaseDate", default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
}

/// A tracker user account, as returned by user search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    #[serde(rename = "accountId")]
    pub account_id: String,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "emailAddress", default)]
    pub email: Option<String>,
}

/// Key and browse URL of a freshly created ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTicket {
    pub key: String,
    pub url: String,
}
