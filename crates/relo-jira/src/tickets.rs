//! Ticket lifecycle operations
//!
//! Covers the release ticket ("Ask for release" in the REL project), its
//! status transitions and reassignment, and the integration tickets opened
//! in downstream product projects. Link creation and description updates
//! are best-effort: some projects restrict those fields and the ticket is
//! still valid without them.

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::api::JiraApi;
use crate::error::{JiraError, Result};
use crate::model::{CreatedTicket, IssueLink, IssueType};
use crate::versions;

/// Project that hosts release tickets.
pub const RELEASE_PROJECT_KEY: &str = "REL";
/// Issue type of a release ticket.
pub const RELEASE_ISSUE_TYPE: &str = "Ask for release";
/// Link type used between an integration ticket and its release ticket.
pub const DEFAULT_LINK_TYPE: &str = "relates to";
/// Transition taken when work on a release ticket begins.
pub const STATUS_START_PROGRESS: &str = "Start Progress";
/// Transition taken once the technical release is through.
pub const STATUS_TECHNICAL_RELEASE_DONE: &str = "Technical Release Done";

// Custom field ids of the release ticket screen.
const CF_SHORT_DESCRIPTION: &str = "customfield_10146";
const CF_SQ_COMPATIBILITY: &str = "customfield_10148";
const CF_TARGETED_PRODUCT: &str = "customfield_10163";
const CF_RELEASE_NOTES_LINK: &str = "customfield_10145";
const CF_DOCUMENTATION_STATUS: &str = "customfield_10147";
const CF_RULE_PROPS_CHANGED: &str = "customfield_11263";
const CF_SONARLINT_CHANGELOG: &str = "customfield_11264";

// ---------------------------------------------------------------------------
// Release ticket
// ---------------------------------------------------------------------------

/// Inputs for a release ticket. `version` is the short (tracker-style)
/// version name, also used to resolve the release-notes link when no
/// explicit URL is given.
#[derive(Debug, Clone)]
pub struct ReleaseTicketInput {
    pub project_key: String,
    pub project_name: String,
    pub version: String,
    pub short_description: String,
    pub sq_compatibility: Option<String>,
    pub targeted_product: Option<String>,
    pub documentation_status: Option<String>,
    pub rule_props_changed: Option<bool>,
    pub sonarlint_changelog: Option<String>,
    pub release_notes_url: Option<String>,
}

impl ReleaseTicketInput {
    pub fn new(project_key: &str, project_name: &str, version: &str, short_description: &str) -> Self {
        ReleaseTicketInput {
            project_key: project_key.to_string(),
            project_name: project_name.to_string(),
            version: version.to_string(),
            short_description: short_description.to_string(),
            sq_compatibility: None,
            targeted_product: None,
            documentation_status: None,
            rule_props_changed: None,
            sonarlint_changelog: None,
            release_notes_url: None,
        }
    }
}

/// Create the release ticket. Not idempotent: invoking twice creates two
/// tickets, callers own deduplication.
pub async fn create_release_ticket<J: JiraApi>(
    jira: &J,
    input: &ReleaseTicketInput,
) -> Result<CreatedTicket> {
    let notes_url = match &input.release_notes_url {
        Some(url) => url.clone(),
        None => {
            versions::resolve_notes_version(jira, &input.project_key, Some(&input.version))
                .await?
                .report_url
        }
    };

    let mut fields = Map::new();
    fields.insert("project".to_string(), json!({ "key": RELEASE_PROJECT_KEY }));
    fields.insert(
        "summary".to_string(),
        json!(format!("{} {}", input.project_name, input.version)),
    );
    fields.insert(
        "issuetype".to_string(),
        json!({ "name": RELEASE_ISSUE_TYPE }),
    );
    fields.insert(
        CF_SHORT_DESCRIPTION.to_string(),
        json!(input.short_description),
    );
    fields.insert(CF_RELEASE_NOTES_LINK.to_string(), json!(notes_url));
    if let Some(compat) = &input.sq_compatibility {
        fields.insert(CF_SQ_COMPATIBILITY.to_string(), json!(compat));
    }
    if let Some(product) = &input.targeted_product {
        fields.insert(CF_TARGETED_PRODUCT.to_string(), json!({ "value": product }));
    }
    if let Some(status) = &input.documentation_status {
        fields.insert(CF_DOCUMENTATION_STATUS.to_string(), json!(status));
    }
    if let Some(changed) = input.rule_props_changed {
        let value = if changed { "Yes" } else { "No" };
        fields.insert(CF_RULE_PROPS_CHANGED.to_string(), json!({ "value": value }));
    }
    if let Some(changelog) = &input.sonarlint_changelog {
        fields.insert(CF_SONARLINT_CHANGELOG.to_string(), json!(changelog));
    }

    let created = jira.create_ticket(fields).await?;
    info!(ticket = %created.key, project = %input.project_key, version = %input.version,
        "release ticket created");
    Ok(created)
}

// ---------------------------------------------------------------------------
// Transitions & assignment
// ---------------------------------------------------------------------------

/// Move a ticket to `target` via whichever transition currently exposes
/// that status. The tracker only offers forward transitions, so asking for
/// a status the ticket is already past is `InvalidTransition`.
pub async fn transition_status<J: JiraApi>(jira: &J, key: &str, target: &str) -> Result<()> {
    jira.get_ticket(key).await?;
    let transitions = jira.available_transitions(key).await?;
    let wanted = normalize(target);
    let matched = transitions.iter().find(|t| normalize(&t.name) == wanted);
    let Some(transition) = matched else {
        return Err(JiraError::InvalidTransition {
            ticket: key.to_string(),
            target: target.to_string(),
            available: transitions.into_iter().map(|t| t.name).collect(),
        });
    };
    jira.apply_transition(key, &transition.id).await?;
    info!(ticket = %key, status = %target, "ticket transitioned");
    Ok(())
}

/// Assign a ticket to the account matching `email`.
pub async fn reassign<J: JiraApi>(jira: &J, key: &str, email: &str) -> Result<()> {
    let users = jira.find_users(email).await?;
    let account = users
        .into_iter()
        .next()
        .ok_or_else(|| JiraError::UserNotFound(email.to_string()))?;
    jira.assign_ticket(key, &account.account_id).await?;
    info!(ticket = %key, assignee = %email, "ticket reassigned");
    Ok(())
}

/// Case/whitespace-insensitive status-name comparison key.
fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// Integration tickets
// ---------------------------------------------------------------------------

/// Inputs for an integration ticket in a downstream product project.
#[derive(Debug, Clone)]
pub struct IntegrationTicketInput {
    pub project_key: String,
    pub summary: String,
    pub description: Option<String>,
    pub linked_ticket: String,
    pub link_type: String,
}

impl IntegrationTicketInput {
    pub fn new(project_key: &str, summary: &str, linked_ticket: &str) -> Self {
        IntegrationTicketInput {
            project_key: project_key.to_string(),
            summary: summary.to_string(),
            description: None,
            linked_ticket: linked_ticket.to_string(),
            link_type: DEFAULT_LINK_TYPE.to_string(),
        }
    }
}

/// Create an integration ticket linked back to an existing release ticket.
/// The linked ticket must exist; description and link are best-effort.
pub async fn create_integration_ticket<J: JiraApi>(
    jira: &J,
    input: &IntegrationTicketInput,
) -> Result<CreatedTicket> {
    if let Err(err) = jira.get_ticket(&input.linked_ticket).await {
        return Err(match err {
            JiraError::TicketNotFound(key) => JiraError::LinkedTicketNotFound(key),
            other => other,
        });
    }

    let available = jira.project_issue_types(&input.project_key).await?;
    let issue_type = pick_issue_type(&input.project_key, available)?;

    let mut fields = Map::new();
    fields.insert("project".to_string(), json!({ "key": input.project_key }));
    fields.insert("summary".to_string(), json!(input.summary));
    fields.insert("issuetype".to_string(), json!({ "id": issue_type.id }));
    let created = jira.create_ticket(fields).await?;

    if let Some(description) = &input.description {
        let mut update = Map::new();
        update.insert("description".to_string(), json!(description));
        if let Err(err) = jira.update_fields(&created.key, update).await {
            warn!(ticket = %created.key, error = %err,
                "description rejected by project schema, continuing without it");
        }
    }

    if let Err(err) = jira
        .create_link(&input.link_type, &created.key, &input.linked_ticket)
        .await
    {
        warn!(ticket = %created.key, linked = %input.linked_ticket, error = %err,
            "could not link tickets, continuing");
    }

    info!(ticket = %created.key, project = %input.project_key, linked = %input.linked_ticket,
        "integration ticket created");
    Ok(created)
}

/// Preference order for integration tickets: Task, then Story or
/// Improvement, then whatever the project offers first.
fn pick_issue_type(project_key: &str, available: Vec<IssueType>) -> Result<IssueType> {
    for preferred in ["Task", "Story", "Improvement"] {
        if let Some(found) = available
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(preferred))
        {
            return Ok(found.clone());
        }
    }
    available
        .into_iter()
        .next()
        .ok_or_else(|| JiraError::NoIssueType(project_key.to_string()))
}

// ---------------------------------------------------------------------------
// Linked-ticket discovery
// ---------------------------------------------------------------------------

/// Find the single ticket of `project_key` linked to a release ticket.
/// Zero or multiple matches are an error: the caller cannot know which
/// integration ticket to update.
pub async fn find_linked_ticket<J: JiraApi>(
    jira: &J,
    release_key: &str,
    project_key: &str,
) -> Result<String> {
    let ticket = jira.get_ticket(release_key).await?;
    let prefix = format!("{project_key}-");
    let matches: Vec<String> = ticket
        .fields
        .issue_links
        .iter()
        .filter_map(IssueLink::other_key)
        .filter(|key| key.starts_with(&prefix))
        .map(str::to_string)
        .collect();
    if let [only] = matches.as_slice() {
        return Ok(only.clone());
    }
    Err(JiraError::LinkedTicketCount {
        ticket: release_key.to_string(),
        project: project_key.to_string(),
        found: matches.len(),
    })
}

/// Point a ticket's fixVersions at the given version names, replacing
/// whatever was set before.
pub async fn update_fix_versions<J: JiraApi>(
    jira: &J,
    key: &str,
    versions: &[String],
) -> Result<()> {
    let list: Vec<Value> = versions.iter().map(|name| json!({ "name": name })).collect();
    let mut fields = Map::new();
    fields.insert("fixVersions".to_string(), Value::Array(list));
    jira.update_fields(key, fields).await?;
    info!(ticket = %key, versions = ?versions, "fixVersions updated");
    Ok(())
}
