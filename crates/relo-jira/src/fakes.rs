//! In-memory fake of the issue tracker (testing only)
//!
//! `FakeJira` satisfies `JiraApi` without any network access. State is
//! seeded through `seed_*` helpers and inspected through the recording
//! accessors; failure toggles exercise the non-fatal paths.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::api::JiraApi;
use crate::error::{JiraError, Result};
use crate::model::{
    CreatedTicket, IssueLink, IssueType, LinkedIssue, ProjectVersion, Ticket, TicketFields,
    Transition, UserAccount,
};

const FAKE_SERVER: &str = "https://jira.test";

#[derive(Debug, Default)]
struct FakeJiraState {
    tickets: HashMap<String, Ticket>,
    transitions: HashMap<String, Vec<Transition>>,
    applied_transitions: Vec<(String, String)>,
    assignments: Vec<(String, String)>,
    users: HashMap<String, UserAccount>,
    links: Vec<(String, String, String)>,
    versions: HashMap<String, Vec<ProjectVersion>>,
    issue_types: HashMap<String, Vec<IssueType>>,
    created: Vec<(String, Map<String, Value>)>,
    field_updates: Vec<(String, Map<String, Value>)>,
    search_results: Vec<Ticket>,
    last_jql: String,
    ticket_counters: HashMap<String, u32>,
    version_counter: u32,
    version_update_calls: usize,
    fail_links: bool,
    fail_field_updates: bool,
}

/// In-memory issue tracker backed by hash maps.
#[derive(Debug, Default)]
pub struct FakeJira {
    state: Mutex<FakeJiraState>,
}

impl FakeJira {
    pub fn new() -> Self {
        Self::default()
    }

    // -- seeding -----------------------------------------------------------

    pub fn seed_ticket(&self, key: &str) {
        let mut state = self.state.lock().unwrap();
        state.tickets.insert(
            key.to_string(),
            Ticket {
                id: key.to_string(),
                key: key.to_string(),
                fields: TicketFields::default(),
            },
        );
    }

    /// Seed a ticket whose issue links point at the given keys,
    /// alternating link direction.
    pub fn seed_ticket_with_links(&self, key: &str, linked: &[&str]) {
        let issue_links = linked
            .iter()
            .enumerate()
            .map(|(i, other)| {
                let far = LinkedIssue {
                    key: (*other).to_string(),
                };
                if i % 2 == 0 {
                    IssueLink {
                        inward_issue: None,
                        outward_issue: Some(far),
                    }
                } else {
                    IssueLink {
                        inward_issue: Some(far),
                        outward_issue: None,
                    }
                }
            })
            .collect();
        let mut state = self.state.lock().unwrap();
        state.tickets.insert(
            key.to_string(),
            Ticket {
                id: key.to_string(),
                key: key.to_string(),
                fields: TicketFields {
                    issue_links,
                    ..TicketFields::default()
                },
            },
        );
    }

    pub fn seed_transitions(&self, key: &str, transitions: &[(&str, &str)]) {
        let mut state = self.state.lock().unwrap();
        state.transitions.insert(
            key.to_string(),
            transitions
                .iter()
                .map(|(id, name)| Transition {
                    id: (*id).to_string(),
                    name: (*name).to_string(),
                })
                .collect(),
        );
    }

    pub fn seed_user(&self, email: &str, account_id: &str) {
        let mut state = self.state.lock().unwrap();
        state.users.insert(
            email.to_string(),
            UserAccount {
                account_id: account_id.to_string(),
                display_name: None,
                email: Some(email.to_string()),
            },
        );
    }

    pub fn seed_versions(&self, project_key: &str, versions: Vec<ProjectVersion>) {
        let mut state = self.state.lock().unwrap();
        state.versions.insert(project_key.to_string(), versions);
    }

    pub fn seed_issue_types(&self, project_key: &str, types: &[(&str, &str)]) {
        let mut state = self.state.lock().unwrap();
        state.issue_types.insert(
            project_key.to_string(),
            types
                .iter()
                .map(|(id, name)| IssueType {
                    id: (*id).to_string(),
                    name: (*name).to_string(),
                })
                .collect(),
        );
    }

    pub fn seed_search_results(&self, issues: Vec<Ticket>) {
        self.state.lock().unwrap().search_results = issues;
    }

    pub fn fail_links(&self) {
        self.state.lock().unwrap().fail_links = true;
    }

    pub fn fail_field_updates(&self) {
        self.state.lock().unwrap().fail_field_updates = true;
    }

    // -- recordings --------------------------------------------------------

    /// Fields the ticket was created with.
    pub fn created_fields(&self, key: &str) -> Value {
        let state = self.state.lock().unwrap();
        state
            .created
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, fields)| Value::Object(fields.clone()))
            .unwrap_or_else(|| panic!("no ticket created with key {key}"))
    }

    pub fn created_count(&self) -> usize {
        self.state.lock().unwrap().created.len()
    }

    pub fn applied_transitions(&self, key: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .applied_transitions
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, id)| id.clone())
            .collect()
    }

    pub fn assignments(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().assignments.clone()
    }

    pub fn links(&self) -> Vec<(String, String, String)> {
        self.state.lock().unwrap().links.clone()
    }

    pub fn field_updates(&self, key: &str) -> Vec<Value> {
        let state = self.state.lock().unwrap();
        state
            .field_updates
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, fields)| Value::Object(fields.clone()))
            .collect()
    }

    pub fn versions_of(&self, project_key: &str) -> Vec<ProjectVersion> {
        let state = self.state.lock().unwrap();
        state.versions.get(project_key).cloned().unwrap_or_default()
    }

    pub fn version_update_calls(&self) -> usize {
        self.state.lock().unwrap().version_update_calls
    }

    pub fn last_jql(&self) -> String {
        self.state.lock().unwrap().last_jql.clone()
    }
}

#[async_trait]
impl JiraApi for FakeJira {
    fn server_url(&self) -> &str {
        FAKE_SERVER
    }

    async fn get_ticket(&self, key: &str) -> Result<Ticket> {
        let state = self.state.lock().unwrap();
        state
            .tickets
            .get(key)
            .cloned()
            .ok_or_else(|| JiraError::TicketNotFound(key.to_string()))
    }

    async fn create_ticket(&self, fields: Map<String, Value>) -> Result<CreatedTicket> {
        let project = fields
            .get("project")
            .and_then(|p| p.get("key"))
            .and_then(Value::as_str)
            .unwrap_or("FAKE")
            .to_string();
        let mut state = self.state.lock().unwrap();
        let counter = state.ticket_counters.entry(project.clone()).or_insert(0);
        *counter += 1;
        let key = format!("{}-{}", project, counter);
        let summary = fields
            .get("summary")
            .and_then(Value::as_str)
            .map(str::to_string);
        state.created.push((key.clone(), fields));
        state.tickets.insert(
            key.clone(),
            Ticket {
                id: key.clone(),
                key: key.clone(),
                fields: TicketFields {
                    summary,
                    ..TicketFields::default()
                },
            },
        );
        Ok(CreatedTicket {
            url: format!("{FAKE_SERVER}/browse/{key}"),
            key,
        })
    }

    async fn update_fields(&self, key: &str, fields: Map<String, Value>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_field_updates {
            return Err(JiraError::Api {
                status: 400,
                body: "field not on screen".to_string(),
            });
        }
        if !state.tickets.contains_key(key) {
            return Err(JiraError::TicketNotFound(key.to_string()));
        }
        state.field_updates.push((key.to_string(), fields));
        Ok(())
    }

    async fn available_transitions(&self, key: &str) -> Result<Vec<Transition>> {
        let state = self.state.lock().unwrap();
        Ok(state.transitions.get(key).cloned().unwrap_or_default())
    }

    async fn apply_transition(&self, key: &str, transition_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .applied_transitions
            .push((key.to_string(), transition_id.to_string()));
        Ok(())
    }

    async fn assign_ticket(&self, key: &str, account_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.tickets.contains_key(key) {
            return Err(JiraError::TicketNotFound(key.to_string()));
        }
        state
            .assignments
            .push((key.to_string(), account_id.to_string()));
        Ok(())
    }

    async fn find_users(&self, query: &str) -> Result<Vec<UserAccount>> {
        let state = self.state.lock().unwrap();
        Ok(state.users.get(query).cloned().into_iter().collect())
    }

    async fn create_link(
        &self,
        link_type: &str,
        inward_key: &str,
        outward_key: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_links {
            return Err(JiraError::Api {
                status: 400,
                body: "link type not allowed".to_string(),
            });
        }
        state.links.push((
            link_type.to_string(),
            inward_key.to_string(),
            outward_key.to_string(),
        ));
        Ok(())
    }

    async fn project_versions(&self, project_key: &str) -> Result<Vec<ProjectVersion>> {
        let state = self.state.lock().unwrap();
        Ok(state.versions.get(project_key).cloned().unwrap_or_default())
    }

    async fn create_version(&self, project_key: &str, name: &str) -> Result<ProjectVersion> {
        let mut state = self.state.lock().unwrap();
        state.version_counter += 1;
        let id = format!("v{}", 1000 + state.version_counter);
        let versions = state.versions.entry(project_key.to_string()).or_default();
        if versions.iter().any(|v| v.name == name) {
            return Err(JiraError::Api {
                status: 400,
                body: "A version with this name already exists in this project.".to_string(),
            });
        }
        let version = ProjectVersion {
            id,
            name: name.to_string(),
            released: false,
            release_date: None,
        };
        versions.push(version.clone());
        Ok(version)
    }

    async fn update_version(
        &self,
        version_id: &str,
        released: bool,
        release_date: Option<&str>,
    ) -> Result<ProjectVersion> {
        let mut state = self.state.lock().unwrap();
        state.version_update_calls += 1;
        for versions in state.versions.values_mut() {
            if let Some(version) = versions.iter_mut().find(|v| v.id == version_id) {
                version.released = released;
                version.release_date = release_date.map(str::to_string);
                return Ok(version.clone());
            }
        }
        Err(JiraError::Api {
            status: 404,
            body: format!("version {version_id} not found"),
        })
    }

    async fn project_issue_types(&self, project_key: &str) -> Result<Vec<IssueType>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .issue_types
            .get(project_key)
            .cloned()
            .unwrap_or_default())
    }

    async fn search_issues(&self, jql: &str, _fields: &[&str]) -> Result<Vec<Ticket>> {
        let mut state = self.state.lock().unwrap();
        state.last_jql = jql.to_string();
        Ok(state.search_results.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_allocates_keys_per_project() {
        let jira = FakeJira::new();
        let mut fields = Map::new();
        fields.insert(
            "project".to_string(),
            serde_json::json!({ "key": "REL" }),
        );
        let first = jira.create_ticket(fields.clone()).await.unwrap();
        let second = jira.create_ticket(fields).await.unwrap();
        assert_eq!(first.key, "REL-1");
        assert_eq!(second.key, "REL-2");
        assert!(jira.get_ticket("REL-2").await.is_ok());
    }

    #[tokio::test]
    async fn test_fake_rejects_duplicate_version_names() {
        let jira = FakeJira::new();
        jira.create_version("SONARIAC", "11.44").await.unwrap();
        let err = jira.create_version("SONARIAC", "11.44").await.unwrap_err();
        assert!(matches!(err, JiraError::Api { status: 400, .. }));
    }
}
