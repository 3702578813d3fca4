//! reqwest-backed issue-tracker client
//!
//! Talks to a Jira Cloud instance over REST v2 with basic auth
//! (user + API token). The instance is picked once at construction:
//! production, or the sandbox used for dry runs of ticket flows.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::api::JiraApi;
use crate::error::{JiraError, Result};
use crate::model::{CreatedTicket, IssueType, ProjectVersion, Ticket, Transition, UserAccount};

/// Production tracker instance.
pub const JIRA_PROD_URL: &str = "https://sonarsource.atlassian.net";
/// Sandbox instance for exercising ticket flows without touching real data.
pub const JIRA_SANDBOX_URL: &str = "https://sonarsource-sandbox-608.atlassian.net";

/// Base URL for the given instance flavour.
pub fn instance_url(sandbox: bool) -> &'static str {
    if sandbox {
        JIRA_SANDBOX_URL
    } else {
        JIRA_PROD_URL
    }
}

/// Connection settings for one tracker instance.
#[derive(Debug, Clone)]
pub struct JiraConfig {
    /// Base URL without a trailing slash
    pub base_url: String,
    /// Account the API token belongs to
    pub user: String,
    /// API token
    pub token: String,
}

impl JiraConfig {
    pub fn new(base_url: &str, user: &str, token: &str) -> Self {
        JiraConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            user: user.to_string(),
            token: token.to_string(),
        }
    }

    /// Read credentials from `JIRA_USER`/`JIRA_TOKEN`, targeting the
    /// sandbox or production instance.
    pub fn from_env(sandbox: bool) -> Result<Self> {
        let user = std::env::var("JIRA_USER").map_err(|_| JiraError::MissingEnv("JIRA_USER"))?;
        let token = std::env::var("JIRA_TOKEN").map_err(|_| JiraError::MissingEnv("JIRA_TOKEN"))?;
        Ok(Self::new(instance_url(sandbox), &user, &token))
    }
}

/// Issue-tracker client over HTTP.
pub struct JiraClient {
    config: JiraConfig,
    http_client: reqwest::Client,
}

impl JiraClient {
    /// Create a new client for the configured instance.
    pub fn new(config: JiraConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent("relo-jira/0.1.0")
            .build()
            .expect("Failed to create HTTP client");

        JiraClient {
            config,
            http_client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, self.url(path))
            .basic_auth(&self.config.user, Some(&self.config.token))
    }

    /// Map a non-success response into `Api { status, body }`.
    async fn ok_or_api_error(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(JiraError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.request(reqwest::Method::GET, path).send().await?;
        let resp = Self::ok_or_api_error(resp).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn send_json(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &Value,
    ) -> Result<reqwest::Response> {
        let resp = self.request(method, path).json(body).send().await?;
        Self::ok_or_api_error(resp).await
    }

    /// 404 on ticket-scoped endpoints means the ticket does not exist.
    fn map_missing_ticket(err: JiraError, key: &str) -> JiraError {
        match err {
            JiraError::Api { status: 404, .. } => JiraError::TicketNotFound(key.to_string()),
            other => other,
        }
    }
}

#[async_trait]
impl JiraApi for JiraClient {
    fn server_url(&self) -> &str {
        &self.config.base_url
    }

    async fn get_ticket(&self, key: &str) -> Result<Ticket> {
        let path = format!("/rest/api/2/issue/{key}?fields=summary,status,issuetype,issuelinks");
        self.get_json(&path)
            .await
            .map_err(|e| Self::map_missing_ticket(e, key))
    }

    async fn create_ticket(&self, fields: Map<String, Value>) -> Result<CreatedTicket> {
        let resp = self
            .send_json(
                reqwest::Method::POST,
                "/rest/api/2/issue",
                &json!({ "fields": fields }),
            )
            .await?;
        #[derive(serde::Deserialize)]
        struct Created {
            key: String,
        }
        let created: Created = resp.json().await?;
        debug!(ticket = %created.key, "created ticket");
        Ok(CreatedTicket {
            url: self.browse_url(&created.key),
            key: created.key,
        })
    }

    async fn update_fields(&self, key: &str, fields: Map<String, Value>) -> Result<()> {
        let path = format!("/rest/api/2/issue/{key}");
        self.send_json(reqwest::Method::PUT, &path, &json!({ "fields": fields }))
            .await
            .map_err(|e| Self::map_missing_ticket(e, key))?;
        Ok(())
    }

    async fn available_transitions(&self, key: &str) -> Result<Vec<Transition>> {
        #[derive(serde::Deserialize)]
        struct Transitions {
            #[serde(default)]
            transitions: Vec<Transition>,
        }
        let path = format!("/rest/api/2/issue/{key}/transitions");
        let listing: Transitions = self
            .get_json(&path)
            .await
            .map_err(|e| Self::map_missing_ticket(e, key))?;
        Ok(listing.transitions)
    }

    async fn apply_transition(&self, key: &str, transition_id: &str) -> Result<()> {
        let path = format!("/rest/api/2/issue/{key}/transitions");
        self.send_json(
            reqwest::Method::POST,
            &path,
            &json!({ "transition": { "id": transition_id } }),
        )
        .await
        .map_err(|e| Self::map_missing_ticket(e, key))?;
        debug!(ticket = %key, transition = %transition_id, "applied transition");
        Ok(())
    }

    async fn assign_ticket(&self, key: &str, account_id: &str) -> Result<()> {
        let path = format!("/rest/api/2/issue/{key}/assignee");
        self.send_json(
            reqwest::Method::PUT,
            &path,
            &json!({ "accountId": account_id }),
        )
        .await
        .map_err(|e| Self::map_missing_ticket(e, key))?;
        Ok(())
    }

    async fn find_users(&self, query: &str) -> Result<Vec<UserAccount>> {
        let resp = self
            .request(reqwest::Method::GET, "/rest/api/2/user/search")
            .query(&[("query", query)])
            .send()
            .await?;
        let resp = Self::ok_or_api_error(resp).await?;
        Ok(resp.json().await?)
    }

    async fn create_link(
        &self,
        link_type: &str,
        inward_key: &str,
        outward_key: &str,
    ) -> Result<()> {
        self.send_json(
            reqwest::Method::POST,
            "/rest/api/2/issueLink",
            &json!({
                "type": { "name": link_type },
                "inwardIssue": { "key": inward_key },
                "outwardIssue": { "key": outward_key },
            }),
        )
        .await?;
        Ok(())
    }

    async fn project_versions(&self, project_key: &str) -> Result<Vec<ProjectVersion>> {
        let path = format!("/rest/api/2/project/{project_key}/versions");
        self.get_json(&path).await
    }

    async fn create_version(&self, project_key: &str, name: &str) -> Result<ProjectVersion> {
        let resp = self
            .send_json(
                reqwest::Method::POST,
                "/rest/api/2/version",
                &json!({ "name": name, "project": project_key }),
            )
            .await?;
        Ok(resp.json().await?)
    }

    async fn update_version(
        &self,
        version_id: &str,
        released: bool,
        release_date: Option<&str>,
    ) -> Result<ProjectVersion> {
        let mut body = json!({ "released": released });
        if let Some(date) = release_date {
            body["releaseDate"] = json!(date);
        }
        let path = format!("/rest/api/2/version/{version_id}");
        let resp = self.send_json(reqwest::Method::PUT, &path, &body).await?;
        Ok(resp.json().await?)
    }

    async fn project_issue_types(&self, project_key: &str) -> Result<Vec<IssueType>> {
        #[derive(serde::Deserialize)]
        struct Meta {
            #[serde(default)]
            projects: Vec<MetaProject>,
        }
        #[derive(serde::Deserialize)]
        struct MetaProject {
            #[serde(rename = "issuetypes", default)]
            issue_types: Vec<IssueType>,
        }
        let path = format!(
            "/rest/api/2/issue/createmeta?projectKeys={project_key}&expand=projects.issuetypes"
        );
        let meta: Meta = self.get_json(&path).await?;
        Ok(meta
            .projects
            .into_iter()
            .next()
            .map(|p| p.issue_types)
            .unwrap_or_default())
    }

    async fn search_issues(&self, jql: &str, fields: &[&str]) -> Result<Vec<Ticket>> {
        #[derive(serde::Deserialize)]
        struct SearchPage {
            #[serde(default)]
            issues: Vec<Ticket>,
            #[serde(default)]
            total: usize,
        }
        let mut issues = Vec::new();
        let mut start_at = 0usize;
        loop {
            let body = json!({
                "jql": jql,
                "startAt": start_at,
                "maxResults": 100,
                "fields": fields,
            });
            let resp = self
                .send_json(reqwest::Method::POST, "/rest/api/2/search", &body)
                .await?;
            let page: SearchPage = resp.json().await?;
            let fetched = page.issues.len();
            issues.extend(page.issues);
            start_at += fetched;
            if fetched == 0 || start_at >= page.total {
                break;
            }
        }
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_url_selection() {
        assert_eq!(instance_url(false), JIRA_PROD_URL);
        assert_eq!(instance_url(true), JIRA_SANDBOX_URL);
    }

    #[test]
    fn test_config_strips_trailing_slash() {
        let config = JiraConfig::new("https://sonarsource.atlassian.net/", "bot", "tok");
        assert_eq!(config.base_url, "https://sonarsource.atlassian.net");
    }

    #[test]
    fn test_browse_url() {
        let client = JiraClient::new(JiraConfig::new(JIRA_SANDBOX_URL, "bot", "tok"));
        assert_eq!(
            client.browse_url("REL-12"),
            "https://sonarsource-sandbox-608.atlassian.net/browse/REL-12"
        );
    }
}
