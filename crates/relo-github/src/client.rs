//! reqwest-backed source-host client
//!
//! Standard GitHub REST headers: bearer token, the versioned JSON accept
//! header, and a pinned API version.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::api::GithubApi;
use crate::error::{GithubError, Result};
use crate::model::{
    BranchProtection, CommitStatus, CreateRelease, ProtectionUpdate, Release, WorkflowRun,
};

pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// Connection settings for the source host.
#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// API root, default `https://api.github.com`
    pub api_url: String,
    /// `owner/name` this client is bound to
    pub repository: String,
    /// Bearer token
    pub token: String,
}

impl GithubConfig {
    pub fn new(repository: &str, token: &str) -> Self {
        GithubConfig {
            api_url: GITHUB_API_URL.to_string(),
            repository: repository.to_string(),
            token: token.to_string(),
        }
    }

    /// Read `GITHUB_TOKEN` (and `GITHUB_REPOSITORY` when no explicit
    /// repository is given), as provided in CI environments.
    pub fn from_env(repository: Option<&str>) -> Result<Self> {
        let token = std::env::var("GITHUB_TOKEN")
            .map_err(|_| GithubError::Http("GITHUB_TOKEN is not set".to_string()))?;
        let repository = match repository {
            Some(repo) => repo.to_string(),
            None => std::env::var("GITHUB_REPOSITORY")
                .map_err(|_| GithubError::Http("GITHUB_REPOSITORY is not set".to_string()))?,
        };
        Ok(GithubConfig {
            api_url: GITHUB_API_URL.to_string(),
            repository,
            token,
        })
    }
}

/// Source-host client over HTTP.
pub struct GithubClient {
    config: GithubConfig,
    http_client: reqwest::Client,
}

impl GithubClient {
    pub fn new(config: GithubConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent("relo-github/0.1.0")
            .build()
            .expect("Failed to create HTTP client");

        GithubClient {
            config,
            http_client,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.config.api_url, path))
            .bearer_auth(&self.config.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
    }

    async fn ok_or_api_error(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(GithubError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.request(reqwest::Method::GET, path).send().await?;
        let resp = Self::ok_or_api_error(resp).await?;
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl GithubApi for GithubClient {
    fn repository(&self) -> &str {
        &self.config.repository
    }

    async fn list_commit_statuses(&self, branch: &str) -> Result<Vec<CommitStatus>> {
        let path = format!(
            "/repos/{}/commits/{branch}/statuses?per_page=100",
            self.config.repository
        );
        self.get_json(&path).await
    }

    async fn list_releases(&self) -> Result<Vec<Release>> {
        let path = format!("/repos/{}/releases?per_page=100", self.config.repository);
        self.get_json(&path).await
    }

    async fn create_release(&self, req: &CreateRelease) -> Result<Release> {
        let path = format!("/repos/{}/releases", self.config.repository);
        let resp = self
            .request(reqwest::Method::POST, &path)
            .json(req)
            .send()
            .await?;
        let resp = Self::ok_or_api_error(resp).await?;
        let release: Release = resp.json().await?;
        debug!(tag = %release.tag_name, id = release.id, "release created");
        Ok(release)
    }

    async fn update_release_draft(&self, release_id: u64, draft: bool) -> Result<Release> {
        let path = format!(
            "/repos/{}/releases/{release_id}",
            self.config.repository
        );
        let resp = self
            .request(reqwest::Method::PATCH, &path)
            .json(&json!({ "draft": draft }))
            .send()
            .await?;
        let resp = Self::ok_or_api_error(resp).await?;
        Ok(resp.json().await?)
    }

    async fn get_branch_protection(&self, branch: &str) -> Result<Option<BranchProtection>> {
        let path = format!(
            "/repos/{}/branches/{branch}/protection",
            self.config.repository
        );
        let resp = self.request(reqwest::Method::GET, &path).send().await?;
        match resp.status().as_u16() {
            404 => Ok(None),
            403 => Err(GithubError::PermissionDenied {
                branch: branch.to_string(),
            }),
            _ => {
                let resp = Self::ok_or_api_error(resp).await?;
                Ok(Some(resp.json().await?))
            }
        }
    }

    async fn put_branch_protection(&self, branch: &str, update: &ProtectionUpdate) -> Result<()> {
        let path = format!(
            "/repos/{}/branches/{branch}/protection",
            self.config.repository
        );
        let resp = self
            .request(reqwest::Method::PUT, &path)
            .json(update)
            .send()
            .await?;
        if resp.status().as_u16() == 403 {
            return Err(GithubError::PermissionDenied {
                branch: branch.to_string(),
            });
        }
        Self::ok_or_api_error(resp).await?;
        Ok(())
    }

    async fn dispatch_repository_workflow(
        &self,
        repository: &str,
        workflow: &str,
        git_ref: &str,
        inputs: &Map<String, Value>,
    ) -> Result<()> {
        let path = format!("/repos/{repository}/actions/workflows/{workflow}/dispatches");
        let resp = self
            .request(reqwest::Method::POST, &path)
            .json(&json!({ "ref": git_ref, "inputs": inputs }))
            .send()
            .await?;
        Self::ok_or_api_error(resp).await?;
        debug!(repository = %repository, workflow = %workflow, "workflow dispatched");
        Ok(())
    }

    async fn list_workflow_runs(&self, workflow: &str, branch: &str) -> Result<Vec<WorkflowRun>> {
        #[derive(serde::Deserialize)]
        struct Runs {
            #[serde(default)]
            workflow_runs: Vec<WorkflowRun>,
        }
        let path = format!(
            "/repos/{}/actions/workflows/{workflow}/runs?branch={branch}&per_page=30",
            self.config.repository
        );
        let runs: Runs = self.get_json(&path).await?;
        Ok(runs.workflow_runs)
    }

    async fn get_workflow_run(&self, run_id: u64) -> Result<WorkflowRun> {
        let path = format!("/repos/{}/actions/runs/{run_id}", self.config.repository);
        self.get_json(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_parts() {
        let config = GithubConfig::new("SonarSource/sonar-iac", "tok");
        assert_eq!(config.api_url, GITHUB_API_URL);
        assert_eq!(config.repository, "SonarSource/sonar-iac");
    }
}
