//! Source-host API trait
//!
//! `GithubApi` is the seam between the release operations and the concrete
//! host. The production implementation is `GithubClient` (reqwest); an
//! in-memory fake for tests lives in the `fakes` module.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::model::{
    BranchProtection, CommitStatus, CreateRelease, ProtectionUpdate, Release, WorkflowRun,
};

/// Raw host operations against one repository (plus cross-repository
/// workflow dispatch for downstream updates). No retry loops here; the
/// monitor owns the only polling policy.
#[async_trait]
pub trait GithubApi: Send + Sync {
    /// `owner/name` of the repository this client is bound to.
    fn repository(&self) -> &str;

    /// Commit statuses of the branch head, newest first.
    async fn list_commit_statuses(&self, branch: &str) -> Result<Vec<CommitStatus>>;

    /// All releases of the repository, drafts included.
    async fn list_releases(&self) -> Result<Vec<Release>>;

    /// Create a release.
    async fn create_release(&self, req: &CreateRelease) -> Result<Release>;

    /// Flip the draft flag of an existing release.
    async fn update_release_draft(&self, release_id: u64, draft: bool) -> Result<Release>;

    /// Branch protection, `None` when the branch has none configured.
    async fn get_branch_protection(&self, branch: &str) -> Result<Option<BranchProtection>>;

    /// Replace the branch protection settings.
    async fn put_branch_protection(&self, branch: &str, update: &ProtectionUpdate) -> Result<()>;

    /// Dispatch a workflow in an arbitrary repository.
    async fn dispatch_repository_workflow(
        &self,
        repository: &str,
        workflow: &str,
        git_ref: &str,
        inputs: &Map<String, Value>,
    ) -> Result<()>;

    /// Dispatch a workflow in this repository.
    async fn dispatch_workflow(
        &self,
        workflow: &str,
        git_ref: &str,
        inputs: &Map<String, Value>,
    ) -> Result<()> {
        self.dispatch_repository_workflow(self.repository(), workflow, git_ref, inputs)
            .await
    }

    /// Recent runs of a workflow on a branch, newest first.
    async fn list_workflow_runs(&self, workflow: &str, branch: &str) -> Result<Vec<WorkflowRun>>;

    /// Current state of one run.
    async fn get_workflow_run(&self, run_id: u64) -> Result<WorkflowRun>;
}
