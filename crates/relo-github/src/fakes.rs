//! In-memory fake of the source host (testing only)
//!
//! `FakeGithub` satisfies `GithubApi` without any network access. Commit
//! statuses are stored in seeding order, so tests seed the newest status
//! first to mirror the real listing. Protection writes are applied back to
//! the stored state, which lets lock idempotence tests observe the second
//! read. `InstantSleeper` makes the monitor loops run without waiting.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};

use crate::api::GithubApi;
use crate::error::{GithubError, Result};
use crate::model::{
    Actor, BranchProtection, CommitStatus, CreateRelease, EnabledFlag, ProtectionUpdate, Release,
    RequiredPullRequestReviews, RequiredStatusChecks, Restrictions, SlugRef, WorkflowRun,
};
use crate::workflow::Sleeper;

const FAKE_REPOSITORY: &str = "sonarsource/sonar-test";

#[derive(Debug, Default)]
struct FakeGithubState {
    statuses: HashMap<String, Vec<CommitStatus>>,
    releases: Vec<Release>,
    release_counter: u64,
    protection: HashMap<String, BranchProtection>,
    protection_puts: Vec<(String, ProtectionUpdate)>,
    dispatches: Vec<(String, String, String, Map<String, Value>)>,
    workflow_runs: HashMap<String, Vec<WorkflowRun>>,
    run_states: HashMap<u64, VecDeque<WorkflowRun>>,
    protection_write_budget: Option<usize>,
}

/// In-memory source host backed by hash maps.
#[derive(Debug, Default)]
pub struct FakeGithub {
    state: Mutex<FakeGithubState>,
}

impl FakeGithub {
    pub fn new() -> Self {
        Self::default()
    }

    // -- seeding -----------------------------------------------------------

    pub fn seed_status(&self, branch: &str, context: &str, state: &str, description: &str) {
        let mut inner = self.state.lock().unwrap();
        inner
            .statuses
            .entry(branch.to_string())
            .or_default()
            .push(CommitStatus {
                state: state.to_string(),
                context: context.to_string(),
                description: Some(description.to_string()),
                created_at: Utc::now(),
            });
    }

    pub fn seed_release(&self, title: &str, draft: bool) -> u64 {
        let mut inner = self.state.lock().unwrap();
        inner.release_counter += 1;
        let id = inner.release_counter;
        inner.releases.push(Release {
            id,
            tag_name: title.to_string(),
            target_commitish: "master".to_string(),
            name: Some(title.to_string()),
            body: None,
            draft,
            prerelease: false,
            html_url: format!("https://github.test/{FAKE_REPOSITORY}/releases/{id}"),
        });
        id
    }

    pub fn seed_protection(&self, branch: &str, protection: BranchProtection) {
        let mut inner = self.state.lock().unwrap();
        inner.protection.insert(branch.to_string(), protection);
    }

    /// Add a run to the listing of `workflow`.
    pub fn seed_workflow_run(&self, workflow: &str, run: WorkflowRun) {
        let mut inner = self.state.lock().unwrap();
        inner
            .workflow_runs
            .entry(workflow.to_string())
            .or_default()
            .push(run);
    }

    /// Script the states `get_workflow_run` steps through for one run id.
    /// The last state repeats once the script is exhausted.
    pub fn seed_run_states(&self, run_id: u64, states: Vec<WorkflowRun>) {
        let mut inner = self.state.lock().unwrap();
        inner.run_states.insert(run_id, states.into());
    }

    /// Accept `n` protection writes, then refuse the rest.
    pub fn fail_protection_writes_after(&self, n: usize) {
        self.state.lock().unwrap().protection_write_budget = Some(n);
    }

    // -- recordings --------------------------------------------------------

    pub fn releases(&self) -> Vec<Release> {
        self.state.lock().unwrap().releases.clone()
    }

    pub fn protection_put_count(&self) -> usize {
        self.state.lock().unwrap().protection_puts.len()
    }

    pub fn protection_puts(&self, branch: &str) -> Vec<ProtectionUpdate> {
        let inner = self.state.lock().unwrap();
        inner
            .protection_puts
            .iter()
            .filter(|(b, _)| b == branch)
            .map(|(_, update)| update.clone())
            .collect()
    }

    pub fn dispatches(&self) -> Vec<(String, String, String, Map<String, Value>)> {
        self.state.lock().unwrap().dispatches.clone()
    }
}

/// Protection state after a full-replace write.
fn protection_from_update(update: &ProtectionUpdate) -> BranchProtection {
    BranchProtection {
        required_status_checks: update.required_status_checks.as_ref().map(|checks| {
            RequiredStatusChecks {
                strict: checks.strict,
                contexts: checks.contexts.clone(),
            }
        }),
        enforce_admins: Some(EnabledFlag {
            enabled: update.enforce_admins,
        }),
        required_pull_request_reviews: update.required_pull_request_reviews.as_ref().map(
            |reviews| RequiredPullRequestReviews {
                dismiss_stale_reviews: reviews.dismiss_stale_reviews,
                require_code_owner_reviews: reviews.require_code_owner_reviews,
                required_approving_review_count: reviews.required_approving_review_count,
            },
        ),
        restrictions: update.restrictions.as_ref().map(|r| Restrictions {
            users: r
                .users
                .iter()
                .map(|login| Actor {
                    login: login.clone(),
                })
                .collect(),
            teams: r
                .teams
                .iter()
                .map(|slug| SlugRef { slug: slug.clone() })
                .collect(),
            apps: r
                .apps
                .iter()
                .map(|slug| SlugRef { slug: slug.clone() })
                .collect(),
        }),
        required_linear_history: Some(EnabledFlag {
            enabled: update.required_linear_history,
        }),
        allow_force_pushes: Some(EnabledFlag {
            enabled: update.allow_force_pushes,
        }),
        allow_deletions: Some(EnabledFlag {
            enabled: update.allow_deletions,
        }),
        block_creations: Some(EnabledFlag {
            enabled: update.block_creations,
        }),
        required_conversation_resolution: Some(EnabledFlag {
            enabled: update.required_conversation_resolution,
        }),
        lock_branch: Some(EnabledFlag {
            enabled: update.lock_branch,
        }),
        allow_fork_syncing: Some(EnabledFlag {
            enabled: update.allow_fork_syncing,
        }),
    }
}

#[async_trait]
impl GithubApi for FakeGithub {
    fn repository(&self) -> &str {
        FAKE_REPOSITORY
    }

    async fn list_commit_statuses(&self, branch: &str) -> Result<Vec<CommitStatus>> {
        let inner = self.state.lock().unwrap();
        Ok(inner.statuses.get(branch).cloned().unwrap_or_default())
    }

    async fn list_releases(&self) -> Result<Vec<Release>> {
        Ok(self.state.lock().unwrap().releases.clone())
    }

    async fn create_release(&self, req: &CreateRelease) -> Result<Release> {
        let mut inner = self.state.lock().unwrap();
        inner.release_counter += 1;
        let id = inner.release_counter;
        let release = Release {
            id,
            tag_name: req.tag_name.clone(),
            target_commitish: req.target_commitish.clone(),
            name: req.name.clone(),
            body: req.body.clone(),
            draft: req.draft,
            prerelease: req.prerelease,
            html_url: format!("https://github.test/{FAKE_REPOSITORY}/releases/{id}"),
        };
        inner.releases.push(release.clone());
        Ok(release)
    }

    async fn update_release_draft(&self, release_id: u64, draft: bool) -> Result<Release> {
        let mut inner = self.state.lock().unwrap();
        let release = inner
            .releases
            .iter_mut()
            .find(|r| r.id == release_id)
            .ok_or_else(|| GithubError::Api {
                status: 404,
                body: format!("release {release_id} not found"),
            })?;
        release.draft = draft;
        Ok(release.clone())
    }

    async fn get_branch_protection(&self, branch: &str) -> Result<Option<BranchProtection>> {
        let inner = self.state.lock().unwrap();
        Ok(inner.protection.get(branch).cloned())
    }

    async fn put_branch_protection(&self, branch: &str, update: &ProtectionUpdate) -> Result<()> {
        let mut inner = self.state.lock().unwrap();
        if let Some(budget) = inner.protection_write_budget.as_mut() {
            if *budget == 0 {
                return Err(GithubError::Api {
                    status: 500,
                    body: "protection write refused".to_string(),
                });
            }
            *budget -= 1;
        }
        inner
            .protection
            .insert(branch.to_string(), protection_from_update(update));
        inner
            .protection_puts
            .push((branch.to_string(), update.clone()));
        Ok(())
    }

    async fn dispatch_repository_workflow(
        &self,
        repository: &str,
        workflow: &str,
        git_ref: &str,
        inputs: &Map<String, Value>,
    ) -> Result<()> {
        let mut inner = self.state.lock().unwrap();
        inner.dispatches.push((
            repository.to_string(),
            workflow.to_string(),
            git_ref.to_string(),
            inputs.clone(),
        ));
        Ok(())
    }

    async fn list_workflow_runs(&self, workflow: &str, branch: &str) -> Result<Vec<WorkflowRun>> {
        let inner = self.state.lock().unwrap();
        Ok(inner
            .workflow_runs
            .get(workflow)
            .map(|runs| {
                runs.iter()
                    .filter(|run| run.head_branch.as_deref().is_none_or(|b| b == branch))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_workflow_run(&self, run_id: u64) -> Result<WorkflowRun> {
        let mut inner = self.state.lock().unwrap();
        let states = inner
            .run_states
            .get_mut(&run_id)
            .ok_or_else(|| GithubError::Api {
                status: 404,
                body: format!("run {run_id} not found"),
            })?;
        if states.len() > 1 {
            Ok(states.pop_front().unwrap())
        } else {
            states.front().cloned().ok_or_else(|| GithubError::Api {
                status: 404,
                body: format!("run {run_id} has no scripted state"),
            })
        }
    }
}

/// Sleeper that returns immediately, recording each requested delay.
#[derive(Debug, Default)]
pub struct InstantSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl InstantSleeper {
    pub fn sleep_count(&self) -> usize {
        self.sleeps.lock().unwrap().len()
    }
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_protection_write_is_readable_back() {
        let gh = FakeGithub::new();
        let update = ProtectionUpdate {
            required_status_checks: None,
            enforce_admins: true,
            required_pull_request_reviews: None,
            restrictions: None,
            lock_branch: true,
            required_linear_history: true,
            allow_force_pushes: false,
            allow_deletions: false,
            block_creations: false,
            required_conversation_resolution: false,
            allow_fork_syncing: false,
        };
        gh.put_branch_protection("master", &update).await.unwrap();
        let read = gh.get_branch_protection("master").await.unwrap().unwrap();
        assert!(read.locked());
        assert_eq!(gh.protection_put_count(), 1);
    }

    #[tokio::test]
    async fn test_run_states_progress_and_repeat() {
        let gh = FakeGithub::new();
        let now = Utc::now();
        let queued = WorkflowRun {
            id: 1,
            status: "queued".to_string(),
            conclusion: None,
            created_at: now,
            html_url: "https://github.test/runs/1".to_string(),
            head_branch: None,
        };
        let done = WorkflowRun {
            status: "completed".to_string(),
            conclusion: Some("success".to_string()),
            ..queued.clone()
        };
        gh.seed_run_states(1, vec![queued, done]);
        assert_eq!(gh.get_workflow_run(1).await.unwrap().status, "queued");
        assert_eq!(gh.get_workflow_run(1).await.unwrap().status, "completed");
        assert_eq!(gh.get_workflow_run(1).await.unwrap().status, "completed");
    }
}
