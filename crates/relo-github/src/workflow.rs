//! Downstream workflow trigger & monitor
//!
//! Workflow dispatch returns no run id, so after dispatching the monitor
//! searches recent runs for one created at or after the dispatch time
//! minus a small clock-skew window. Anything older is a stale previous run
//! and must not be matched. This is the only polling loop in the system.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::api::GithubApi;
use crate::error::{GithubError, Result};
use crate::model::WorkflowRun;

// ---------------------------------------------------------------------------
// Policy & clock seam
// ---------------------------------------------------------------------------

/// Bounded retry policy for the dispatch-discovery and completion loops.
#[derive(Debug, Clone)]
pub struct MonitorPolicy {
    /// Delay between polls
    pub poll_interval: Duration,
    /// Ceiling for discovering the dispatched run
    pub dispatch_timeout: Duration,
    /// Ceiling for the run to reach a terminal state
    pub run_timeout: Duration,
    /// Clock-skew allowance when matching run creation times
    pub skew: chrono::Duration,
}

impl Default for MonitorPolicy {
    fn default() -> Self {
        MonitorPolicy {
            poll_interval: Duration::from_secs(10),
            dispatch_timeout: Duration::from_secs(120),
            run_timeout: Duration::from_secs(1800),
            skew: chrono::Duration::minutes(5),
        }
    }
}

impl MonitorPolicy {
    fn attempts(ceiling: Duration, interval: Duration) -> u64 {
        (ceiling.as_secs() / interval.as_secs().max(1)).max(1)
    }

    fn dispatch_attempts(&self) -> u64 {
        Self::attempts(self.dispatch_timeout, self.poll_interval)
    }

    fn run_attempts(&self) -> u64 {
        Self::attempts(self.run_timeout, self.poll_interval)
    }
}

/// Sleep seam so tests can run the loops without waiting.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real clock.
#[derive(Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// ---------------------------------------------------------------------------
// Dispatch spec & outcome
// ---------------------------------------------------------------------------

/// What to dispatch and where.
#[derive(Debug, Clone)]
pub struct DispatchSpec {
    /// Workflow file name, e.g. `publish-release.yml`
    pub workflow: String,
    /// Branch or ref the workflow runs on
    pub git_ref: String,
    /// `workflow_dispatch` inputs (all values are strings on the wire)
    pub inputs: Map<String, Value>,
}

impl DispatchSpec {
    /// Inputs for the artifact-publishing workflow.
    pub fn publish_artifacts(
        workflow: &str,
        git_ref: &str,
        tag: &str,
        release_id: u64,
        dry_run: bool,
    ) -> Self {
        let mut inputs = Map::new();
        inputs.insert("tag".to_string(), json!(tag));
        inputs.insert("releaseId".to_string(), json!(release_id.to_string()));
        inputs.insert("dryRun".to_string(), json!(dry_run.to_string()));
        DispatchSpec {
            workflow: workflow.to_string(),
            git_ref: git_ref.to_string(),
            inputs,
        }
    }
}

/// A run that reached `completed` with conclusion `success`.
#[derive(Debug, Clone)]
pub struct CompletedRun {
    pub run_id: u64,
    pub url: String,
    pub conclusion: String,
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// Among `runs`, the newest one created at or after
/// `dispatched_at - skew`. Older runs are stale matches from previous
/// dispatches.
pub fn select_dispatched_run(
    runs: &[WorkflowRun],
    dispatched_at: DateTime<Utc>,
    skew: chrono::Duration,
) -> Option<&WorkflowRun> {
    let cutoff = dispatched_at - skew;
    runs.iter()
        .filter(|run| run.created_at >= cutoff)
        .max_by_key(|run| run.created_at)
}

/// Dispatch `spec` and block until the triggered run completes
/// successfully. Failure conclusions, missing runs, and ceilings all map
/// to distinct errors carrying the run URL where one is known.
pub async fn trigger_and_await<G: GithubApi, S: Sleeper + ?Sized>(
    gh: &G,
    sleeper: &S,
    spec: &DispatchSpec,
    policy: &MonitorPolicy,
) -> Result<CompletedRun> {
    let dispatched_at = Utc::now();
    gh.dispatch_workflow(&spec.workflow, &spec.git_ref, &spec.inputs)
        .await?;
    info!(workflow = %spec.workflow, git_ref = %spec.git_ref, "workflow dispatched");

    // Find the run the dispatch started.
    let mut run_id = None;
    for attempt in 0..policy.dispatch_attempts() {
        let runs = gh.list_workflow_runs(&spec.workflow, &spec.git_ref).await?;
        if let Some(run) = select_dispatched_run(&runs, dispatched_at, policy.skew) {
            debug!(run_id = run.id, attempt, "dispatched run identified");
            run_id = Some(run.id);
            break;
        }
        sleeper.sleep(policy.poll_interval).await;
    }
    let run_id = run_id.ok_or_else(|| GithubError::DispatchTimeout {
        workflow: spec.workflow.clone(),
        waited_secs: policy.dispatch_timeout.as_secs(),
    })?;

    // Wait for it to reach a terminal state.
    let mut last_url = String::new();
    for _ in 0..policy.run_attempts() {
        let run = gh.get_workflow_run(run_id).await?;
        last_url = run.html_url.clone();
        if run.is_completed() {
            let conclusion = run.conclusion.unwrap_or_else(|| "unknown".to_string());
            if conclusion == "success" {
                info!(run_id, url = %run.html_url, "downstream run succeeded");
                return Ok(CompletedRun {
                    run_id,
                    url: run.html_url,
                    conclusion,
                });
            }
            return Err(GithubError::RunFailed {
                conclusion,
                url: run.html_url,
            });
        }
        sleeper.sleep(policy.poll_interval).await;
    }
    Err(GithubError::RunTimeout {
        run_id,
        url: last_url,
        waited_secs: policy.run_timeout.as_secs(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeGithub, InstantSleeper};

    fn run_created(id: u64, created_at: DateTime<Utc>, status: &str) -> WorkflowRun {
        WorkflowRun {
            id,
            status: status.to_string(),
            conclusion: None,
            created_at,
            html_url: format!("https://github.test/runs/{id}"),
            head_branch: Some("master".to_string()),
        }
    }

    fn completed(id: u64, created_at: DateTime<Utc>, conclusion: &str) -> WorkflowRun {
        WorkflowRun {
            conclusion: Some(conclusion.to_string()),
            ..run_created(id, created_at, "completed")
        }
    }

    #[test]
    fn test_select_rejects_stale_runs() {
        let t0 = Utc::now();
        let stale = run_created(1, t0 - chrono::Duration::minutes(10), "completed");
        let fresh = run_created(2, t0 + chrono::Duration::seconds(30), "queued");
        let runs = vec![stale, fresh];
        let selected = select_dispatched_run(&runs, t0, chrono::Duration::minutes(5));
        assert_eq!(selected.map(|r| r.id), Some(2));
    }

    #[test]
    fn test_select_allows_skew_before_dispatch() {
        let t0 = Utc::now();
        let slightly_before = run_created(3, t0 - chrono::Duration::minutes(2), "queued");
        let runs = vec![slightly_before];
        let selected = select_dispatched_run(&runs, t0, chrono::Duration::minutes(5));
        assert_eq!(selected.map(|r| r.id), Some(3));
        assert!(select_dispatched_run(&runs, t0, chrono::Duration::minutes(1)).is_none());
    }

    #[tokio::test]
    async fn test_trigger_and_await_success() {
        let gh = FakeGithub::new();
        let sleeper = InstantSleeper::default();
        let now = Utc::now();
        gh.seed_workflow_run("publish.yml", run_created(7, now, "in_progress"));
        gh.seed_run_states(
            7,
            vec![
                run_created(7, now, "in_progress"),
                completed(7, now, "success"),
            ],
        );

        let spec = DispatchSpec::publish_artifacts("publish.yml", "master", "11.44.2.12345", 9, true);
        let done = trigger_and_await(&gh, &sleeper, &spec, &MonitorPolicy::default())
            .await
            .unwrap();
        assert_eq!(done.run_id, 7);
        assert_eq!(done.conclusion, "success");

        let dispatches = gh.dispatches();
        assert_eq!(dispatches.len(), 1);
        assert_eq!(dispatches[0].1, "publish.yml");
        assert_eq!(dispatches[0].3["tag"], "11.44.2.12345");
        assert_eq!(dispatches[0].3["dryRun"], "true");
    }

    #[tokio::test]
    async fn test_trigger_and_await_failure_carries_url() {
        let gh = FakeGithub::new();
        let sleeper = InstantSleeper::default();
        let now = Utc::now();
        gh.seed_workflow_run("publish.yml", run_created(8, now, "queued"));
        gh.seed_run_states(8, vec![completed(8, now, "failure")]);

        let spec = DispatchSpec::publish_artifacts("publish.yml", "master", "11.44.2.12345", 9, false);
        let err = trigger_and_await(&gh, &sleeper, &spec, &MonitorPolicy::default())
            .await
            .unwrap_err();
        match err {
            GithubError::RunFailed { conclusion, url } => {
                assert_eq!(conclusion, "failure");
                assert_eq!(url, "https://github.test/runs/8");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_timeout_when_no_run_appears() {
        let gh = FakeGithub::new();
        let sleeper = InstantSleeper::default();
        // only a stale run exists
        gh.seed_workflow_run(
            "publish.yml",
            run_created(9, Utc::now() - chrono::Duration::minutes(10), "completed"),
        );

        let spec = DispatchSpec::publish_artifacts("publish.yml", "master", "11.44.2.12345", 9, true);
        let err = trigger_and_await(&gh, &sleeper, &spec, &MonitorPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GithubError::DispatchTimeout { .. }));
        // 2 min ceiling at 10s interval
        assert_eq!(sleeper.sleep_count(), 12);
    }

    #[tokio::test]
    async fn test_run_timeout_when_never_terminal() {
        let gh = FakeGithub::new();
        let sleeper = InstantSleeper::default();
        let now = Utc::now();
        gh.seed_workflow_run("publish.yml", run_created(10, now, "in_progress"));
        gh.seed_run_states(10, vec![run_created(10, now, "in_progress")]);

        let policy = MonitorPolicy {
            poll_interval: Duration::from_secs(10),
            dispatch_timeout: Duration::from_secs(30),
            run_timeout: Duration::from_secs(60),
            skew: chrono::Duration::minutes(5),
        };
        let spec = DispatchSpec::publish_artifacts("publish.yml", "master", "11.44.2.12345", 9, true);
        let err = trigger_and_await(&gh, &sleeper, &spec, &policy)
            .await
            .unwrap_err();
        match err {
            GithubError::RunTimeout {
                run_id,
                url,
                waited_secs,
            } => {
                assert_eq!(run_id, 10);
                assert_eq!(url, "https://github.test/runs/10");
                assert_eq!(waited_secs, 60);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
