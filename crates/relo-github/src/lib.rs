//! relo-github - Source-host side of the release orchestration
//!
//! Provides the host client and the release operations built on it:
//! - `status`: build-version resolution and releasability from commit
//!   statuses
//! - `release`: title-deduplicated release publishing with draft
//!   promotion
//! - `protection`: branch lock/unlock preserving existing protection
//! - `workflow`: workflow dispatch plus the bounded monitor that waits
//!   for the triggered run
//!
//! All operations go through the `GithubApi` trait; `GithubClient` is the
//! reqwest implementation and `fakes::FakeGithub` the in-memory one for
//! tests.

pub mod api;
pub mod client;
mod error;
pub mod fakes;
pub mod model;
pub mod protection;
pub mod release;
pub mod status;
pub mod workflow;

pub use api::GithubApi;
pub use client::{GithubClient, GithubConfig, GITHUB_API_URL, GITHUB_API_VERSION};
pub use error::{GithubError, Result};
pub use model::{BranchProtection, CommitStatus, Release, WorkflowRun};
pub use protection::{set_lock, LockTransition};
pub use release::{publish, PublishAction, PublishedRelease, ReleaseSpec};
pub use status::{
    check_releasability, resolve_version, DEFAULT_BUILD_CONTEXT_PREFIX,
    DEFAULT_RELEASABILITY_CONTEXT,
};
pub use workflow::{
    select_dispatched_run, trigger_and_await, CompletedRun, DispatchSpec, MonitorPolicy, Sleeper,
    TokioSleeper,
};
