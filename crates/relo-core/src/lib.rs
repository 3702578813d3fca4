//! relo-core - Release orchestration core
//!
//! Ties the tracker, source-host and notification clients together into
//! one release run: configuration, version handling, the step machine and
//! the report it produces. The binary crate is a thin CLI over this.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod report;
pub mod target;
pub mod telemetry;
pub mod version;

pub use config::{
    compose_run_url, RunConfig, DEFAULT_ARTIFACTS_WORKFLOW, DEFAULT_BRANCH, DEFAULT_UPDATE_WORKFLOW,
};
pub use error::{ReleaseError, Result};
pub use orchestrator::{step, Orchestrator};
pub use output::RunOutputs;
pub use report::{RunReport, StepRecord, StepStatus};
pub use target::IntegrationTarget;
pub use telemetry::init_tracing;
pub use version::ReleaseVersion;
