//! Resolved run configuration
//!
//! Everything a release run needs to know is gathered here once, before
//! the first network call. Explicit values always win; `resolve` only
//! fills what is still unset from the CI environment. No other module
//! reads environment variables at run time.

use std::path::PathBuf;

use crate::target::IntegrationTarget;

/// Branch released from when none is given.
pub const DEFAULT_BRANCH: &str = "master";
/// Workflow that builds and uploads the release artifacts.
pub const DEFAULT_ARTIFACTS_WORKFLOW: &str = "publish-release.yml";
/// Workflow dispatched in downstream repositories to bump the analyzer.
pub const DEFAULT_UPDATE_WORKFLOW: &str = "update-analyzer.yml";

/// Inputs of one release run, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Tracker project of the released product, e.g. `SONARIAC`
    pub project_key: String,
    /// Display name of the released product, e.g. `SonarIaC`
    pub project_name: String,
    /// One-line description shown on the release ticket
    pub short_description: String,
    /// Branch the release is cut from
    pub branch: String,
    /// Use the sandbox tracker instance
    pub sandbox: bool,
    /// Publish the source-host release as a draft
    pub draft: bool,
    /// Step 1/10: freeze the branch for the duration of the run
    pub lock_branch: bool,
    /// Step 2: require a green releasability status before anything else
    pub check_releasability: bool,
    /// Step 4: render release notes from the tracker
    pub generate_notes: bool,
    /// Step 6b: trigger and await the artifact-publishing workflow
    pub publish_artifacts: bool,
    /// Steps 8-9: downstream products to open tickets and dispatches for
    pub integrations: Vec<IntegrationTarget>,
    /// Explicit build version; resolved from the branch status when unset
    pub version: Option<String>,
    /// Explicit notes markdown; wins over tracker-rendered notes
    pub notes_markdown: Option<String>,
    /// Release ticket custom fields
    pub sq_compatibility: Option<String>,
    pub targeted_product: Option<String>,
    pub documentation_status: Option<String>,
    pub rule_props_changed: Option<bool>,
    pub sonarlint_changelog: Option<String>,
    /// Product manager the ticket is handed to after the release
    pub pm_email: Option<String>,
    /// Channel for freeze/unfreeze notices; no channel, no notification
    pub slack_channel: Option<String>,
    /// Link to the CI run driving this release
    pub run_url: Option<String>,
    /// Commit-status context prefix the build version is read from
    pub build_context_prefix: String,
    /// Commit-status context of the releasability verdict
    pub releasability_context: String,
    /// Artifact-publishing workflow file name
    pub artifacts_workflow: String,
    /// Downstream update workflow file name
    pub update_workflow: String,
    /// Ref the downstream update workflow runs on
    pub update_ref: String,
    /// CI output file the `key=value` lines are appended to
    pub output_path: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(project_key: &str, project_name: &str, short_description: &str) -> Self {
        RunConfig {
            project_key: project_key.to_string(),
            project_name: project_name.to_string(),
            short_description: short_description.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            sandbox: false,
            draft: false,
            lock_branch: false,
            check_releasability: true,
            generate_notes: true,
            publish_artifacts: false,
            integrations: Vec::new(),
            version: None,
            notes_markdown: None,
            sq_compatibility: None,
            targeted_product: None,
            documentation_status: None,
            rule_props_changed: None,
            sonarlint_changelog: None,
            pm_email: None,
            slack_channel: None,
            run_url: None,
            build_context_prefix: relo_github::DEFAULT_BUILD_CONTEXT_PREFIX.to_string(),
            releasability_context: relo_github::DEFAULT_RELEASABILITY_CONTEXT.to_string(),
            artifacts_workflow: DEFAULT_ARTIFACTS_WORKFLOW.to_string(),
            update_workflow: DEFAULT_UPDATE_WORKFLOW.to_string(),
            update_ref: DEFAULT_BRANCH.to_string(),
            output_path: None,
        }
    }

    /// Fill still-unset optional inputs from the CI environment: the run
    /// URL (composed from the standard `GITHUB_*` triple), the output file
    /// path and the notification channel. Values set before this call are
    /// kept as-is.
    pub fn resolve(mut self) -> Self {
        if self.run_url.is_none() {
            self.run_url = run_url_from_env();
        }
        if self.output_path.is_none() {
            self.output_path = std::env::var("GITHUB_OUTPUT").ok().map(PathBuf::from);
        }
        if self.slack_channel.is_none() {
            self.slack_channel = std::env::var("SLACK_CHANNEL").ok();
        }
        self
    }
}

fn run_url_from_env() -> Option<String> {
    let server = std::env::var("GITHUB_SERVER_URL").ok()?;
    let repository = std::env::var("GITHUB_REPOSITORY").ok()?;
    let run_id = std::env::var("GITHUB_RUN_ID").ok()?;
    Some(compose_run_url(&server, &repository, &run_id))
}

/// `{server}/{owner/repo}/actions/runs/{id}`
pub fn compose_run_url(server: &str, repository: &str, run_id: &str) -> String {
    format!(
        "{}/{repository}/actions/runs/{run_id}",
        server.trim_end_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::new("SONARIAC", "SonarIaC", "Regular release");
        assert_eq!(config.branch, "master");
        assert!(config.check_releasability);
        assert!(config.generate_notes);
        assert!(!config.lock_branch);
        assert!(!config.publish_artifacts);
        assert!(config.integrations.is_empty());
        assert_eq!(config.build_context_prefix, "ci/");
    }

    #[test]
    fn test_resolve_keeps_explicit_values() {
        let mut config = RunConfig::new("SONARIAC", "SonarIaC", "Regular release");
        config.run_url = Some("https://ci.test/runs/1".to_string());
        config.output_path = Some(PathBuf::from("/tmp/out"));
        config.slack_channel = Some("#releases".to_string());
        let resolved = config.resolve();
        assert_eq!(resolved.run_url.as_deref(), Some("https://ci.test/runs/1"));
        assert_eq!(resolved.output_path.as_deref(), Some(std::path::Path::new("/tmp/out")));
        assert_eq!(resolved.slack_channel.as_deref(), Some("#releases"));
    }

    #[test]
    fn test_compose_run_url() {
        assert_eq!(
            compose_run_url("https://github.com/", "acme/widget", "99"),
            "https://github.com/acme/widget/actions/runs/99"
        );
    }
}
