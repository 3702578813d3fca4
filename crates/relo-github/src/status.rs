//! Version resolution from commit statuses
//!
//! CI publishes the build version inside a commit-status description,
//! quoted in single quotes (for example `Build '11.44.2.12345' passed`).
//! That status is the single source of truth for "what version are we
//! releasing"; nothing here writes anything.

use tracing::info;

use crate::api::GithubApi;
use crate::error::{GithubError, Result};

/// Context prefix the build status is published under.
pub const DEFAULT_BUILD_CONTEXT_PREFIX: &str = "ci/";
/// Context the releasability verdict is published under.
pub const DEFAULT_RELEASABILITY_CONTEXT: &str = "releasability";

/// Extract the release version from the newest build status of `branch`.
pub async fn resolve_version<G: GithubApi>(
    gh: &G,
    branch: &str,
    context_prefix: &str,
) -> Result<String> {
    let statuses = gh.list_commit_statuses(branch).await?;
    let status = statuses
        .iter()
        .find(|s| s.context.starts_with(context_prefix))
        .ok_or_else(|| GithubError::StatusNotFound {
            branch: branch.to_string(),
            context_prefix: context_prefix.to_string(),
        })?;

    let description = status.description.as_deref().unwrap_or_default();
    let token =
        extract_quoted(description).ok_or_else(|| GithubError::VersionParse {
            description: description.to_string(),
        })?;
    if token.is_empty() {
        return Err(GithubError::EmptyVersion {
            context: status.context.clone(),
        });
    }
    info!(branch = %branch, context = %status.context, version = %token, "resolved version");
    Ok(token)
}

/// Require the releasability status of `branch` to be successful.
pub async fn check_releasability<G: GithubApi>(gh: &G, branch: &str, context: &str) -> Result<()> {
    let statuses = gh.list_commit_statuses(branch).await?;
    let status = statuses
        .iter()
        .find(|s| s.context.starts_with(context))
        .ok_or_else(|| GithubError::StatusNotFound {
            branch: branch.to_string(),
            context_prefix: context.to_string(),
        })?;
    if status.state != "success" {
        return Err(GithubError::NotReleasable {
            branch: branch.to_string(),
            state: status.state.clone(),
            detail: status.description.clone().unwrap_or_default(),
        });
    }
    info!(branch = %branch, context = %status.context, "releasability check passed");
    Ok(())
}

/// First single-quoted token of a status description.
fn extract_quoted(description: &str) -> Option<String> {
    let re = regex::Regex::new(r"'([^']*)'").ok()?;
    re.captures(description)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeGithub;

    #[test]
    fn test_extract_quoted_token() {
        assert_eq!(
            extract_quoted("Build '11.44.2.12345' passed").as_deref(),
            Some("11.44.2.12345")
        );
        assert_eq!(extract_quoted("Build '' passed").as_deref(), Some(""));
        assert!(extract_quoted("Build passed").is_none());
    }

    #[tokio::test]
    async fn test_resolve_version_from_newest_matching_status() {
        let gh = FakeGithub::new();
        gh.seed_status("master", "releasability", "success", "all good");
        gh.seed_status("master", "ci/build", "success", "Build '11.44.2.12345' passed");
        gh.seed_status("master", "ci/build", "success", "Build '11.44.1.11111' passed");

        let version = resolve_version(&gh, "master", "ci/").await.unwrap();
        assert_eq!(version, "11.44.2.12345");
    }

    #[tokio::test]
    async fn test_resolve_version_errors() {
        let gh = FakeGithub::new();
        let err = resolve_version(&gh, "master", "ci/").await.unwrap_err();
        assert!(matches!(err, GithubError::StatusNotFound { .. }));

        gh.seed_status("master", "ci/build", "success", "Build passed");
        let err = resolve_version(&gh, "master", "ci/").await.unwrap_err();
        assert!(matches!(err, GithubError::VersionParse { .. }));

        gh.seed_status("master", "ci/build", "success", "Build '' passed");
        let err = resolve_version(&gh, "master", "ci/").await.unwrap_err();
        assert!(matches!(err, GithubError::EmptyVersion { .. }));
    }

    #[tokio::test]
    async fn test_releasability_requires_success() {
        let gh = FakeGithub::new();
        gh.seed_status("master", "releasability", "failure", "quality gate red");
        let err = check_releasability(&gh, "master", "releasability")
            .await
            .unwrap_err();
        match err {
            GithubError::NotReleasable { state, detail, .. } => {
                assert_eq!(state, "failure");
                assert_eq!(detail, "quality gate red");
            }
            other => panic!("unexpected error: {other}"),
        }

        gh.seed_status("master", "releasability", "success", "all green");
        check_releasability(&gh, "master", "releasability")
            .await
            .unwrap();
    }
}
