//! Release publishing with duplicate-title policy
//!
//! The host does not enforce title uniqueness, so the publisher checks
//! first. Draft publishing is re-run safe: an existing same-title release
//! short-circuits to its URL. Final publishing promotes a same-title draft
//! and refuses to double-publish.

use tracing::{info, warn};

use crate::api::GithubApi;
use crate::error::{GithubError, Result};
use crate::model::CreateRelease;

/// What a release should look like. `version` doubles as the tag.
#[derive(Debug, Clone)]
pub struct ReleaseSpec {
    pub project_name: String,
    pub version: String,
    pub branch: String,
    pub body: String,
    pub draft: bool,
}

impl ReleaseSpec {
    /// Release title, `"{project} {version}"`.
    pub fn title(&self) -> String {
        format!("{} {}", self.project_name, self.version)
    }
}

/// How the publisher satisfied the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishAction {
    Created,
    SkippedExisting,
    PromotedDraft,
}

/// Outcome of a publish call.
#[derive(Debug, Clone)]
pub struct PublishedRelease {
    pub id: u64,
    pub url: String,
    pub action: PublishAction,
}

/// Publish a release according to the duplicate-title policy.
pub async fn publish<G: GithubApi>(gh: &G, spec: &ReleaseSpec) -> Result<PublishedRelease> {
    let title = spec.title();
    let releases = gh.list_releases().await?;
    let existing = releases
        .into_iter()
        .find(|r| r.name.as_deref() == Some(title.as_str()));

    if let Some(existing) = existing {
        if spec.draft {
            warn!(title = %title, url = %existing.html_url,
                "release with this title already exists, skipping draft creation");
            return Ok(PublishedRelease {
                id: existing.id,
                url: existing.html_url,
                action: PublishAction::SkippedExisting,
            });
        }
        if existing.draft {
            let promoted = gh.update_release_draft(existing.id, false).await?;
            info!(title = %title, url = %promoted.html_url, "existing draft promoted to published");
            return Ok(PublishedRelease {
                id: promoted.id,
                url: promoted.html_url,
                action: PublishAction::PromotedDraft,
            });
        }
        return Err(GithubError::DuplicateRelease {
            title,
            url: existing.html_url,
        });
    }

    let created = gh
        .create_release(&CreateRelease {
            tag_name: spec.version.clone(),
            target_commitish: spec.branch.clone(),
            name: Some(title.clone()),
            body: Some(spec.body.clone()),
            draft: spec.draft,
            prerelease: false,
        })
        .await?;
    info!(title = %title, url = %created.html_url, draft = spec.draft, "release created");
    Ok(PublishedRelease {
        id: created.id,
        url: created.html_url,
        action: PublishAction::Created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeGithub;

    fn spec(draft: bool) -> ReleaseSpec {
        ReleaseSpec {
            project_name: "SonarIaC".to_string(),
            version: "11.44.2.12345".to_string(),
            branch: "master".to_string(),
            body: "notes".to_string(),
            draft,
        }
    }

    #[tokio::test]
    async fn test_publish_creates_when_title_is_new() {
        let gh = FakeGithub::new();
        let result = publish(&gh, &spec(true)).await.unwrap();
        assert_eq!(result.action, PublishAction::Created);
        let releases = gh.releases();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].name.as_deref(), Some("SonarIaC 11.44.2.12345"));
        assert!(releases[0].draft);
        assert_eq!(releases[0].tag_name, "11.44.2.12345");
    }

    #[tokio::test]
    async fn test_draft_publish_skips_existing_title() {
        let gh = FakeGithub::new();
        gh.seed_release("SonarIaC 11.44.2.12345", true);
        let result = publish(&gh, &spec(true)).await.unwrap();
        assert_eq!(result.action, PublishAction::SkippedExisting);
        assert_eq!(gh.releases().len(), 1);
    }

    #[tokio::test]
    async fn test_final_publish_promotes_existing_draft() {
        let gh = FakeGithub::new();
        let id = gh.seed_release("SonarIaC 11.44.2.12345", true);
        let result = publish(&gh, &spec(false)).await.unwrap();
        assert_eq!(result.action, PublishAction::PromotedDraft);
        assert_eq!(result.id, id);
        let releases = gh.releases();
        assert_eq!(releases.len(), 1);
        assert!(!releases[0].draft);
    }

    #[tokio::test]
    async fn test_final_publish_fails_on_published_duplicate() {
        let gh = FakeGithub::new();
        gh.seed_release("SonarIaC 11.44.2.12345", false);
        let err = publish(&gh, &spec(false)).await.unwrap_err();
        assert!(matches!(err, GithubError::DuplicateRelease { .. }));
        assert_eq!(gh.releases().len(), 1);
    }
}
