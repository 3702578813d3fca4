//! Version lifecycle operations
//!
//! Auto-selection of "the" unreleased version is strict: exactly one
//! candidate, otherwise the caller gets the candidate list and must name
//! one explicitly. Guessing here has shipped the wrong release notes
//! before.

use chrono::Utc;
use tracing::{info, warn};

use crate::api::JiraApi;
use crate::error::{JiraError, Result};
use crate::model::ProjectVersion;

/// Version selected for release-notes purposes, with its report page URL.
#[derive(Debug, Clone)]
pub struct NotesVersion {
    pub id: String,
    pub name: String,
    pub report_url: String,
}

/// Outcome of the release-then-create-next rollover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRollover {
    pub released: String,
    pub created: String,
}

/// URL of the tracker's per-version release report.
pub fn report_url(server: &str, project_key: &str, version_id: &str) -> String {
    format!("{server}/projects/{project_key}/versions/{version_id}/tab/release-report-all-issues")
}

/// Resolve the version whose release notes a ticket should point at.
///
/// With an explicit name the version must exist and still be unreleased.
/// Without one there must be exactly one unreleased version.
pub async fn resolve_notes_version<J: JiraApi>(
    jira: &J,
    project_key: &str,
    explicit: Option<&str>,
) -> Result<NotesVersion> {
    let versions = jira.project_versions(project_key).await?;
    let version = match explicit {
        Some(name) => {
            let found = versions
                .iter()
                .find(|v| v.name == name)
                .ok_or_else(|| JiraError::VersionNotFound {
                    project: project_key.to_string(),
                    name: name.to_string(),
                })?;
            if found.released {
                return Err(JiraError::AlreadyReleased {
                    project: project_key.to_string(),
                    name: name.to_string(),
                });
            }
            found.clone()
        }
        None => {
            let unreleased: Vec<&ProjectVersion> =
                versions.iter().filter(|v| !v.released).collect();
            match unreleased.as_slice() {
                [] => return Err(JiraError::NoUnreleasedVersion(project_key.to_string())),
                [only] => (*only).clone(),
                many => {
                    return Err(JiraError::AmbiguousUnreleasedVersion {
                        project: project_key.to_string(),
                        candidates: many.iter().map(|v| v.name.clone()).collect(),
                    })
                }
            }
        }
    };
    Ok(NotesVersion {
        report_url: report_url(jira.server_url(), project_key, &version.id),
        id: version.id,
        name: version.name,
    })
}

/// Next version name: last dot-component incremented by one.
pub fn increment_last_component(name: &str) -> Result<String> {
    let mut parts: Vec<&str> = name.split('.').collect();
    let last = parts
        .pop()
        .and_then(|p| p.parse::<u64>().ok())
        .ok_or_else(|| JiraError::VersionIncrement(name.to_string()))?;
    let next = (last + 1).to_string();
    parts.push(&next);
    Ok(parts.join("."))
}

/// Mark `version_name` released (dated today) and create the follow-up
/// version. Both halves tolerate the tracker already being in the target
/// state: an already-released version and an already-existing next name
/// are warnings, not failures, so re-runs converge.
pub async fn release_and_create_next<J: JiraApi>(
    jira: &J,
    project_key: &str,
    version_name: &str,
    next_name: Option<&str>,
) -> Result<VersionRollover> {
    let versions = jira.project_versions(project_key).await?;
    let current = versions
        .iter()
        .find(|v| v.name == version_name)
        .ok_or_else(|| JiraError::VersionNotFound {
            project: project_key.to_string(),
            name: version_name.to_string(),
        })?;

    if current.released {
        warn!(project = %project_key, version = %version_name,
            "version is already released, skipping release step");
    } else {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        jira.update_version(&current.id, true, Some(&today)).await?;
        info!(project = %project_key, version = %version_name, date = %today,
            "version released");
    }

    let next = match next_name {
        Some(name) => name.to_string(),
        None => increment_last_component(version_name)?,
    };
    match jira.create_version(project_key, &next).await {
        Ok(_) => {
            info!(project = %project_key, version = %next, "next version created");
        }
        Err(err) if is_name_taken(&err) => {
            warn!(project = %project_key, version = %next,
                "next version already exists, reusing it");
        }
        Err(err) => return Err(err),
    }

    Ok(VersionRollover {
        released: version_name.to_string(),
        created: next,
    })
}

/// Create a version, reusing the existing one when the name is taken.
pub async fn ensure_version<J: JiraApi>(
    jira: &J,
    project_key: &str,
    name: &str,
) -> Result<ProjectVersion> {
    match jira.create_version(project_key, name).await {
        Ok(version) => Ok(version),
        Err(err) if is_name_taken(&err) => {
            warn!(project = %project_key, version = %name,
                "version already exists, returning the existing one");
            let versions = jira.project_versions(project_key).await?;
            versions
                .into_iter()
                .find(|v| v.name == name)
                .ok_or_else(|| JiraError::VersionNotFound {
                    project: project_key.to_string(),
                    name: name.to_string(),
                })
        }
        Err(err) => Err(err),
    }
}

fn is_name_taken(err: &JiraError) -> bool {
    matches!(err, JiraError::Api { body, .. } if body.contains("already exists"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeJira;

    fn version(id: &str, name: &str, released: bool) -> ProjectVersion {
        ProjectVersion {
            id: id.to_string(),
            name: name.to_string(),
            released,
            release_date: None,
        }
    }

    #[test]
    fn test_increment_last_component() {
        assert_eq!(increment_last_component("11.44").unwrap(), "11.45");
        assert_eq!(increment_last_component("1.2.3").unwrap(), "1.2.4");
        assert_eq!(increment_last_component("9").unwrap(), "10");
        assert!(increment_last_component("11.x").is_err());
    }

    #[tokio::test]
    async fn test_resolve_requires_exactly_one_unreleased() {
        let jira = FakeJira::new();
        jira.seed_versions("SONARIAC", vec![version("1", "11.43", true)]);
        let err = resolve_notes_version(&jira, "SONARIAC", None)
            .await
            .unwrap_err();
        assert!(matches!(err, JiraError::NoUnreleasedVersion(_)));

        jira.seed_versions(
            "SONARIAC",
            vec![
                version("1", "11.43", true),
                version("2", "11.44", false),
                version("3", "11.45", false),
            ],
        );
        let err = resolve_notes_version(&jira, "SONARIAC", None)
            .await
            .unwrap_err();
        match err {
            JiraError::AmbiguousUnreleasedVersion { candidates, .. } => {
                assert_eq!(candidates, vec!["11.44".to_string(), "11.45".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }

        jira.seed_versions(
            "SONARIAC",
            vec![version("1", "11.43", true), version("2", "11.44", false)],
        );
        let resolved = resolve_notes_version(&jira, "SONARIAC", None).await.unwrap();
        assert_eq!(resolved.name, "11.44");
        assert!(resolved.report_url.ends_with("/versions/2/tab/release-report-all-issues"));
    }

    #[tokio::test]
    async fn test_resolve_explicit_must_be_unreleased() {
        let jira = FakeJira::new();
        jira.seed_versions("SONARIAC", vec![version("1", "11.43", true)]);
        let err = resolve_notes_version(&jira, "SONARIAC", Some("11.43"))
            .await
            .unwrap_err();
        assert!(matches!(err, JiraError::AlreadyReleased { .. }));
        let err = resolve_notes_version(&jira, "SONARIAC", Some("11.99"))
            .await
            .unwrap_err();
        assert!(matches!(err, JiraError::VersionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_rollover_releases_and_creates_next() {
        let jira = FakeJira::new();
        jira.seed_versions("SONARIAC", vec![version("2", "11.44", false)]);
        let rollover = release_and_create_next(&jira, "SONARIAC", "11.44", None)
            .await
            .unwrap();
        assert_eq!(rollover.released, "11.44");
        assert_eq!(rollover.created, "11.45");

        let versions = jira.versions_of("SONARIAC");
        let released = versions.iter().find(|v| v.name == "11.44").unwrap();
        assert!(released.released);
        assert!(released.release_date.is_some());
        assert!(versions.iter().any(|v| v.name == "11.45" && !v.released));
    }

    #[tokio::test]
    async fn test_rollover_skips_already_released_version() {
        let jira = FakeJira::new();
        jira.seed_versions("SONARIAC", vec![version("2", "11.44", true)]);
        let rollover = release_and_create_next(&jira, "SONARIAC", "11.44", Some("12.0"))
            .await
            .unwrap();
        assert_eq!(rollover.created, "12.0");
        assert_eq!(jira.version_update_calls(), 0);
    }

    #[tokio::test]
    async fn test_rollover_tolerates_existing_next_name() {
        let jira = FakeJira::new();
        jira.seed_versions(
            "SONARIAC",
            vec![version("2", "11.44", false), version("3", "11.45", false)],
        );
        let rollover = release_and_create_next(&jira, "SONARIAC", "11.44", None)
            .await
            .unwrap();
        assert_eq!(rollover.created, "11.45");
        // one 11.45 only, the pre-existing entry
        let count = jira
            .versions_of("SONARIAC")
            .iter()
            .filter(|v| v.name == "11.45")
            .count();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_ensure_version_reuses_existing() {
        let jira = FakeJira::new();
        jira.seed_versions("SONARIAC", vec![version("2", "11.44", false)]);
        let existing = ensure_version(&jira, "SONARIAC", "11.44").await.unwrap();
        assert_eq!(existing.id, "2");
        let fresh = ensure_version(&jira, "SONARIAC", "11.50").await.unwrap();
        assert_eq!(fresh.name, "11.50");
    }
}
