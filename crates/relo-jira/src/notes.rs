//! Release-notes rendering
//!
//! Pulls every issue fixed in a version and renders the markdown body used
//! for the source-host release, grouped by issue type in a fixed preferred
//! order. Types outside the configured order are not rendered.

use tracing::debug;

use crate::api::JiraApi;
use crate::error::Result;
use crate::model::Ticket;
use crate::versions;

/// Categories rendered by default, in this order.
pub const DEFAULT_TYPE_ORDER: [&str; 5] = [
    "New Feature",
    "False Positive",
    "False Negative",
    "Bug",
    "Improvement",
];

/// Body shown when a version has no issues at all.
pub const EMPTY_NOTES: &str = "No issues found for this release.";

/// Rendered notes plus the tracker's release-report URL when the version
/// exists.
#[derive(Debug, Clone)]
pub struct ReleaseNotes {
    pub markdown: String,
    pub url: Option<String>,
}

/// Fetch and render the notes for `version_name` of a project.
pub async fn fetch_release_notes<J: JiraApi>(
    jira: &J,
    project_key: &str,
    project_name: &str,
    version_name: &str,
    type_order: Option<&[String]>,
) -> Result<ReleaseNotes> {
    let jql = format!(
        r#"project = "{project_key}" AND fixVersion = "{version_name}" ORDER BY issuetype ASC, key ASC"#
    );
    let issues = jira.search_issues(&jql, &["summary", "issuetype"]).await?;
    debug!(project = %project_key, version = %version_name, issues = issues.len(),
        "fetched issues for release notes");

    let default_order: Vec<String> = DEFAULT_TYPE_ORDER.iter().map(|s| s.to_string()).collect();
    let order = type_order.unwrap_or(default_order.as_slice());
    let markdown = render_markdown(jira.server_url(), project_name, version_name, &issues, order);

    let url = jira
        .project_versions(project_key)
        .await?
        .into_iter()
        .find(|v| v.name == version_name)
        .map(|v| versions::report_url(jira.server_url(), project_key, &v.id));

    Ok(ReleaseNotes { markdown, url })
}

/// Render the markdown body from already-fetched issues.
pub fn render_markdown(
    server: &str,
    project_name: &str,
    version_name: &str,
    issues: &[Ticket],
    type_order: &[String],
) -> String {
    if issues.is_empty() {
        return EMPTY_NOTES.to_string();
    }

    let mut out = String::new();
    out.push_str(&format!(
        "# Release notes - {project_name} - {version_name}\n\n"
    ));
    for category in type_order {
        let group: Vec<&Ticket> = issues
            .iter()
            .filter(|issue| {
                issue
                    .fields
                    .issue_type
                    .as_ref()
                    .is_some_and(|t| &t.name == category)
            })
            .collect();
        if group.is_empty() {
            continue;
        }
        out.push_str(&format!("### {category}\n"));
        for issue in group {
            let summary = issue.fields.summary.as_deref().unwrap_or_default();
            out.push_str(&format!(
                "[{key}]({server}/browse/{key}) {summary}\n",
                key = issue.key
            ));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeJira;
    use crate::model::{IssueType, ProjectVersion, TicketFields};

    fn issue(key: &str, issue_type: &str, summary: &str) -> Ticket {
        Ticket {
            id: key.to_string(),
            key: key.to_string(),
            fields: TicketFields {
                summary: Some(summary.to_string()),
                issue_type: Some(IssueType {
                    id: "1".to_string(),
                    name: issue_type.to_string(),
                }),
                ..TicketFields::default()
            },
        }
    }

    #[test]
    fn test_render_groups_in_preferred_order() {
        let issues = vec![
            issue("IAC-2", "Improvement", "Better diagnostics"),
            issue("IAC-1", "Bug", "Fix parser crash"),
            issue("IAC-3", "New Feature", "Support S3 rules"),
        ];
        let order: Vec<String> = DEFAULT_TYPE_ORDER.iter().map(|s| s.to_string()).collect();
        let md = render_markdown("https://jira.test", "SonarIaC", "11.44", &issues, &order);

        assert!(md.starts_with("# Release notes - SonarIaC - 11.44\n\n"));
        let feature_at = md.find("### New Feature").unwrap();
        let bug_at = md.find("### Bug").unwrap();
        let improvement_at = md.find("### Improvement").unwrap();
        assert!(feature_at < bug_at && bug_at < improvement_at);
        assert!(!md.contains("### False Positive"));
        assert!(md.contains("[IAC-1](https://jira.test/browse/IAC-1) Fix parser crash\n"));
    }

    #[test]
    fn test_render_skips_types_outside_order() {
        let issues = vec![issue("IAC-9", "Task", "Internal chore")];
        let order = vec!["Bug".to_string()];
        let md = render_markdown("https://jira.test", "SonarIaC", "11.44", &issues, &order);
        assert!(!md.contains("IAC-9"));
    }

    #[test]
    fn test_render_empty_placeholder() {
        let md = render_markdown("https://jira.test", "SonarIaC", "11.44", &[], &[]);
        assert_eq!(md, EMPTY_NOTES);
    }

    #[tokio::test]
    async fn test_fetch_builds_jql_and_url() {
        let jira = FakeJira::new();
        jira.seed_versions(
            "SONARIAC",
            vec![ProjectVersion {
                id: "77".to_string(),
                name: "11.44".to_string(),
                released: false,
                release_date: None,
            }],
        );
        jira.seed_search_results(vec![issue("IAC-1", "Bug", "Fix parser crash")]);

        let notes = fetch_release_notes(&jira, "SONARIAC", "SonarIaC", "11.44", None)
            .await
            .unwrap();
        assert!(jira.last_jql().contains(r#"fixVersion = "11.44""#));
        assert!(notes.markdown.contains("### Bug"));
        assert_eq!(
            notes.url.as_deref(),
            Some("https://jira.test/projects/SONARIAC/versions/77/tab/release-report-all-issues")
        );
    }
}
