use relo_jira::fakes::FakeJira;
use relo_jira::model::ProjectVersion;
use relo_jira::tickets::{self, IntegrationTicketInput, ReleaseTicketInput};
use relo_jira::versions;
use relo_jira::JiraApi;

fn seeded_tracker() -> FakeJira {
    let jira = FakeJira::new();
    jira.seed_versions(
        "SONARIAC",
        vec![ProjectVersion {
            id: "500".to_string(),
            name: "11.44".to_string(),
            released: false,
            release_date: None,
        }],
    );
    jira.seed_issue_types("SONAR", &[("3", "Task"), ("5", "Bug")]);
    jira.seed_user("pm@sonarsource.com", "acct-42");
    jira
}

// ---- release ticket through its whole lifecycle ----

#[tokio::test]
async fn release_ticket_full_flow() {
    let jira = seeded_tracker();

    let input = ReleaseTicketInput::new("SONARIAC", "SonarIaC", "11.44", "Maintenance release");
    let ticket = tickets::create_release_ticket(&jira, &input).await.unwrap();
    assert_eq!(ticket.key, "REL-1");
    assert_eq!(ticket.url, format!("{}/browse/REL-1", jira.server_url()));

    jira.seed_transitions("REL-1", &[("21", "Start Progress")]);
    tickets::transition_status(&jira, "REL-1", "Start Progress")
        .await
        .unwrap();
    assert_eq!(jira.applied_transitions("REL-1"), vec!["21".to_string()]);

    tickets::reassign(&jira, "REL-1", "pm@sonarsource.com")
        .await
        .unwrap();
    assert_eq!(
        jira.assignments(),
        vec![("REL-1".to_string(), "acct-42".to_string())]
    );
}

// ---- integration ticket linked back to the release ticket ----

#[tokio::test]
async fn integration_ticket_links_to_release_ticket() {
    let jira = seeded_tracker();
    let release = tickets::create_release_ticket(
        &jira,
        &ReleaseTicketInput::new("SONARIAC", "SonarIaC", "11.44", "notes"),
    )
    .await
    .unwrap();

    let mut input = IntegrationTicketInput::new("SONAR", "Update SonarIaC to 11.44", &release.key);
    input.description = Some("Bump the analyzer".to_string());
    let integration = tickets::create_integration_ticket(&jira, &input)
        .await
        .unwrap();

    assert_eq!(integration.key, "SONAR-1");
    let links = jira.links();
    assert_eq!(
        links,
        vec![(
            "relates to".to_string(),
            "SONAR-1".to_string(),
            "REL-1".to_string()
        )]
    );
    let updates = jira.field_updates("SONAR-1");
    assert_eq!(updates[0]["description"], "Bump the analyzer");
}

// ---- version rollover after the ticket work ----

#[tokio::test]
async fn rollover_after_release() {
    let jira = seeded_tracker();
    let rollover = versions::release_and_create_next(&jira, "SONARIAC", "11.44", None)
        .await
        .unwrap();
    assert_eq!(rollover.released, "11.44");
    assert_eq!(rollover.created, "11.45");

    let names: Vec<(String, bool)> = jira
        .versions_of("SONARIAC")
        .into_iter()
        .map(|v| (v.name, v.released))
        .collect();
    assert_eq!(
        names,
        vec![("11.44".to_string(), true), ("11.45".to_string(), false)]
    );
}
