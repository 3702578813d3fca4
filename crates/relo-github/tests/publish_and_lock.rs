use relo_github::model::{
    EnabledFlag, RequiredPullRequestReviews, RequiredStatusChecks,
};
use relo_github::fakes::FakeGithub;
use relo_github::{
    check_releasability, protection, publish, resolve_version, BranchProtection, GithubApi,
    GithubError, PublishAction, ReleaseSpec,
};

fn release_spec(draft: bool) -> ReleaseSpec {
    ReleaseSpec {
        project_name: "SonarIaC".to_string(),
        version: "11.44.2.12345".to_string(),
        branch: "master".to_string(),
        body: "# Release notes".to_string(),
        draft,
    }
}

// ---- the release lifecycle across re-runs ----

#[tokio::test]
async fn release_lifecycle_across_reruns() {
    let gh = FakeGithub::new();

    // first run publishes the draft
    let draft = publish(&gh, &release_spec(true)).await.unwrap();
    assert_eq!(draft.action, PublishAction::Created);
    assert_eq!(gh.releases().len(), 1);

    // a retried run finds the title and leaves it alone
    let again = publish(&gh, &release_spec(true)).await.unwrap();
    assert_eq!(again.action, PublishAction::SkippedExisting);
    assert_eq!(again.id, draft.id);
    assert_eq!(gh.releases().len(), 1);

    // cutting the final release promotes the same draft
    let published = publish(&gh, &release_spec(false)).await.unwrap();
    assert_eq!(published.action, PublishAction::PromotedDraft);
    assert_eq!(published.id, draft.id);
    assert!(!gh.releases()[0].draft);

    // a second final attempt cannot publish the title twice
    let err = publish(&gh, &release_spec(false)).await.unwrap_err();
    match err {
        GithubError::DuplicateRelease { title, url } => {
            assert_eq!(title, "SonarIaC 11.44.2.12345");
            assert_eq!(url, published.url);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(gh.releases().len(), 1);
}

// ---- freeze, release reads, thaw ----

#[tokio::test]
async fn freeze_cycle_preserves_protection_settings() {
    let gh = FakeGithub::new();
    gh.seed_protection(
        "master",
        BranchProtection {
            required_status_checks: Some(RequiredStatusChecks {
                strict: true,
                contexts: vec!["ci/build".to_string(), "releasability".to_string()],
            }),
            enforce_admins: Some(EnabledFlag { enabled: true }),
            required_pull_request_reviews: Some(RequiredPullRequestReviews {
                dismiss_stale_reviews: true,
                require_code_owner_reviews: false,
                required_approving_review_count: Some(2),
            }),
            ..BranchProtection::default()
        },
    );
    gh.seed_status("master", "releasability", "success", "all green");
    gh.seed_status("master", "ci/build", "success", "Build '11.44.2.12345' passed");

    let frozen = protection::set_lock(&gh, "master", true).await.unwrap();
    assert!(frozen.changed);

    // the branch still answers reads while frozen
    check_releasability(&gh, "master", "releasability").await.unwrap();
    let version = resolve_version(&gh, "master", "ci/").await.unwrap();
    assert_eq!(version, "11.44.2.12345");

    // freezing again is a no-op
    let refrozen = protection::set_lock(&gh, "master", true).await.unwrap();
    assert!(!refrozen.changed);
    assert_eq!(gh.protection_put_count(), 1);

    let thawed = protection::set_lock(&gh, "master", false).await.unwrap();
    assert!(thawed.changed);
    assert_eq!(gh.protection_put_count(), 2);

    // every carried-over setting survived the round trip
    let after = gh.get_branch_protection("master").await.unwrap().unwrap();
    assert!(!after.locked());
    let checks = after.required_status_checks.unwrap();
    assert!(checks.strict);
    assert_eq!(
        checks.contexts,
        vec!["ci/build".to_string(), "releasability".to_string()]
    );
    let reviews = after.required_pull_request_reviews.unwrap();
    assert!(reviews.dismiss_stale_reviews);
    assert_eq!(reviews.required_approving_review_count, Some(2));
}
