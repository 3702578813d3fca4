//! The release run itself
//!
//! Drives one release end to end: branch lock, releasability gate, version
//! and notes resolution, the release ticket, the source-host release,
//! artifact publishing, the tracker version rollover, downstream
//! integration work and the final handover. Every step is recorded in a
//! [`RunReport`]; artifacts created before a failure stay in the outputs
//! so a broken run still tells the operator what exists.
//!
//! Failure handling is asymmetric on purpose. Any failing step marks the
//! run failed and stops the remaining release steps, but the branch
//! unlock runs whenever the lock was acquired, and the output file is
//! written whenever there is something to write. A failed release must
//! never leave the branch frozen.

use std::time::Instant;

use serde_json::{json, Map};
use tracing::{error, info, warn};

use relo_github::{
    check_releasability, publish, resolve_version, set_lock, trigger_and_await, DispatchSpec,
    GithubApi, MonitorPolicy, ReleaseSpec, Sleeper, TokioSleeper,
};
use relo_jira::tickets::{
    create_integration_ticket, create_release_ticket, reassign, transition_status,
    IntegrationTicketInput, ReleaseTicketInput,
};
use relo_jira::versions::release_and_create_next;
use relo_jira::{notes, JiraApi, STATUS_START_PROGRESS, STATUS_TECHNICAL_RELEASE_DONE};
use relo_notify::{notify_lock_change, LockNotice, Notifier};

use crate::config::RunConfig;
use crate::error::{ReleaseError, Result};
use crate::report::RunReport;
use crate::version::ReleaseVersion;

/// Step names as they appear in reports and output summaries.
pub mod step {
    pub const VALIDATE: &str = "validate-inputs";
    pub const LOCK: &str = "lock-branch";
    pub const RELEASABILITY: &str = "releasability";
    pub const RESOLVE_VERSION: &str = "resolve-version";
    pub const RELEASE_NOTES: &str = "release-notes";
    pub const RELEASE_TICKET: &str = "release-ticket";
    pub const START_PROGRESS: &str = "start-progress";
    pub const PUBLISH_RELEASE: &str = "publish-release";
    pub const PUBLISH_ARTIFACTS: &str = "publish-artifacts";
    pub const VERSION_ROLLOVER: &str = "version-rollover";
    pub const HANDOVER: &str = "handover";
    pub const UNLOCK: &str = "unlock-branch";
    pub const WRITE_OUTPUTS: &str = "write-outputs";

    /// Per-target ticket step, e.g. `integration-ticket-sqs`.
    pub fn integration_ticket(prefix: &str) -> String {
        format!("integration-ticket-{prefix}")
    }

    /// Per-target dispatch step, e.g. `update-dispatch-sqs`.
    pub fn update_dispatch(prefix: &str) -> String {
        format!("update-dispatch-{prefix}")
    }
}

static REAL_CLOCK: TokioSleeper = TokioSleeper;

/// One configured release run over the tracker and source-host APIs.
///
/// The notifier and the sleeper are optional seams: without a notifier no
/// chat messages are sent, and the default sleeper is the real clock.
pub struct Orchestrator<'a, J: JiraApi, G: GithubApi> {
    jira: &'a J,
    github: &'a G,
    notifier: Option<&'a dyn Notifier>,
    sleeper: &'a dyn Sleeper,
    policy: MonitorPolicy,
}

impl<'a, J: JiraApi, G: GithubApi> Orchestrator<'a, J, G> {
    pub fn new(jira: &'a J, github: &'a G) -> Self {
        Orchestrator {
            jira,
            github,
            notifier: None,
            sleeper: &REAL_CLOCK,
            policy: MonitorPolicy::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: &'a dyn Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_sleeper(mut self, sleeper: &'a dyn Sleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_policy(mut self, policy: MonitorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run the release. Never returns an error: failures are recorded in
    /// the report and `report.success()` tells the caller how it went.
    pub async fn run(&self, config: &RunConfig) -> RunReport {
        let mut report = RunReport::new();
        info!(project = %config.project_key, branch = %config.branch,
            sandbox = config.sandbox, draft = config.draft, "release run started");

        if let Err(err) = validate(config) {
            error!(error = %err, "run aborted before any external call");
            report.failed(step::VALIDATE, &err.to_string(), 0);
            return report;
        }

        let mut lock_held = false;
        if config.lock_branch {
            let started = Instant::now();
            match set_lock(self.github, &config.branch, true).await {
                Ok(_) => {
                    lock_held = true;
                    report.succeeded(step::LOCK, ms(started));
                    self.notify_lock(config, true).await;
                }
                Err(err) => {
                    error!(branch = %config.branch, error = %err, "branch lock failed");
                    report.failed(step::LOCK, &err.to_string(), ms(started));
                }
            }
        } else {
            report.skipped(step::LOCK, "disabled");
        }

        if report.success() {
            self.release_steps(config, &mut report).await;
        }

        // The unlock is owed as soon as the lock was acquired, no matter
        // what happened in between.
        if lock_held {
            let started = Instant::now();
            match set_lock(self.github, &config.branch, false).await {
                Ok(_) => {
                    report.succeeded(step::UNLOCK, ms(started));
                    self.notify_lock(config, false).await;
                }
                Err(err) => {
                    error!(branch = %config.branch, error = %err,
                        "branch unlock failed, the branch needs a manual unfreeze");
                    report.failed(step::UNLOCK, &err.to_string(), ms(started));
                }
            }
        } else if config.lock_branch {
            report.skipped(step::UNLOCK, "lock was not acquired");
        } else {
            report.skipped(step::UNLOCK, "disabled");
        }

        self.write_outputs(config, &mut report);

        match report.failed_step() {
            None => info!(steps = report.passed_count(), "release run finished"),
            Some(failed) => {
                error!(step = %failed.step, "release run failed");
            }
        }
        report
    }

    /// Steps between lock and unlock. The first failure records itself and
    /// returns; everything after it never runs.
    async fn release_steps(&self, config: &RunConfig, report: &mut RunReport) {
        // Releasability gate
        if config.check_releasability {
            let started = Instant::now();
            match check_releasability(self.github, &config.branch, &config.releasability_context)
                .await
            {
                Ok(()) => report.succeeded(step::RELEASABILITY, ms(started)),
                Err(err) => {
                    report.failed(step::RELEASABILITY, &err.to_string(), ms(started));
                    return;
                }
            }
        } else {
            report.skipped(step::RELEASABILITY, "disabled");
        }

        // Build version, explicit or read from the branch status
        let started = Instant::now();
        let resolved = match &config.version {
            Some(explicit) => ReleaseVersion::parse(explicit),
            None => {
                match resolve_version(self.github, &config.branch, &config.build_context_prefix)
                    .await
                {
                    Ok(raw) => ReleaseVersion::parse(&raw),
                    Err(err) => Err(err.into()),
                }
            }
        };
        let version = match resolved {
            Ok(version) => {
                report.outputs.set("version", version.full());
                report.outputs.set("short_version", &version.short());
                report.succeeded(step::RESOLVE_VERSION, ms(started));
                version
            }
            Err(err) => {
                report.failed(step::RESOLVE_VERSION, &err.to_string(), ms(started));
                return;
            }
        };
        let short = version.short();

        // Release notes
        let mut notes_body = String::new();
        let mut notes_url = None;
        if let Some(explicit) = &config.notes_markdown {
            notes_body = explicit.clone();
            report.skipped(step::RELEASE_NOTES, "explicit notes provided");
        } else if config.generate_notes {
            let started = Instant::now();
            let fetched = notes::fetch_release_notes(
                self.jira,
                &config.project_key,
                &config.project_name,
                &short,
                None,
            )
            .await;
            match fetched {
                Ok(notes) => {
                    notes_body = notes.markdown;
                    notes_url = notes.url;
                    if let Some(url) = &notes_url {
                        report.outputs.set("release_notes_url", url);
                    }
                    report.succeeded(step::RELEASE_NOTES, ms(started));
                }
                Err(err) => {
                    report.failed(step::RELEASE_NOTES, &err.to_string(), ms(started));
                    return;
                }
            }
        } else {
            report.skipped(step::RELEASE_NOTES, "disabled");
        }

        // Release ticket; the key goes into the outputs before the
        // transition, so a transition failure still reports the ticket.
        let started = Instant::now();
        let mut input = ReleaseTicketInput::new(
            &config.project_key,
            &config.project_name,
            &short,
            &config.short_description,
        );
        input.sq_compatibility = config.sq_compatibility.clone();
        input.targeted_product = config.targeted_product.clone();
        input.documentation_status = config.documentation_status.clone();
        input.rule_props_changed = config.rule_props_changed;
        input.sonarlint_changelog = config.sonarlint_changelog.clone();
        input.release_notes_url = notes_url.clone();
        let ticket = match create_release_ticket(self.jira, &input).await {
            Ok(created) => {
                report.outputs.set("ticket_key", &created.key);
                report.outputs.set("ticket_url", &created.url);
                report.succeeded(step::RELEASE_TICKET, ms(started));
                created
            }
            Err(err) => {
                report.failed(step::RELEASE_TICKET, &err.to_string(), ms(started));
                return;
            }
        };

        let started = Instant::now();
        match transition_status(self.jira, &ticket.key, STATUS_START_PROGRESS).await {
            Ok(()) => report.succeeded(step::START_PROGRESS, ms(started)),
            Err(err) => {
                report.failed(step::START_PROGRESS, &err.to_string(), ms(started));
                return;
            }
        }

        // Source-host release
        let started = Instant::now();
        let spec = ReleaseSpec {
            project_name: config.project_name.clone(),
            version: version.full().to_string(),
            branch: config.branch.clone(),
            body: notes_body,
            draft: config.draft,
        };
        let release = match publish(self.github, &spec).await {
            Ok(published) => {
                report.outputs.set("release_url", &published.url);
                report.succeeded(step::PUBLISH_RELEASE, ms(started));
                published
            }
            Err(err) => {
                report.failed(step::PUBLISH_RELEASE, &err.to_string(), ms(started));
                return;
            }
        };

        // Artifact-publishing workflow
        if config.publish_artifacts {
            let started = Instant::now();
            let dispatch = DispatchSpec::publish_artifacts(
                &config.artifacts_workflow,
                &config.branch,
                version.full(),
                release.id,
                config.draft,
            );
            match trigger_and_await(self.github, self.sleeper, &dispatch, &self.policy).await {
                Ok(done) => {
                    report.outputs.set("artifacts_run_url", &done.url);
                    report.succeeded(step::PUBLISH_ARTIFACTS, ms(started));
                }
                Err(err) => {
                    report.failed(step::PUBLISH_ARTIFACTS, &err.to_string(), ms(started));
                    return;
                }
            }
        } else {
            report.skipped(step::PUBLISH_ARTIFACTS, "disabled");
        }

        // Tracker version rollover
        let started = Instant::now();
        match release_and_create_next(self.jira, &config.project_key, &short, None).await {
            Ok(rollover) => {
                report.outputs.set("released_version", &rollover.released);
                report.outputs.set("next_version", &rollover.created);
                report.succeeded(step::VERSION_ROLLOVER, ms(started));
            }
            Err(err) => {
                report.failed(step::VERSION_ROLLOVER, &err.to_string(), ms(started));
                return;
            }
        }

        // Downstream integration tickets, then their update dispatches
        for target in &config.integrations {
            let name = step::integration_ticket(target.output_prefix());
            let started = Instant::now();
            let summary = format!("Update {} to {}", config.project_name, short);
            let input = IntegrationTicketInput::new(target.project_key(), &summary, &ticket.key);
            match create_integration_ticket(self.jira, &input).await {
                Ok(created) => {
                    let prefix = target.output_prefix();
                    report.outputs.set(&format!("{prefix}_ticket_key"), &created.key);
                    report.outputs.set(&format!("{prefix}_ticket_url"), &created.url);
                    report.succeeded(&name, ms(started));
                }
                Err(err) => {
                    report.failed(&name, &err.to_string(), ms(started));
                    return;
                }
            }
        }

        for target in &config.integrations {
            let name = step::update_dispatch(target.output_prefix());
            let started = Instant::now();
            let mut inputs = Map::new();
            inputs.insert("version".to_string(), json!(version.full()));
            let dispatched = self
                .github
                .dispatch_repository_workflow(
                    target.downstream_repository(),
                    &config.update_workflow,
                    &config.update_ref,
                    &inputs,
                )
                .await;
            match dispatched {
                Ok(()) => {
                    info!(repository = %target.downstream_repository(),
                        workflow = %config.update_workflow, "update workflow dispatched");
                    report.succeeded(&name, ms(started));
                }
                Err(err) => {
                    report.failed(&name, &err.to_string(), ms(started));
                    return;
                }
            }
        }

        // Handover: the ticket leaves the release automation
        let started = Instant::now();
        match self.hand_over(&ticket.key, config.pm_email.as_deref()).await {
            Ok(()) => report.succeeded(step::HANDOVER, ms(started)),
            Err(err) => report.failed(step::HANDOVER, &err.to_string(), ms(started)),
        }
    }

    async fn hand_over(&self, key: &str, pm_email: Option<&str>) -> Result<()> {
        if let Some(email) = pm_email {
            reassign(self.jira, key, email).await?;
        }
        transition_status(self.jira, key, STATUS_TECHNICAL_RELEASE_DONE).await?;
        Ok(())
    }

    /// Post the freeze/unfreeze notice. Notification problems are logged
    /// and swallowed: chat being down is no reason to fail a release.
    async fn notify_lock(&self, config: &RunConfig, locked: bool) {
        let (Some(notifier), Some(channel)) = (self.notifier, config.slack_channel.as_deref())
        else {
            return;
        };
        let mut notice = LockNotice::new(&config.branch, self.github.repository(), locked);
        if let Some(url) = &config.run_url {
            notice = notice.with_run_url(url);
        }
        if let Err(err) = notify_lock_change(notifier, channel, &notice).await {
            warn!(channel = %channel, locked, error = %err,
                "lock notification failed, continuing");
        }
    }

    fn write_outputs(&self, config: &RunConfig, report: &mut RunReport) {
        let Some(path) = &config.output_path else {
            return;
        };
        if report.outputs.is_empty() {
            report.skipped(step::WRITE_OUTPUTS, "nothing to write");
            return;
        }
        let started = Instant::now();
        let written = report.outputs.append_to(path);
        match written {
            Ok(()) => report.succeeded(step::WRITE_OUTPUTS, ms(started)),
            Err(err) => {
                error!(path = %path.display(), error = %err, "output file not written");
                report.failed(step::WRITE_OUTPUTS, &err.to_string(), ms(started));
            }
        }
    }
}

/// Reject configurations that cannot produce a meaningful run, before any
/// network call happens.
fn validate(config: &RunConfig) -> Result<()> {
    if config.project_key.trim().is_empty() {
        return Err(ReleaseError::MissingInput("project_key"));
    }
    if config.project_name.trim().is_empty() {
        return Err(ReleaseError::MissingInput("project_name"));
    }
    if config.short_description.trim().is_empty() {
        return Err(ReleaseError::MissingInput("short_description"));
    }
    if let Some(explicit) = &config.version {
        ReleaseVersion::parse(explicit)?;
    }
    Ok(())
}

fn ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
