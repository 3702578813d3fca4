//! relo - release orchestration CLI
//!
//! Two styles of use: `relo run` drives a whole release end to end, and
//! the remaining subcommands expose the individual operations for
//! workflows that compose their own sequence. Results are printed to
//! stdout as `key=value` lines; diagnostics go to stderr through tracing.
//!
//! Credentials come from the environment: `JIRA_USER`/`JIRA_TOKEN` for the
//! tracker, `GITHUB_TOKEN` for the source host, `SLACK_TOKEN` for
//! notifications.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map};
use tracing::{warn, Level};

use relo_core::{IntegrationTarget, Orchestrator, ReleaseVersion, RunConfig};
use relo_github::{
    protection, publish, resolve_version, trigger_and_await, DispatchSpec, GithubApi,
    GithubClient, GithubConfig, MonitorPolicy, ReleaseSpec, TokioSleeper,
};
use relo_jira::tickets::{self, IntegrationTicketInput, ReleaseTicketInput};
use relo_jira::{notes, versions, JiraClient, JiraConfig};
use relo_notify::{notify_lock_change, LockNotice, SlackClient, SlackConfig};

#[derive(Parser)]
#[command(name = "relo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cross-system release orchestration", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Target the sandbox tracker instance instead of production
    #[arg(long, global = true)]
    sandbox: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a whole release: lock, gate, ticket, release, rollover, handover
    Run(RunArgs),

    /// Read the build version from the branch's commit statuses
    ResolveVersion {
        /// Branch whose statuses are read
        #[arg(short, long, default_value = relo_core::DEFAULT_BRANCH)]
        branch: String,

        /// Commit-status context prefix carrying the version
        #[arg(long, default_value = relo_github::DEFAULT_BUILD_CONTEXT_PREFIX)]
        context_prefix: String,

        /// Repository `owner/name`; read from the environment when omitted
        #[arg(long, env = "GITHUB_REPOSITORY")]
        repository: Option<String>,
    },

    /// Create the "Ask for release" ticket for a version
    CreateReleaseTicket {
        /// Tracker project of the released product, e.g. SONARIAC
        #[arg(long)]
        project_key: String,

        /// Display name of the released product, e.g. SonarIaC
        #[arg(long)]
        project_name: String,

        /// Short version the ticket is titled with, e.g. 11.44.2
        #[arg(long)]
        version: String,

        /// One-line description shown on the ticket
        #[arg(long)]
        short_description: String,

        /// SonarQube compatibility, e.g. 2025.3
        #[arg(long)]
        sq_compatibility: Option<String>,

        /// Targeted product version
        #[arg(long)]
        targeted_product: Option<String>,

        /// Documentation status
        #[arg(long)]
        documentation_status: Option<String>,

        /// Whether rule properties changed in this release
        #[arg(long)]
        rule_props_changed: Option<bool>,

        /// SonarLint changelog content
        #[arg(long)]
        sonarlint_changelog: Option<String>,

        /// Tracker version whose release notes the ticket links to; the
        /// single unreleased version when omitted
        #[arg(long)]
        jira_release_name: Option<String>,
    },

    /// Move a ticket to a new status, optionally reassigning it first
    UpdateTicketStatus {
        /// Ticket key, e.g. REL-100
        ticket: String,

        /// Target status, e.g. "Technical Release Done"
        status: String,

        /// Assign the ticket to this account before the transition
        #[arg(long)]
        assignee: Option<String>,
    },

    /// Open an integration ticket in a downstream product project
    CreateIntegrationTicket {
        /// Downstream product, `sonarqube-server` or `sonarqube-cloud`
        #[arg(long)]
        target: IntegrationTarget,

        /// Ticket summary, e.g. "Update SonarIaC to 11.44.2"
        #[arg(long)]
        summary: String,

        /// Ticket description; skipped when the project rejects it
        #[arg(long)]
        description: Option<String>,

        /// Release ticket the new ticket is linked to
        #[arg(long)]
        linked_ticket: String,

        /// Link type between the two tickets
        #[arg(long, default_value = relo_jira::DEFAULT_LINK_TYPE)]
        link_type: String,
    },

    /// Point the linked integration tickets at new fix versions
    UpdateIntegrationTickets {
        /// Release ticket whose linked tickets are updated
        #[arg(long)]
        release_ticket: String,

        /// Targets whose linked tickets get the fix versions (repeatable)
        #[arg(long = "target")]
        targets: Vec<IntegrationTarget>,

        /// Fix version names to set (repeatable)
        #[arg(long = "fix-version")]
        fix_versions: Vec<String>,
    },

    /// Mark a tracker version released and create the next one
    ReleaseVersion {
        /// Tracker project the version belongs to
        #[arg(long)]
        project_key: String,

        /// Version name to release, e.g. 11.44.2
        #[arg(long)]
        version: String,

        /// Name of the next version; last component + 1 when omitted
        #[arg(long)]
        next_version: Option<String>,
    },

    /// Create a tracker version, reusing it when the name is taken
    CreateVersion {
        /// Tracker project the version belongs to
        #[arg(long)]
        project_key: String,

        /// Version name, e.g. 11.45
        #[arg(long)]
        name: String,
    },

    /// Render the release-notes markdown for a version
    ReleaseNotes {
        /// Tracker project the version belongs to
        #[arg(long)]
        project_key: String,

        /// Display name used in the notes heading
        #[arg(long)]
        project_name: String,

        /// Version name the notes cover, e.g. 11.44.2
        #[arg(long)]
        version: String,
    },

    /// Publish the source-host release for a version
    PublishRelease {
        /// Display name used in the release title
        #[arg(long)]
        project_name: String,

        /// Full build version, doubles as the tag
        #[arg(long)]
        version: String,

        /// Branch the release points at
        #[arg(short, long, default_value = relo_core::DEFAULT_BRANCH)]
        branch: String,

        /// Markdown file used as the release body
        #[arg(long)]
        notes_file: Option<PathBuf>,

        /// Publish as a draft
        #[arg(long)]
        draft: bool,

        /// Repository `owner/name`; read from the environment when omitted
        #[arg(long, env = "GITHUB_REPOSITORY")]
        repository: Option<String>,
    },

    /// Dispatch a workflow and wait for the run it starts
    AwaitWorkflow {
        /// Workflow file name, e.g. publish-release.yml
        #[arg(long)]
        workflow: String,

        /// Branch or ref the workflow runs on
        #[arg(long = "ref", default_value = relo_core::DEFAULT_BRANCH)]
        git_ref: String,

        /// Dispatch inputs as key=value (repeatable)
        #[arg(long = "input", value_parser = parse_key_val)]
        inputs: Vec<(String, String)>,

        /// Ceiling on the whole run, in seconds
        #[arg(long, default_value_t = 1800)]
        timeout_secs: u64,

        /// Repository `owner/name`; read from the environment when omitted
        #[arg(long, env = "GITHUB_REPOSITORY")]
        repository: Option<String>,
    },

    /// Freeze or unfreeze a branch via its protection settings
    LockBranch {
        /// Branch to lock or unlock
        #[arg(short, long, default_value = relo_core::DEFAULT_BRANCH)]
        branch: String,

        /// Release the lock instead of taking it
        #[arg(long)]
        unlock: bool,

        /// Channel notified about the change
        #[arg(long, env = "SLACK_CHANNEL")]
        channel: Option<String>,

        /// Link to the CI run driving the change
        #[arg(long)]
        run_url: Option<String>,

        /// Repository `owner/name`; read from the environment when omitted
        #[arg(long, env = "GITHUB_REPOSITORY")]
        repository: Option<String>,
    },
}

/// Inputs of `relo run`, one flag per release step knob.
#[derive(Args)]
struct RunArgs {
    /// Tracker project of the released product, e.g. SONARIAC
    #[arg(long)]
    project_key: String,

    /// Display name of the released product, e.g. SonarIaC
    #[arg(long)]
    project_name: String,

    /// One-line description shown on the release ticket
    #[arg(long)]
    short_description: String,

    /// Branch the release is cut from
    #[arg(short, long, default_value = relo_core::DEFAULT_BRANCH)]
    branch: String,

    /// Explicit build version; resolved from the branch status when omitted
    #[arg(long)]
    version: Option<String>,

    /// Publish the source-host release as a draft
    #[arg(long)]
    draft: bool,

    /// Freeze the branch for the duration of the run
    #[arg(long)]
    lock_branch: bool,

    /// Skip the releasability gate
    #[arg(long)]
    skip_releasability: bool,

    /// Skip tracker-rendered release notes
    #[arg(long)]
    skip_notes: bool,

    /// Trigger and await the artifact-publishing workflow
    #[arg(long)]
    publish_artifacts: bool,

    /// Downstream products to open tickets and dispatches for (repeatable)
    #[arg(long = "integration")]
    integrations: Vec<IntegrationTarget>,

    /// Markdown file used as the release body instead of tracker notes
    #[arg(long)]
    notes_file: Option<PathBuf>,

    /// Product manager the ticket is handed to after the release
    #[arg(long)]
    pm_email: Option<String>,

    /// Channel for freeze/unfreeze notices
    #[arg(long, env = "SLACK_CHANNEL")]
    channel: Option<String>,

    /// SonarQube compatibility shown on the ticket, e.g. 2025.3
    #[arg(long)]
    sq_compatibility: Option<String>,

    /// Targeted product version shown on the ticket
    #[arg(long)]
    targeted_product: Option<String>,

    /// Documentation status shown on the ticket
    #[arg(long)]
    documentation_status: Option<String>,

    /// Whether rule properties changed in this release
    #[arg(long)]
    rule_props_changed: Option<bool>,

    /// SonarLint changelog content shown on the ticket
    #[arg(long)]
    sonarlint_changelog: Option<String>,

    /// Repository `owner/name`; read from the environment when omitted
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    /// CI output file; `GITHUB_OUTPUT` when omitted
    #[arg(long)]
    output: Option<PathBuf>,
}

impl RunArgs {
    /// Map the flags onto a run configuration. Environment-backed values
    /// (run URL, output file, channel) are resolved later.
    fn into_config(self, sandbox: bool) -> Result<RunConfig> {
        let notes_markdown = match &self.notes_file {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read notes file {}", path.display()))?,
            ),
            None => None,
        };

        let mut config = RunConfig::new(
            &self.project_key,
            &self.project_name,
            &self.short_description,
        );
        config.branch = self.branch;
        config.sandbox = sandbox;
        config.draft = self.draft;
        config.lock_branch = self.lock_branch;
        config.check_releasability = !self.skip_releasability;
        config.generate_notes = !self.skip_notes;
        config.publish_artifacts = self.publish_artifacts;
        config.integrations = self.integrations;
        config.version = self.version;
        config.notes_markdown = notes_markdown;
        config.sq_compatibility = self.sq_compatibility;
        config.targeted_product = self.targeted_product;
        config.documentation_status = self.documentation_status;
        config.rule_props_changed = self.rule_props_changed;
        config.sonarlint_changelog = self.sonarlint_changelog;
        config.pm_email = self.pm_email;
        config.slack_channel = self.channel;
        config.output_path = self.output;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    relo_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run(args) => cmd_run(args, cli.sandbox).await,
        Commands::ResolveVersion {
            branch,
            context_prefix,
            repository,
        } => cmd_resolve_version(&branch, &context_prefix, repository.as_deref()).await,
        Commands::CreateReleaseTicket {
            project_key,
            project_name,
            version,
            short_description,
            sq_compatibility,
            targeted_product,
            documentation_status,
            rule_props_changed,
            sonarlint_changelog,
            jira_release_name,
        } => {
            let mut input =
                ReleaseTicketInput::new(&project_key, &project_name, &version, &short_description);
            input.sq_compatibility = sq_compatibility;
            input.targeted_product = targeted_product;
            input.documentation_status = documentation_status;
            input.rule_props_changed = rule_props_changed;
            input.sonarlint_changelog = sonarlint_changelog;
            cmd_create_release_ticket(cli.sandbox, input, jira_release_name.as_deref()).await
        }
        Commands::UpdateTicketStatus {
            ticket,
            status,
            assignee,
        } => cmd_update_ticket_status(cli.sandbox, &ticket, &status, assignee.as_deref()).await,
        Commands::CreateIntegrationTicket {
            target,
            summary,
            description,
            linked_ticket,
            link_type,
        } => {
            let mut input =
                IntegrationTicketInput::new(target.project_key(), &summary, &linked_ticket);
            input.description = description;
            input.link_type = link_type;
            cmd_create_integration_ticket(cli.sandbox, target, input).await
        }
        Commands::UpdateIntegrationTickets {
            release_ticket,
            targets,
            fix_versions,
        } => {
            cmd_update_integration_tickets(cli.sandbox, &release_ticket, &targets, &fix_versions)
                .await
        }
        Commands::ReleaseVersion {
            project_key,
            version,
            next_version,
        } => {
            cmd_release_version(cli.sandbox, &project_key, &version, next_version.as_deref()).await
        }
        Commands::CreateVersion { project_key, name } => {
            cmd_create_version(cli.sandbox, &project_key, &name).await
        }
        Commands::ReleaseNotes {
            project_key,
            project_name,
            version,
        } => cmd_release_notes(cli.sandbox, &project_key, &project_name, &version).await,
        Commands::PublishRelease {
            project_name,
            version,
            branch,
            notes_file,
            draft,
            repository,
        } => {
            cmd_publish_release(
                repository.as_deref(),
                &project_name,
                &version,
                &branch,
                notes_file.as_deref(),
                draft,
            )
            .await
        }
        Commands::AwaitWorkflow {
            workflow,
            git_ref,
            inputs,
            timeout_secs,
            repository,
        } => {
            cmd_await_workflow(
                repository.as_deref(),
                &workflow,
                &git_ref,
                &inputs,
                timeout_secs,
            )
            .await
        }
        Commands::LockBranch {
            branch,
            unlock,
            channel,
            run_url,
            repository,
        } => {
            cmd_lock_branch(
                repository.as_deref(),
                &branch,
                !unlock,
                channel.as_deref(),
                run_url.as_deref(),
            )
            .await
        }
    }
}

async fn cmd_run(args: RunArgs, sandbox: bool) -> Result<()> {
    let repository = args.repository.clone();
    let config = args.into_config(sandbox)?.resolve();

    let jira = JiraClient::new(JiraConfig::from_env(sandbox)?);
    let github = GithubClient::new(GithubConfig::from_env(repository.as_deref())?);
    let notifier = match (&config.slack_channel, SlackConfig::from_env()) {
        (Some(_), Ok(slack)) => Some(SlackClient::new(slack)),
        (Some(channel), Err(err)) => {
            warn!(channel = %channel, error = %err,
                "notification channel set but Slack is not configured");
            None
        }
        (None, _) => None,
    };

    let mut orchestrator = Orchestrator::new(&jira, &github);
    if let Some(slack) = &notifier {
        orchestrator = orchestrator.with_notifier(slack);
    }
    let report = orchestrator.run(&config).await;

    print!("{}", report.render_markdown());
    if let Some(failed) = report.failed_step() {
        anyhow::bail!("release run failed at {}", failed.step);
    }
    Ok(())
}

async fn cmd_resolve_version(
    branch: &str,
    context_prefix: &str,
    repository: Option<&str>,
) -> Result<()> {
    let github = GithubClient::new(GithubConfig::from_env(repository)?);
    let raw = resolve_version(&github, branch, context_prefix).await?;
    let version = ReleaseVersion::parse(&raw)?;
    println!("version={}", version.full());
    println!("short_version={}", version.short());
    Ok(())
}

async fn cmd_create_release_ticket(
    sandbox: bool,
    mut input: ReleaseTicketInput,
    jira_release_name: Option<&str>,
) -> Result<()> {
    let jira = JiraClient::new(JiraConfig::from_env(sandbox)?);
    if let Some(name) = jira_release_name {
        let notes_version =
            versions::resolve_notes_version(&jira, &input.project_key, Some(name)).await?;
        input.release_notes_url = Some(notes_version.report_url);
    }
    let ticket = tickets::create_release_ticket(&jira, &input).await?;
    println!("ticket_key={}", ticket.key);
    println!("ticket_url={}", ticket.url);
    Ok(())
}

async fn cmd_update_ticket_status(
    sandbox: bool,
    ticket: &str,
    status: &str,
    assignee: Option<&str>,
) -> Result<()> {
    let jira = JiraClient::new(JiraConfig::from_env(sandbox)?);
    if let Some(email) = assignee {
        tickets::reassign(&jira, ticket, email).await?;
    }
    tickets::transition_status(&jira, ticket, status).await?;
    println!("{ticket} moved to {status}");
    Ok(())
}

async fn cmd_create_integration_ticket(
    sandbox: bool,
    target: IntegrationTarget,
    input: IntegrationTicketInput,
) -> Result<()> {
    let jira = JiraClient::new(JiraConfig::from_env(sandbox)?);
    let ticket = tickets::create_integration_ticket(&jira, &input).await?;
    println!("{}_ticket_key={}", target.output_prefix(), ticket.key);
    println!("{}_ticket_url={}", target.output_prefix(), ticket.url);
    Ok(())
}

async fn cmd_update_integration_tickets(
    sandbox: bool,
    release_ticket: &str,
    targets: &[IntegrationTarget],
    fix_versions: &[String],
) -> Result<()> {
    let jira = JiraClient::new(JiraConfig::from_env(sandbox)?);
    for target in targets {
        let key =
            tickets::find_linked_ticket(&jira, release_ticket, target.project_key()).await?;
        if let Err(err) = tickets::update_fix_versions(&jira, &key, fix_versions).await {
            warn!(ticket = %key, error = %err, "fixVersions update rejected, continuing");
        }
        println!("{}_ticket_key={key}", target.output_prefix());
    }
    Ok(())
}

async fn cmd_release_version(
    sandbox: bool,
    project_key: &str,
    version: &str,
    next_version: Option<&str>,
) -> Result<()> {
    let jira = JiraClient::new(JiraConfig::from_env(sandbox)?);
    let rollover =
        versions::release_and_create_next(&jira, project_key, version, next_version).await?;
    println!("released_version={}", rollover.released);
    println!("next_version={}", rollover.created);
    Ok(())
}

async fn cmd_create_version(sandbox: bool, project_key: &str, name: &str) -> Result<()> {
    let jira = JiraClient::new(JiraConfig::from_env(sandbox)?);
    let version = versions::ensure_version(&jira, project_key, name).await?;
    println!("version_id={}", version.id);
    println!("version_name={}", version.name);
    Ok(())
}

async fn cmd_release_notes(
    sandbox: bool,
    project_key: &str,
    project_name: &str,
    version: &str,
) -> Result<()> {
    let jira = JiraClient::new(JiraConfig::from_env(sandbox)?);
    let notes = notes::fetch_release_notes(&jira, project_key, project_name, version, None).await?;
    println!("{}", notes.markdown);
    Ok(())
}

async fn cmd_publish_release(
    repository: Option<&str>,
    project_name: &str,
    version: &str,
    branch: &str,
    notes_file: Option<&Path>,
    draft: bool,
) -> Result<()> {
    let github = GithubClient::new(GithubConfig::from_env(repository)?);
    let body = match notes_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("cannot read notes file {}", path.display()))?,
        None => String::new(),
    };
    let spec = ReleaseSpec {
        project_name: project_name.to_string(),
        version: version.to_string(),
        branch: branch.to_string(),
        body,
        draft,
    };
    let published = publish(&github, &spec).await?;
    println!("release_url={}", published.url);
    Ok(())
}

async fn cmd_await_workflow(
    repository: Option<&str>,
    workflow: &str,
    git_ref: &str,
    inputs: &[(String, String)],
    timeout_secs: u64,
) -> Result<()> {
    let github = GithubClient::new(GithubConfig::from_env(repository)?);
    let mut map = Map::new();
    for (key, value) in inputs {
        map.insert(key.clone(), json!(value));
    }
    let spec = DispatchSpec {
        workflow: workflow.to_string(),
        git_ref: git_ref.to_string(),
        inputs: map,
    };
    let policy = MonitorPolicy {
        run_timeout: Duration::from_secs(timeout_secs),
        ..MonitorPolicy::default()
    };
    let done = trigger_and_await(&github, &TokioSleeper, &spec, &policy).await?;
    println!("run_url={}", done.url);
    println!("conclusion={}", done.conclusion);
    Ok(())
}

async fn cmd_lock_branch(
    repository: Option<&str>,
    branch: &str,
    locked: bool,
    channel: Option<&str>,
    run_url: Option<&str>,
) -> Result<()> {
    let github = GithubClient::new(GithubConfig::from_env(repository)?);
    let transition = protection::set_lock(&github, branch, locked).await?;
    println!("locked={}", transition.current);
    println!("changed={}", transition.changed);

    if let Some(channel) = channel {
        match SlackConfig::from_env() {
            Ok(config) => {
                let slack = SlackClient::new(config);
                let mut notice = LockNotice::new(branch, github.repository(), locked);
                if let Some(url) = run_url {
                    notice = notice.with_run_url(url);
                }
                if let Err(err) = notify_lock_change(&slack, channel, &notice).await {
                    warn!(channel = %channel, error = %err, "lock notification failed");
                }
            }
            Err(err) => {
                warn!(channel = %channel, error = %err,
                    "channel set but Slack is not configured");
            }
        }
    }
    Ok(())
}

/// Parse a `key=value` dispatch input.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}
