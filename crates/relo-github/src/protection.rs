//! Branch lock via branch protection
//!
//! The lock flag lives inside the protection settings object, and the
//! update endpoint replaces the whole object. Toggling therefore
//! read-modify-writes: every other setting is carried over untouched, and
//! writing is skipped entirely when the flag already has the desired
//! value.

use tracing::info;

use crate::api::GithubApi;
use crate::error::Result;
use crate::model::{
    BranchProtection, ProtectionUpdate, RestrictionsUpdate, ReviewsUpdate, StatusChecksUpdate,
};

/// Result of a lock toggle. `changed == false` means no write happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockTransition {
    pub previous: bool,
    pub current: bool,
    pub changed: bool,
}

/// Set the branch lock to `locked`, preserving the rest of the protection.
pub async fn set_lock<G: GithubApi>(gh: &G, branch: &str, locked: bool) -> Result<LockTransition> {
    let protection = gh.get_branch_protection(branch).await?;
    let previous = protection.as_ref().is_some_and(BranchProtection::locked);

    if previous == locked {
        info!(branch = %branch, locked, "branch lock already in desired state, nothing to do");
        return Ok(LockTransition {
            previous,
            current: locked,
            changed: false,
        });
    }

    let update = build_protection_update(protection.as_ref(), locked);
    gh.put_branch_protection(branch, &update).await?;
    info!(branch = %branch, previous, current = locked, "branch lock updated");
    Ok(LockTransition {
        previous,
        current: locked,
        changed: true,
    })
}

/// Build the write payload: current settings with only the lock flag
/// changed, or a minimal payload when the branch has no protection yet.
pub fn build_protection_update(
    current: Option<&BranchProtection>,
    locked: bool,
) -> ProtectionUpdate {
    match current {
        None => ProtectionUpdate {
            required_status_checks: None,
            enforce_admins: true,
            required_pull_request_reviews: None,
            restrictions: None,
            lock_branch: locked,
            required_linear_history: true,
            allow_force_pushes: false,
            allow_deletions: false,
            block_creations: false,
            required_conversation_resolution: false,
            allow_fork_syncing: false,
        },
        Some(p) => ProtectionUpdate {
            required_status_checks: p.required_status_checks.as_ref().map(|c| {
                StatusChecksUpdate {
                    strict: c.strict,
                    contexts: c.contexts.clone(),
                }
            }),
            enforce_admins: flag_enabled(&p.enforce_admins),
            required_pull_request_reviews: p.required_pull_request_reviews.as_ref().map(|r| {
                ReviewsUpdate {
                    dismiss_stale_reviews: r.dismiss_stale_reviews,
                    require_code_owner_reviews: r.require_code_owner_reviews,
                    required_approving_review_count: r.required_approving_review_count,
                }
            }),
            restrictions: p.restrictions.as_ref().map(|r| RestrictionsUpdate {
                users: r.users.iter().map(|u| u.login.clone()).collect(),
                teams: r.teams.iter().map(|t| t.slug.clone()).collect(),
                apps: r.apps.iter().map(|a| a.slug.clone()).collect(),
            }),
            lock_branch: locked,
            required_linear_history: flag_enabled(&p.required_linear_history),
            allow_force_pushes: flag_enabled(&p.allow_force_pushes),
            allow_deletions: flag_enabled(&p.allow_deletions),
            block_creations: flag_enabled(&p.block_creations),
            required_conversation_resolution: flag_enabled(&p.required_conversation_resolution),
            allow_fork_syncing: flag_enabled(&p.allow_fork_syncing),
        },
    }
}

fn flag_enabled(flag: &Option<crate::model::EnabledFlag>) -> bool {
    flag.as_ref().is_some_and(|f| f.enabled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeGithub;
    use crate::model::{Actor, EnabledFlag, RequiredStatusChecks, Restrictions, SlugRef};

    fn protected(locked: bool) -> BranchProtection {
        BranchProtection {
            required_status_checks: Some(RequiredStatusChecks {
                strict: true,
                contexts: vec!["ci/build".to_string()],
            }),
            enforce_admins: Some(EnabledFlag { enabled: true }),
            restrictions: Some(Restrictions {
                users: vec![Actor {
                    login: "release-bot".to_string(),
                }],
                teams: vec![SlugRef {
                    slug: "squad-iac".to_string(),
                }],
                apps: vec![],
            }),
            lock_branch: Some(EnabledFlag { enabled: locked }),
            allow_force_pushes: Some(EnabledFlag { enabled: false }),
            ..BranchProtection::default()
        }
    }

    #[test]
    fn test_minimal_payload_when_no_protection() {
        let update = build_protection_update(None, true);
        assert!(update.lock_branch);
        assert!(update.required_status_checks.is_none());
        assert!(update.restrictions.is_none());
        assert!(update.required_linear_history);
        assert!(!update.allow_force_pushes);
    }

    #[test]
    fn test_payload_preserves_existing_settings() {
        let current = protected(false);
        let update = build_protection_update(Some(&current), true);
        assert!(update.lock_branch);
        assert!(update.enforce_admins);
        assert_eq!(
            update.required_status_checks.unwrap().contexts,
            vec!["ci/build".to_string()]
        );
        let restrictions = update.restrictions.unwrap();
        assert_eq!(restrictions.users, vec!["release-bot".to_string()]);
        assert_eq!(restrictions.teams, vec!["squad-iac".to_string()]);
    }

    #[tokio::test]
    async fn test_set_lock_writes_once() {
        let gh = FakeGithub::new();
        gh.seed_protection("master", protected(false));

        let first = set_lock(&gh, "master", true).await.unwrap();
        assert_eq!(
            first,
            LockTransition {
                previous: false,
                current: true,
                changed: true
            }
        );
        assert_eq!(gh.protection_put_count(), 1);

        // second call is a no-op, no extra write
        let second = set_lock(&gh, "master", true).await.unwrap();
        assert_eq!(
            second,
            LockTransition {
                previous: true,
                current: true,
                changed: false
            }
        );
        assert_eq!(gh.protection_put_count(), 1);
    }

    #[tokio::test]
    async fn test_unlock_missing_protection_creates_minimal() {
        let gh = FakeGithub::new();
        let transition = set_lock(&gh, "master", true).await.unwrap();
        assert!(transition.changed);
        let puts = gh.protection_puts("master");
        assert_eq!(puts.len(), 1);
        assert!(puts[0].required_status_checks.is_none());
        assert!(puts[0].lock_branch);
    }
}
