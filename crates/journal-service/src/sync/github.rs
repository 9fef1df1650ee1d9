use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::integrations::{self, GithubApi, GithubPull, RepoRef};

const REPOS_PER_PAGE: u32 = 100;
const MAX_REPO_PAGES: u32 = 5;
const PULLS_PER_REPO: u32 = 30;

/// Public, non-fork, non-archived repositories of `owner`, or of the token's
/// account when no owner is given.
pub(super) async fn discover_repos(
    github: &dyn GithubApi,
    owner: Option<&str>,
) -> integrations::Result<Vec<RepoRef>> {
    let owner = match owner {
        Some(owner) => owner.to_string(),
        None => github.viewer().await?.login,
    };

    let mut repos = Vec::new();
    for page in 1..=MAX_REPO_PAGES {
        let batch = github.owned_public_repos(page, REPOS_PER_PAGE).await?;
        let last_page = batch.len() < REPOS_PER_PAGE as usize;

        repos.extend(
            batch
                .iter()
                .filter(|repo| repo.is_importable_for(&owner))
                .map(RepoRef::from),
        );

        if last_page {
            break;
        }
    }

    debug!(%owner, count = repos.len(), "Discovered GitHub repositories");
    Ok(repos)
}

/// Pull requests of `repo` merged at or after `since`. A repository whose
/// pulls cannot be listed is skipped.
pub(super) async fn merged_pulls_since(
    github: &dyn GithubApi,
    repo: &RepoRef,
    since: DateTime<Utc>,
) -> Vec<GithubPull> {
    match github.closed_pulls(repo, PULLS_PER_REPO).await {
        Ok(pulls) => pulls
            .into_iter()
            .filter(|pull| pull.merged_at.is_some_and(|merged_at| merged_at >= since))
            .collect(),
        Err(err) => {
            warn!(repo = %repo.full_name, error = %err, "Listing pull requests failed");
            Vec::new()
        }
    }
}
