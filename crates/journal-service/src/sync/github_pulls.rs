use std::borrow::Cow;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::github::{discover_repos, merged_pulls_since};
use super::{DEFAULT_WINDOW_DAYS, not_configured};
use crate::crosspost::{CrossPoster, Outbound};
use crate::errors::ApiError;
use crate::external_id;
use crate::integrations::{GithubPull, Integrations, RepoRef};
use crate::models::{NewPost, PostKind, PostSource, Target};
use crate::repositories::PostRepository;
use crate::text::{MASTODON_LIMIT, budget_with_tag, effective_post_limit};

#[derive(Debug, Clone)]
pub struct PullImportOptions {
    pub window_days: i64,
    /// Import this login's repositories instead of the token owner's.
    pub owner: Option<String>,
    pub targets: Vec<Target>,
}

impl Default for PullImportOptions {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            owner: None,
            targets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullImportSummary {
    pub inserted: usize,
    pub skipped_existing: usize,
    pub repos: usize,
    pub window_days: i64,
    pub cross_posted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `#github #{repo}`
fn tag_line(repo: &RepoRef) -> String {
    format!("#github #{}", repo.name)
}

fn pull_lines(repo: &RepoRef, pull: &GithubPull) -> String {
    format!("{}#{}\n{}", repo.full_name, pull.number, pull.title.trim())
}

/// Import every pull request merged within the window as a link post.
#[instrument(skip_all, fields(window_days = options.window_days, targets = ?options.targets))]
pub async fn import_merged_pulls<R: PostRepository>(
    posts: &R,
    integrations: &Integrations,
    options: &PullImportOptions,
    now: DateTime<Utc>,
) -> Result<PullImportSummary, ApiError> {
    let mut summary = PullImportSummary {
        window_days: options.window_days,
        ..Default::default()
    };
    let Some(github) = integrations.github.as_deref() else {
        summary.error = Some(not_configured("github"));
        return Ok(summary);
    };

    let repos = match discover_repos(github, options.owner.as_deref()).await {
        Ok(repos) => repos,
        Err(err) => {
            warn!(error = %err, "GitHub repository discovery failed");
            summary.error = Some(err.to_string());
            return Ok(summary);
        }
    };
    summary.repos = repos.len();

    let since = now - Duration::days(options.window_days);
    let limit = effective_post_limit(&options.targets);
    let cross_poster = CrossPoster::new(posts, integrations);

    for repo in &repos {
        for pull in merged_pulls_since(github, repo, since).await {
            let external_id = external_id::pull_request(&repo.full_name, pull.number);
            if posts
                .find_by_external_id(PostSource::Github, &external_id)
                .await?
                .is_some()
            {
                summary.skipped_existing += 1;
                continue;
            }

            let core = pull_lines(repo, &pull);
            let tag = tag_line(repo);
            let body = budget_with_tag(&core, &tag, limit);

            let new_post =
                NewPost::imported(PostSource::Github, external_id.clone(), PostKind::Link, body)
                    .link_url(Some(pull.html_url.clone()));
            let Some(post) = posts.create_imported(&new_post).await? else {
                summary.skipped_existing += 1;
                continue;
            };
            debug!(id = post.id, %external_id, "Imported merged pull request");
            summary.inserted += 1;

            if options.targets.is_empty() {
                continue;
            }

            let mastodon_text =
                budget_with_tag(&core, &format!("{tag}\n{}", pull.html_url), MASTODON_LIMIT);
            let outbound = Outbound {
                mastodon_text: Cow::Owned(mastodon_text),
                bluesky_text: Cow::Owned(post.body.clone()),
            };
            let outcome = cross_poster
                .share(post, &options.targets, &outbound)
                .await?;
            summary.cross_posted += outcome.shared_count();
        }
    }

    info!(
        inserted = summary.inserted,
        skipped_existing = summary.skipped_existing,
        repos = summary.repos,
        cross_posted = summary.cross_posted,
        "GitHub pull request import finished"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepoRef {
        RepoRef {
            owner: "owner".to_string(),
            name: "repo".to_string(),
            full_name: "owner/repo".to_string(),
        }
    }

    #[test]
    fn test_pull_body_layout() {
        let pull = GithubPull {
            number: 42,
            title: "  Add search  ".to_string(),
            html_url: "https://github.com/owner/repo/pull/42".to_string(),
            merged_at: None,
        };
        let body = budget_with_tag(&pull_lines(&repo(), &pull), &tag_line(&repo()), 300);
        assert_eq!(body, "owner/repo#42\nAdd search\n\n#github #repo");
    }

    #[test]
    fn test_long_title_is_dropped_whole() {
        let pull = GithubPull {
            number: 1,
            title: "x".repeat(400),
            html_url: "https://github.com/owner/repo/pull/1".to_string(),
            merged_at: None,
        };
        let body = budget_with_tag(&pull_lines(&repo(), &pull), &tag_line(&repo()), 300);
        assert_eq!(body, "owner/repo#1\n\n#github #repo");
    }
}
