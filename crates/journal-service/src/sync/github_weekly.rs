use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::github::{discover_repos, merged_pulls_since};
use super::{DEFAULT_WINDOW_DAYS, not_configured};
use crate::crosspost::{CrossPoster, Outbound};
use crate::errors::ApiError;
use crate::external_id;
use crate::integrations::Integrations;
use crate::models::{NewPost, PostKind, PostSource, Target};
use crate::repositories::PostRepository;
use crate::text::{BLUESKY_LIMIT, budget_with_tag, grapheme_length};

const TAG_LINE: &str = "#github #weekly";

#[derive(Debug, Clone)]
pub struct WeeklyDigestOptions {
    pub window_days: i64,
    pub owner: Option<String>,
    pub targets: Vec<Target>,
}

impl Default for WeeklyDigestOptions {
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
pub struct WeeklyDigestSummary {
    pub inserted: usize,
    pub repos: usize,
    pub merged: usize,
    pub body_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoActivity {
    pub full_name: String,
    pub merged: usize,
}

pub fn digest_body(window_days: i64, activity: &[RepoActivity]) -> String {
    let total: usize = activity.iter().map(|repo| repo.merged).sum();

    let mut lines = vec![
        format!("github pulse - last {window_days} days"),
        "---------------------------".to_string(),
        format!("{total} merged pull requests across the board"),
        String::new(),
    ];

    let active: Vec<&RepoActivity> = activity.iter().filter(|repo| repo.merged > 0).collect();
    if active.is_empty() {
        lines.push("quiet stretch - clearing the runway for the next sprint".to_string());
    } else {
        lines.push("shipping highlights:".to_string());
        for repo in active {
            let plural = if repo.merged == 1 { "" } else { "s" };
            lines.push(format!("- {}: {} merge{plural}", repo.full_name, repo.merged));
        }
    }

    budget_with_tag(&lines.join("\n"), TAG_LINE, BLUESKY_LIMIT)
}

/// Post one summary of the window's merged pull requests per day.
///
/// A rerun on the same day reuses the stored digest and only shares it to
/// platforms it has not reached yet.
#[instrument(skip_all, fields(window_days = options.window_days, targets = ?options.targets))]
pub async fn post_weekly_digest<R: PostRepository>(
    posts: &R,
    integrations: &Integrations,
    options: &WeeklyDigestOptions,
    now: DateTime<Utc>,
) -> Result<WeeklyDigestSummary, ApiError> {
    let mut summary = WeeklyDigestSummary::default();
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
    if repos.is_empty() {
        summary.message = Some("no public repos found".to_string());
        return Ok(summary);
    }

    let since = now - Duration::days(options.window_days);
    let mut activity = Vec::new();
    for repo in &repos {
        let merged = merged_pulls_since(github, repo, since).await.len();
        if merged > 0 {
            activity.push(RepoActivity {
                full_name: repo.full_name.clone(),
                merged,
            });
        }
    }

    summary.merged = activity.iter().map(|repo| repo.merged).sum();
    if summary.merged == 0 {
        summary.message = Some("no merged PRs in window".to_string());
        return Ok(summary);
    }

    let body = digest_body(options.window_days, &activity);

    let external_id = external_id::github_weekly(options.window_days, now.date_naive());
    let post = match posts
        .find_by_external_id(PostSource::Github, &external_id)
        .await?
    {
        Some(existing) => {
            debug!(id = existing.id, %external_id, "Weekly digest already exists");
            existing
        }
        None => {
            let new_post =
                NewPost::imported(PostSource::Github, external_id.clone(), PostKind::Text, body);
            match posts.create_imported(&new_post).await? {
                Some(post) => {
                    summary.inserted = 1;
                    post
                }
                // lost a race with a concurrent run
                None => posts
                    .find_by_external_id(PostSource::Github, &external_id)
                    .await?
                    .ok_or(ApiError::InternalError)?,
            }
        }
    };

    summary.body_length = grapheme_length(&post.body);

    if summary.inserted == 0 {
        summary.message = Some("weekly snapshot already exists for today".to_string());
    }

    if !options.targets.is_empty() {
        let text = post.body.clone();
        CrossPoster::new(posts, integrations)
            .share(post, &options.targets, &Outbound::same(&text))
            .await?;
    }

    info!(
        inserted = summary.inserted,
        repos = summary.repos,
        merged = summary.merged,
        "GitHub weekly digest finished"
    );

    Ok(summary)
}
