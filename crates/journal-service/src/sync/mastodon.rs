use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::not_configured;
use crate::content::{classify_kind, extract_single_url, strip_html};
use crate::errors::ApiError;
use crate::integrations::mastodon::MAX_PAGE_SIZE;
use crate::integrations::{self, Integrations, MastodonApi, MastodonStatus};
use crate::models::{NewPost, PostSource, RemoteRefresh};
use crate::repositories::PostRepository;

pub const DEFAULT_MAX_STATUSES: usize = 120;

#[derive(Debug, Clone, Copy)]
pub struct MirrorOptions {
    /// Stop paging once this many statuses were fetched.
    pub max_statuses: usize,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            max_statuses: DEFAULT_MAX_STATUSES,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorSummary {
    pub imported: usize,
    pub reactivated: usize,
    pub marked_deleted: usize,
    pub scanned_remote: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Mirror the account's own public statuses into the journal.
///
/// New statuses are imported with their remote timestamp, known ones are
/// refreshed and made visible again. Local Mastodon posts created within the
/// fetched window whose status no longer shows up are soft-deleted.
#[instrument(skip_all, fields(max_statuses = options.max_statuses))]
pub async fn mirror_mastodon<R: PostRepository>(
    posts: &R,
    integrations: &Integrations,
    options: &MirrorOptions,
) -> Result<MirrorSummary, ApiError> {
    let mut summary = MirrorSummary::default();
    let Some(mastodon) = integrations.mastodon.as_deref() else {
        summary.error = Some(not_configured("mastodon"));
        return Ok(summary);
    };

    let remote = match fetch_recent(mastodon, options.max_statuses).await {
        Ok(statuses) => statuses,
        Err(err) => {
            warn!(error = %err, "Fetching Mastodon statuses failed");
            summary.error = Some(err.to_string());
            return Ok(summary);
        }
    };

    let visible: Vec<&MastodonStatus> = remote
        .iter()
        .filter(|status| status.is_original_public())
        .collect();
    summary.scanned_remote = visible.len();
    debug!(fetched = remote.len(), visible = visible.len(), "Fetched Mastodon statuses");

    for status in &visible {
        let body = strip_html(&status.content);
        if body.is_empty() {
            continue;
        }

        let image_url = status.first_media_url().map(str::to_string);
        let link_url = extract_single_url(&body);
        let kind = classify_kind(image_url.is_some(), link_url.is_some());

        match posts
            .find_by_external_id(PostSource::Mastodon, &status.id)
            .await?
        {
            None => {
                let new_post =
                    NewPost::imported(PostSource::Mastodon, status.id.clone(), kind, body)
                        .created_at(status.created_at.naive_utc())
                        .image_data(image_url)
                        .link_url(link_url)
                        .mastodon_url(status.url.clone());

                if let Some(post) = posts.create_imported(&new_post).await? {
                    debug!(id = post.id, status_id = %status.id, "Imported Mastodon status");
                    summary.imported += 1;
                }
            }
            Some(existing) => {
                let refresh = RemoteRefresh {
                    kind,
                    body,
                    image_data: image_url,
                    link_url,
                    mastodon_url: status.url.clone(),
                    source_deleted: false,
                };
                posts.refresh_from_remote(existing.id, &refresh).await?;
                if existing.source_deleted {
                    debug!(id = existing.id, status_id = %status.id, "Reactivated Mastodon post");
                    summary.reactivated += 1;
                }
            }
        }
    }

    if let Some(oldest) = visible.iter().map(|status| status.created_at).min() {
        let remote_ids: HashSet<&str> = visible.iter().map(|status| status.id.as_str()).collect();
        let local = posts
            .live_external_ids_since(PostSource::Mastodon, oldest.naive_utc())
            .await?;

        for (id, external_id) in local {
            if !remote_ids.contains(external_id.as_str()) {
                posts.mark_source_deleted(id).await?;
                debug!(id, status_id = %external_id, "Marked vanished Mastodon post deleted");
                summary.marked_deleted += 1;
            }
        }
    }

    info!(
        imported = summary.imported,
        reactivated = summary.reactivated,
        marked_deleted = summary.marked_deleted,
        scanned_remote = summary.scanned_remote,
        "Mastodon mirror finished"
    );

    Ok(summary)
}

/// Page backwards through the account's statuses until `max` is reached or
/// the timeline runs out.
async fn fetch_recent(
    mastodon: &dyn MastodonApi,
    max: usize,
) -> integrations::Result<Vec<MastodonStatus>> {
    let account = mastodon.verify_credentials().await?;

    let mut statuses: Vec<MastodonStatus> = Vec::new();
    let mut max_id: Option<String> = None;

    while statuses.len() < max {
        let page = mastodon
            .account_statuses(&account.id, MAX_PAGE_SIZE, max_id.as_deref())
            .await?;
        let Some(last) = page.last() else {
            break;
        };

        max_id = Some(last.id.clone());
        let short_page = page.len() < MAX_PAGE_SIZE as usize;
        statuses.extend(page);
        if short_page {
            break;
        }
    }

    statuses.truncate(max);
    Ok(statuses)
}
