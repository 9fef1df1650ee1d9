use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::not_configured;
use crate::crosspost::{CrossPoster, Outbound};
use crate::errors::ApiError;
use crate::external_id;
use crate::integrations::spotify::{DEFAULT_TOP_LIMIT, clamp_limit};
use crate::integrations::{Integrations, SpotifyApi, SpotifyArtist, SpotifyTrack, TimeRange};
use crate::models::{NewPost, PostKind, PostSource, Target};
use crate::repositories::PostRepository;
use crate::text::{BLUESKY_LIMIT, budget_with_tag, grapheme_length};

const TAG_LINE: &str = "#listening #spotify #top";

#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    pub time_range: TimeRange,
    pub artists: u32,
    pub tracks: u32,
    pub targets: Vec<Target>,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            time_range: TimeRange::default(),
            artists: DEFAULT_TOP_LIMIT,
            tracks: DEFAULT_TOP_LIMIT,
            targets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub inserted: usize,
    pub time_range: String,
    pub artists_count: usize,
    pub tracks_count: usize,
    pub body_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn snapshot_body(range: TimeRange, artists: &[SpotifyArtist], tracks: &[SpotifyTrack]) -> String {
    let mut lines = vec![format!("listening snapshot ({}):", range.label())];

    if !artists.is_empty() {
        lines.push(String::new());
        lines.push("top artists:".to_string());
        lines.extend(
            artists
                .iter()
                .enumerate()
                .map(|(idx, artist)| format!("{}. {}", idx + 1, artist.name)),
        );
    }

    if !tracks.is_empty() {
        lines.push(String::new());
        lines.push("top tracks:".to_string());
        lines.extend(
            tracks
                .iter()
                .enumerate()
                .map(|(idx, track)| format!("{}. {}", idx + 1, track.display_title())),
        );
    }

    budget_with_tag(&lines.join("\n"), TAG_LINE, BLUESKY_LIMIT)
}

async fn fetch_top(
    spotify: &dyn SpotifyApi,
    options: &SnapshotOptions,
) -> crate::integrations::Result<(Vec<SpotifyArtist>, Vec<SpotifyTrack>)> {
    let artists = spotify
        .top_artists(options.time_range, clamp_limit(options.artists))
        .await?;
    let tracks = spotify
        .top_tracks(options.time_range, clamp_limit(options.tracks))
        .await?;
    Ok((artists, tracks))
}

/// Post today's top artists and tracks for the time range, once per day.
#[instrument(skip_all, fields(time_range = %options.time_range, targets = ?options.targets))]
pub async fn post_listening_snapshot<R: PostRepository>(
    posts: &R,
    integrations: &Integrations,
    options: &SnapshotOptions,
    now: DateTime<Utc>,
) -> Result<SnapshotSummary, ApiError> {
    let mut summary = SnapshotSummary {
        time_range: options.time_range.to_string(),
        ..Default::default()
    };
    let Some(spotify) = integrations.spotify.as_deref() else {
        summary.error = Some(not_configured("spotify"));
        return Ok(summary);
    };

    let (artists, tracks) = match fetch_top(spotify, options).await {
        Ok(top) => top,
        Err(err) => {
            warn!(error = %err, "Fetching Spotify top items failed");
            summary.error = Some(err.to_string());
            return Ok(summary);
        }
    };
    summary.artists_count = artists.len();
    summary.tracks_count = tracks.len();

    if artists.is_empty() && tracks.is_empty() {
        summary.message = Some("no top artists or tracks returned from Spotify".to_string());
        return Ok(summary);
    }

    let external_id = external_id::spotify_top(options.time_range.as_str(), now.date_naive());
    if posts
        .find_by_external_id(PostSource::Spotify, &external_id)
        .await?
        .is_some()
    {
        debug!(%external_id, "Listening snapshot already exists");
        summary.message = Some("snapshot already exists for today".to_string());
        return Ok(summary);
    }

    let body = snapshot_body(options.time_range, &artists, &tracks);
    summary.body_length = grapheme_length(&body);

    let new_post = NewPost::imported(PostSource::Spotify, external_id, PostKind::Text, body);
    let Some(post) = posts.create_imported(&new_post).await? else {
        summary.message = Some("snapshot already exists for today".to_string());
        return Ok(summary);
    };
    summary.inserted = 1;

    if !options.targets.is_empty() {
        let text = post.body.clone();
        CrossPoster::new(posts, integrations)
            .share(post, &options.targets, &Outbound::same(&text))
            .await?;
    }

    info!(
        inserted = summary.inserted,
        artists = summary.artists_count,
        tracks = summary.tracks_count,
        "Spotify snapshot finished"
    );

    Ok(summary)
}
