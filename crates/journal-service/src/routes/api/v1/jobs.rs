//! Triggers for the reconcilers, meant to be hit by a scheduler.

use axum::{
    extract::{Query, State},
    response::Json as ResponseJson,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use super::lenient;
use crate::AppState;
use crate::auth::{require_key_if_configured, require_session_or_key};
use crate::errors::ApiError;
use crate::integrations::TimeRange;
use crate::integrations::spotify::DEFAULT_TOP_LIMIT;
use crate::sync::mastodon::DEFAULT_MAX_STATUSES;
use crate::sync::{
    self, DEFAULT_WINDOW_DAYS, MirrorOptions, MirrorSummary, PullImportOptions,
    PullImportSummary, SnapshotOptions, SnapshotSummary, WeeklyDigestOptions,
    WeeklyDigestSummary,
};

const MAX_STATUSES_PER_RUN: usize = 800;
const MAX_WINDOW_DAYS: i64 = 365;

/// Every trigger takes the same optional parameters as strings so a bad
/// value falls back to its default instead of failing the job.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct JobParams {
    key: Option<String>,
    max: Option<String>,
    window_days: Option<String>,
    time_range: Option<String>,
    artists: Option<String>,
    tracks: Option<String>,
}

impl JobParams {
    fn window_days(&self) -> i64 {
        lenient::<i64>(self.window_days.as_deref())
            .unwrap_or(DEFAULT_WINDOW_DAYS)
            .clamp(1, MAX_WINDOW_DAYS)
    }
}

#[instrument(skip_all)]
pub(super) async fn mastodon_sync<S: AppState>(
    State(state): State<S>,
    jar: CookieJar,
    Query(params): Query<JobParams>,
) -> Result<ResponseJson<MirrorSummary>, ApiError> {
    require_session_or_key(&jar, params.key.as_deref(), state.config())?;

    let options = MirrorOptions {
        max_statuses: lenient::<usize>(params.max.as_deref())
            .unwrap_or(DEFAULT_MAX_STATUSES)
            .clamp(1, MAX_STATUSES_PER_RUN),
    };
    let summary = sync::mirror_mastodon(state.posts(), state.integrations(), &options).await?;
    Ok(ResponseJson(summary))
}

#[instrument(skip_all)]
pub(super) async fn github_sync<S: AppState>(
    State(state): State<S>,
    jar: CookieJar,
    Query(params): Query<JobParams>,
) -> Result<ResponseJson<PullImportSummary>, ApiError> {
    let config = state.config();
    require_key_if_configured(&jar, params.key.as_deref(), config)?;

    let options = PullImportOptions {
        window_days: params.window_days(),
        owner: config.github.as_ref().and_then(|github| github.owner.clone()),
        targets: config.crosspost.github_targets(),
    };
    let summary =
        sync::import_merged_pulls(state.posts(), state.integrations(), &options, Utc::now())
            .await?;
    Ok(ResponseJson(summary))
}

#[instrument(skip_all)]
pub(super) async fn github_weekly_sync<S: AppState>(
    State(state): State<S>,
    jar: CookieJar,
    Query(params): Query<JobParams>,
) -> Result<ResponseJson<WeeklyDigestSummary>, ApiError> {
    let config = state.config();
    require_key_if_configured(&jar, params.key.as_deref(), config)?;

    let options = WeeklyDigestOptions {
        window_days: params.window_days(),
        owner: config.github.as_ref().and_then(|github| github.owner.clone()),
        targets: config.crosspost.github_targets(),
    };
    let summary =
        sync::post_weekly_digest(state.posts(), state.integrations(), &options, Utc::now())
            .await?;
    Ok(ResponseJson(summary))
}

#[instrument(skip_all)]
pub(super) async fn spotify_sync<S: AppState>(
    State(state): State<S>,
    jar: CookieJar,
    Query(params): Query<JobParams>,
) -> Result<ResponseJson<SnapshotSummary>, ApiError> {
    let config = state.config();
    require_key_if_configured(&jar, params.key.as_deref(), config)?;

    let options = SnapshotOptions {
        time_range: TimeRange::from_param(params.time_range.as_deref()),
        artists: lenient(params.artists.as_deref()).unwrap_or(DEFAULT_TOP_LIMIT),
        tracks: lenient(params.tracks.as_deref()).unwrap_or(DEFAULT_TOP_LIMIT),
        targets: config.crosspost.spotify_targets(),
    };
    let summary =
        sync::post_listening_snapshot(state.posts(), state.integrations(), &options, Utc::now())
            .await?;
    Ok(ResponseJson(summary))
}
