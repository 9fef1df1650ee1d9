use axum::{
    extract::{Json, Path, Query, State},
    response::Json as ResponseJson,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::AppState;
use crate::auth::require_session;
use crate::crosspost::{CrossPoster, Outbound};
use crate::errors::ApiError;
use crate::models::{NewPost, Post, Target};
use crate::repositories::{DEFAULT_PAGE_SIZE, FeedQuery, MAX_PAGE_SIZE, PostRepository};
use crate::search::SearchFilter;
use crate::validation::{DataUrl, ValidatedBody};

#[derive(Debug, Deserialize)]
pub(super) struct FeedParams {
    cursor: Option<i32>,
    limit: Option<u32>,
    q: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FeedResponse {
    posts: Vec<Post>,
    next_cursor: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreatePostRequest {
    #[serde(default)]
    body: String,
    image_data: Option<String>,
    #[serde(default)]
    targets: Vec<Target>,
}

#[derive(Debug, Serialize)]
pub(super) struct PostResponse {
    post: Post,
}

#[instrument(skip_all, fields(cursor = params.cursor, limit = params.limit, has_query = params.q.is_some()))]
pub(super) async fn list_posts<S: AppState>(
    State(state): State<S>,
    Query(params): Query<FeedParams>,
) -> Result<ResponseJson<FeedResponse>, ApiError> {
    if params.limit == Some(0) {
        return Err(ApiError::BadRequest(
            "Limit must be greater than 0".to_string(),
        ));
    }

    let query = FeedQuery {
        cursor: params.cursor,
        limit: params.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE),
        filter: params
            .q
            .as_deref()
            .map(SearchFilter::parse)
            .unwrap_or_default(),
    };
    debug!(filter = ?query.filter, "Parsed feed query");

    let posts = state.posts().list(&query).await?;
    let next_cursor = if posts.len() == query.limit as usize {
        posts.last().map(|post| post.id)
    } else {
        None
    };

    info!(returned_count = posts.len(), ?next_cursor, "Served feed page");
    Ok(ResponseJson(FeedResponse { posts, next_cursor }))
}

#[instrument(skip_all, fields(id = %id))]
pub(super) async fn get_post<S: AppState>(
    State(state): State<S>,
    Path(id): Path<i32>,
) -> Result<ResponseJson<Post>, ApiError> {
    match state.posts().find_by_id(id).await? {
        Some(post) if !post.source_deleted => Ok(ResponseJson(post)),
        _ => {
            debug!("Post not found");
            Err(ApiError::NotFound)
        }
    }
}

#[instrument(skip_all, fields(has_image = payload.image_data.is_some(), targets = ?payload.targets))]
pub(super) async fn create_post<S: AppState>(
    State(state): State<S>,
    jar: CookieJar,
    Json(payload): Json<CreatePostRequest>,
) -> Result<ResponseJson<PostResponse>, ApiError> {
    require_session(&jar, state.config())?;

    let body = ValidatedBody::new(&payload.body, &payload.targets)?;
    let image_data = payload.image_data.filter(|data| !data.trim().is_empty());
    if let Some(data) = &image_data {
        let image = DataUrl::parse(data)?;
        debug!(mime = %image.mime, bytes = image.bytes.len(), "Image attached");
    }

    let post = state
        .posts()
        .create(&NewPost::local(body.into_inner(), image_data))
        .await?;
    info!(id = post.id, kind = %post.kind, "Created post");

    let post = if payload.targets.is_empty() {
        post
    } else {
        let text = post.body.clone();
        CrossPoster::new(state.posts(), state.integrations())
            .share(post, &payload.targets, &Outbound::same(&text))
            .await?
            .post
    };

    Ok(ResponseJson(PostResponse { post }))
}
