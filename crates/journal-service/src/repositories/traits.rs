use crate::errors::ApiError;
use crate::models::{NewPost, Post, PostSource, RemoteRefresh};
use crate::search::SearchFilter;
use async_trait::async_trait;
use chrono::NaiveDateTime;

pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone)]
pub struct FeedQuery {
    /// exclusive upper bound on `id`
    pub cursor: Option<i32>,
    pub limit: u32,
    pub filter: SearchFilter,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            cursor: None,
            limit: DEFAULT_PAGE_SIZE,
            filter: SearchFilter::default(),
        }
    }
}

/// A link returned by a platform after a post was shared there.
#[derive(Debug, Clone, PartialEq)]
pub enum Share {
    Mastodon(String),
    Bluesky(String),
}

#[async_trait]
pub trait PostRepository: Clone + Send + Sync + 'static {
    /// Visible posts, newest first.
    async fn list(&self, query: &FeedQuery) -> Result<Vec<Post>, ApiError>;
    async fn find_by_id(&self, id: i32) -> Result<Option<Post>, ApiError>;
    async fn find_by_external_id(
        &self,
        source: PostSource,
        external_id: &str,
    ) -> Result<Option<Post>, ApiError>;
    async fn create(&self, post: &NewPost) -> Result<Post, ApiError>;
    /// Insert a post carrying an external id. Returns `None` when the
    /// `(source, external_id)` pair is already taken.
    async fn create_imported(&self, post: &NewPost) -> Result<Option<Post>, ApiError>;
    async fn refresh_from_remote(&self, id: i32, refresh: &RemoteRefresh)
    -> Result<Post, ApiError>;
    /// `(id, external_id)` of visible posts from `source` created at or after
    /// `since`.
    async fn live_external_ids_since(
        &self,
        source: PostSource,
        since: NaiveDateTime,
    ) -> Result<Vec<(i32, String)>, ApiError>;
    async fn mark_source_deleted(&self, id: i32) -> Result<(), ApiError>;
    /// Store a share link. `external_url` is only filled when still empty.
    async fn record_share(&self, id: i32, share: &Share) -> Result<Post, ApiError>;
}
