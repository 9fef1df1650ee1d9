use super::traits::{FeedQuery, PostRepository, Share};
use crate::errors::ApiError;
use crate::models::{NewPost, Post, PostSource, RemoteRefresh};
use crate::schema::posts;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::SqliteConnection;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Clone)]
pub struct SqlitePostRepository {
    db: Arc<Mutex<SqliteConnection>>,
}

impl SqlitePostRepository {
    pub fn new(db: Arc<Mutex<SqliteConnection>>) -> Self {
        Self { db }
    }

    fn conn(&self) -> Result<MutexGuard<'_, SqliteConnection>, ApiError> {
        self.db.lock().map_err(|_| ApiError::InternalError)
    }
}

fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl PostRepository for SqlitePostRepository {
    async fn list(&self, query: &FeedQuery) -> Result<Vec<Post>, ApiError> {
        let mut statement = posts::table
            .filter(posts::source_deleted.eq(false))
            .into_boxed();

        if let Some(cursor) = query.cursor {
            statement = statement.filter(posts::id.lt(cursor));
        }
        if let Some(kind) = query.filter.kind {
            statement = statement.filter(posts::kind.eq(kind));
        }
        if let Some(source) = query.filter.source {
            statement = statement.filter(posts::source.eq(source));
        }
        for tag in &query.filter.tags {
            statement =
                statement.filter(posts::body.like(like_pattern(&format!("#{tag}"))).escape('\\'));
        }
        for term in &query.filter.terms {
            statement = statement.filter(posts::body.like(like_pattern(term)).escape('\\'));
        }

        let mut conn = self.conn()?;
        let result = statement
            .order(posts::id.desc())
            .limit(i64::from(query.limit))
            .select(Post::as_select())
            .load(&mut *conn)?;
        Ok(result)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Post>, ApiError> {
        let mut conn = self.conn()?;
        let result = posts::table
            .find(id)
            .select(Post::as_select())
            .first(&mut *conn)
            .optional()?;
        Ok(result)
    }

    async fn find_by_external_id(
        &self,
        source: PostSource,
        external_id: &str,
    ) -> Result<Option<Post>, ApiError> {
        let mut conn = self.conn()?;
        let result = posts::table
            .filter(posts::source.eq(source))
            .filter(posts::external_id.eq(external_id))
            .select(Post::as_select())
            .first(&mut *conn)
            .optional()?;
        Ok(result)
    }

    async fn create(&self, post: &NewPost) -> Result<Post, ApiError> {
        let mut conn = self.conn()?;
        let result = diesel::insert_into(posts::table)
            .values(post)
            .returning(Post::as_returning())
            .get_result(&mut *conn)?;
        Ok(result)
    }

    async fn create_imported(&self, post: &NewPost) -> Result<Option<Post>, ApiError> {
        let mut conn = self.conn()?;
        let result = diesel::insert_into(posts::table)
            .values(post)
            .returning(Post::as_returning())
            .get_result(&mut *conn);

        match result {
            Ok(inserted) => Ok(Some(inserted)),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                debug!(
                    source = %post.source,
                    external_id = ?post.external_id,
                    "Imported post already exists"
                );
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn refresh_from_remote(
        &self,
        id: i32,
        refresh: &RemoteRefresh,
    ) -> Result<Post, ApiError> {
        let mut conn = self.conn()?;
        let result = diesel::update(posts::table.find(id))
            .set(refresh)
            .returning(Post::as_returning())
            .get_result(&mut *conn)?;
        Ok(result)
    }

    async fn live_external_ids_since(
        &self,
        source: PostSource,
        since: NaiveDateTime,
    ) -> Result<Vec<(i32, String)>, ApiError> {
        let mut conn = self.conn()?;
        let rows = posts::table
            .filter(posts::source.eq(source))
            .filter(posts::source_deleted.eq(false))
            .filter(posts::external_id.is_not_null())
            .filter(posts::created_at.ge(since))
            .select((posts::id, posts::external_id))
            .load::<(i32, Option<String>)>(&mut *conn)?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, external_id)| external_id.map(|external_id| (id, external_id)))
            .collect())
    }

    async fn mark_source_deleted(&self, id: i32) -> Result<(), ApiError> {
        let mut conn = self.conn()?;
        diesel::update(posts::table.find(id))
            .set(posts::source_deleted.eq(true))
            .execute(&mut *conn)?;
        Ok(())
    }

    async fn record_share(&self, id: i32, share: &Share) -> Result<Post, ApiError> {
        let mut conn = self.conn()?;
        let result = conn.transaction::<_, DieselError, _>(|conn| {
            let link = match share {
                Share::Mastodon(url) => {
                    diesel::update(posts::table.find(id))
                        .set(posts::mastodon_url.eq(url))
                        .execute(conn)?;
                    url
                }
                Share::Bluesky(uri) => {
                    diesel::update(posts::table.find(id))
                        .set(posts::bluesky_uri.eq(uri))
                        .execute(conn)?;
                    uri
                }
            };

            diesel::update(
                posts::table
                    .find(id)
                    .filter(posts::external_url.is_null()),
            )
            .set(posts::external_url.eq(link))
            .execute(conn)?;

            posts::table
                .find(id)
                .select(Post::as_select())
                .first(conn)
        })?;
        Ok(result)
    }
}
