#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::sqlite::SqliteConnection;
use journal_service::config::{AuthConfig, Config};
use journal_service::db::establish_connection;
use journal_service::integrations::github::RepoOwner;
use journal_service::integrations::{
    self, BlueskyApi, BlueskyPost, BlueskyRecord, GithubApi, GithubPull, GithubRepo, GithubUser,
    IntegrationError, Integrations, MastodonAccount, MastodonApi, MastodonStatus,
    MediaAttachment, PublishedStatus, RepoRef, SpotifyApi, SpotifyArtist, SpotifyTrack, TimeRange,
};
use journal_service::validation::DataUrl;

pub const ADMIN_PASSWORD: &str = "hunter2";
pub const CRON_KEY: &str = "cron-key";
pub const MASTODON_BASE: &str = "https://social.example";

pub fn establish_test_connection() -> SqliteConnection {
    establish_connection(":memory:").expect("Failed to create in-memory database")
}

pub fn test_config() -> Config {
    Config {
        database_url: ":memory:".to_string(),
        auth: AuthConfig {
            admin_password: Some(ADMIN_PASSWORD.to_string()),
            session_secret: None,
            cron_secret: Some(CRON_KEY.to_string()),
        },
        ..Default::default()
    }
}

fn api_error(service: &'static str) -> IntegrationError {
    IntegrationError::Api {
        service,
        status: 500,
        message: "boom".to_string(),
    }
}

/// An account timeline served newest first, plus a log of what was published.
#[derive(Default)]
pub struct FakeMastodon {
    pub timeline: Mutex<Vec<MastodonStatus>>,
    pub published: Mutex<Vec<(String, Vec<String>)>>,
    pub uploads: Mutex<Vec<DataUrl>>,
    pub fail_fetch: AtomicBool,
    pub fail_publish: AtomicBool,
}

impl FakeMastodon {
    pub fn with_timeline(timeline: Vec<MastodonStatus>) -> Arc<Self> {
        Arc::new(Self {
            timeline: Mutex::new(timeline),
            ..Default::default()
        })
    }

    pub fn set_timeline(&self, timeline: Vec<MastodonStatus>) {
        *self.timeline.lock().unwrap() = timeline;
    }

    pub fn published_texts(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }
}

#[async_trait]
impl MastodonApi for FakeMastodon {
    fn base_url(&self) -> &str {
        MASTODON_BASE
    }

    async fn verify_credentials(&self) -> integrations::Result<MastodonAccount> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(api_error("mastodon"));
        }
        Ok(MastodonAccount {
            id: "1".to_string(),
            username: "me".to_string(),
            acct: "me".to_string(),
            url: format!("{MASTODON_BASE}/@me"),
        })
    }

    async fn account_statuses(
        &self,
        _account_id: &str,
        limit: u32,
        max_id: Option<&str>,
    ) -> integrations::Result<Vec<MastodonStatus>> {
        let timeline = self.timeline.lock().unwrap();
        let start = match max_id {
            Some(max_id) => timeline
                .iter()
                .position(|status| status.id == max_id)
                .map_or(timeline.len(), |idx| idx + 1),
            None => 0,
        };
        Ok(timeline
            .iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn upload_media(&self, image: &DataUrl) -> integrations::Result<String> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(image.clone());
        Ok(format!("media-{}", uploads.len()))
    }

    async fn publish_status(
        &self,
        status: &str,
        media_ids: &[String],
    ) -> integrations::Result<PublishedStatus> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(api_error("mastodon"));
        }
        let mut published = self.published.lock().unwrap();
        published.push((status.to_string(), media_ids.to_vec()));
        let id = 900 + published.len();
        Ok(PublishedStatus {
            id: id.to_string(),
            url: Some(format!("{MASTODON_BASE}/@me/{id}")),
        })
    }
}

pub fn status(id: &str, created_at: DateTime<Utc>, html: &str) -> MastodonStatus {
    MastodonStatus {
        id: id.to_string(),
        url: Some(format!("{MASTODON_BASE}/@me/{id}")),
        created_at,
        content: html.to_string(),
        visibility: "public".to_string(),
        reblog: None,
        media_attachments: Vec::new(),
    }
}

pub fn with_image(mut status: MastodonStatus, url: &str) -> MastodonStatus {
    status.media_attachments.push(MediaAttachment {
        id: format!("m{}", status.id),
        media_type: "image".to_string(),
        url: Some(url.to_string()),
        preview_url: None,
    });
    status
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlueskyCall {
    pub text: String,
    pub link: Option<String>,
    pub with_image: bool,
}

#[derive(Default)]
pub struct FakeBluesky {
    pub published: Mutex<Vec<BlueskyCall>>,
    pub fail: AtomicBool,
}

impl FakeBluesky {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<BlueskyCall> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlueskyApi for FakeBluesky {
    async fn publish(&self, post: &BlueskyPost<'_>) -> integrations::Result<BlueskyRecord> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(api_error("bluesky"));
        }
        let mut published = self.published.lock().unwrap();
        published.push(BlueskyCall {
            text: post.text.to_string(),
            link: post.link.map(str::to_string),
            with_image: post.image.is_some(),
        });
        Ok(BlueskyRecord {
            uri: format!("at://did:plc:me/app.bsky.feed.post/{}", published.len()),
            cid: format!("cid{}", published.len()),
        })
    }
}

#[derive(Default)]
pub struct FakeGithub {
    pub login: String,
    pub repos: Vec<GithubRepo>,
    pub pulls: HashMap<String, Vec<GithubPull>>,
    pub fail_repos: AtomicBool,
}

impl FakeGithub {
    pub fn new(login: &str) -> Self {
        Self {
            login: login.to_string(),
            ..Default::default()
        }
    }

    pub fn repo(mut self, owner: &str, name: &str, pulls: Vec<GithubPull>) -> Self {
        let full_name = format!("{owner}/{name}");
        self.repos.push(GithubRepo {
            name: name.to_string(),
            full_name: full_name.clone(),
            private: false,
            fork: false,
            archived: false,
            owner: RepoOwner {
                login: owner.to_string(),
            },
        });
        self.pulls.insert(full_name, pulls);
        self
    }

    pub fn fork(mut self, owner: &str, name: &str, pulls: Vec<GithubPull>) -> Self {
        self = self.repo(owner, name, pulls);
        if let Some(repo) = self.repos.last_mut() {
            repo.fork = true;
        }
        self
    }
}

#[async_trait]
impl GithubApi for FakeGithub {
    async fn viewer(&self) -> integrations::Result<GithubUser> {
        Ok(GithubUser {
            login: self.login.clone(),
        })
    }

    async fn owned_public_repos(
        &self,
        page: u32,
        per_page: u32,
    ) -> integrations::Result<Vec<GithubRepo>> {
        if self.fail_repos.load(Ordering::SeqCst) {
            return Err(api_error("github"));
        }
        Ok(self
            .repos
            .iter()
            .skip(((page - 1) * per_page) as usize)
            .take(per_page as usize)
            .cloned()
            .collect())
    }

    async fn closed_pulls(
        &self,
        repo: &RepoRef,
        per_page: u32,
    ) -> integrations::Result<Vec<GithubPull>> {
        Ok(self
            .pulls
            .get(&repo.full_name)
            .map(|pulls| pulls.iter().take(per_page as usize).cloned().collect())
            .unwrap_or_default())
    }
}

pub fn pull(number: u64, title: &str, merged_at: Option<DateTime<Utc>>) -> GithubPull {
    GithubPull {
        number,
        title: title.to_string(),
        html_url: format!("https://github.com/owner/repo/pull/{number}"),
        merged_at,
    }
}

#[derive(Default)]
pub struct FakeSpotify {
    pub artists: Vec<SpotifyArtist>,
    pub tracks: Vec<SpotifyTrack>,
    pub requested: Mutex<Vec<(TimeRange, u32, u32)>>,
}

impl FakeSpotify {
    pub fn new(artists: &[&str], tracks: &[(&str, &str)]) -> Self {
        Self {
            artists: artists
                .iter()
                .map(|name| SpotifyArtist {
                    name: name.to_string(),
                })
                .collect(),
            tracks: tracks
                .iter()
                .map(|(artist, name)| SpotifyTrack {
                    name: name.to_string(),
                    artists: vec![SpotifyArtist {
                        name: artist.to_string(),
                    }],
                })
                .collect(),
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SpotifyApi for FakeSpotify {
    async fn top_artists(
        &self,
        range: TimeRange,
        limit: u32,
    ) -> integrations::Result<Vec<SpotifyArtist>> {
        self.requested.lock().unwrap().push((range, limit, 0));
        Ok(self.artists.iter().take(limit as usize).cloned().collect())
    }

    async fn top_tracks(
        &self,
        range: TimeRange,
        limit: u32,
    ) -> integrations::Result<Vec<SpotifyTrack>> {
        self.requested.lock().unwrap().push((range, 0, limit));
        Ok(self.tracks.iter().take(limit as usize).cloned().collect())
    }
}

pub mod server_utils {
    use super::*;
    use axum_test::TestServer;
    use axum_extra::extract::cookie::Cookie;
    use journal_service::auth::SESSION_COOKIE;
    use journal_service::{DefaultAppState, create_app};
    use serde_json::json;

    pub fn create_test_server() -> (TestServer, Arc<Mutex<SqliteConnection>>) {
        create_test_server_with(test_config(), Integrations::default())
    }

    pub fn create_test_server_with(
        config: Config,
        integrations: Integrations,
    ) -> (TestServer, Arc<Mutex<SqliteConnection>>) {
        let db = Arc::new(Mutex::new(establish_test_connection()));

        let state = DefaultAppState::new(db.clone(), config, integrations);
        let app = create_app(state);

        let server = TestServer::new(app).unwrap();
        (server, db)
    }

    /// Log in as the admin and return the session cookie.
    pub async fn login(server: &TestServer) -> axum_test::TestResponse {
        server
            .post("/api/v1/login")
            .json(&json!({ "password": ADMIN_PASSWORD }))
            .await
    }

    pub async fn session_cookie(server: &TestServer) -> Cookie<'static> {
        let response = login(server).await;
        response.assert_status_ok();
        response.cookie(SESSION_COOKIE)
    }
}

pub mod test_utils {
    use chrono::NaiveDateTime;
    use diesel::prelude::*;
    use diesel::sqlite::SqliteConnection;
    use journal_service::models::{Post, PostSource};
    use journal_service::schema::posts;

    pub fn count_posts(conn: &mut SqliteConnection) -> i64 {
        posts::table
            .count()
            .get_result(conn)
            .expect("Failed to count posts")
    }

    pub fn all_posts(conn: &mut SqliteConnection) -> Vec<Post> {
        posts::table
            .order(posts::id.asc())
            .select(Post::as_select())
            .load(conn)
            .expect("Failed to load posts")
    }

    pub fn post_by_external_id(
        conn: &mut SqliteConnection,
        source: PostSource,
        external_id: &str,
    ) -> Option<Post> {
        posts::table
            .filter(posts::source.eq(source))
            .filter(posts::external_id.eq(external_id))
            .select(Post::as_select())
            .first(conn)
            .optional()
            .expect("Failed to query post by external id")
    }

    pub fn set_created_at(conn: &mut SqliteConnection, id: i32, created_at: NaiveDateTime) {
        diesel::update(posts::table.find(id))
            .set(posts::created_at.eq(created_at))
            .execute(conn)
            .expect("Failed to update created_at");
    }
}
