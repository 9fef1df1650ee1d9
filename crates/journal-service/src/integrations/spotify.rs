use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

use super::{Result, ensure_success};
use crate::config::SpotifyConfig;

const SERVICE: &str = "spotify";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

pub const DEFAULT_TOP_LIMIT: u32 = 5;
pub const MAX_TOP_LIMIT: u32 = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeRange {
    #[default]
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }

    /// Human phrase used in the snapshot post.
    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "recent weeks",
            TimeRange::MediumTerm => "last few months",
            TimeRange::LongTerm => "long term",
        }
    }

    /// Anything unrecognised falls back to the short term range.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("medium_term") => TimeRange::MediumTerm,
            Some("long_term") => TimeRange::LongTerm,
            _ => TimeRange::ShortTerm,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    pub name: String,
    pub artists: Vec<SpotifyArtist>,
}

impl SpotifyTrack {
    /// `Artist A, Artist B – Track`
    pub fn display_title(&self) -> String {
        let artists = self
            .artists
            .iter()
            .map(|artist| artist.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("{artists} – {}", self.name)
    }
}

#[derive(Debug, Deserialize)]
struct Paged<T> {
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Clamp a requested list size into what the top-items endpoints accept.
pub fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_TOP_LIMIT)
}

#[async_trait]
pub trait SpotifyApi: Send + Sync {
    async fn top_artists(&self, range: TimeRange, limit: u32) -> Result<Vec<SpotifyArtist>>;

    async fn top_tracks(&self, range: TimeRange, limit: u32) -> Result<Vec<SpotifyTrack>>;
}

/// Exchanges the long-lived refresh token for an access token on every call.
pub struct HttpSpotify {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

impl HttpSpotify {
    pub fn new(client: reqwest::Client, config: &SpotifyConfig) -> Self {
        Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
        }
    }

    async fn access_token(&self) -> Result<String> {
        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.refresh_token.as_str()),
            ])
            .send()
            .await?;

        let token: TokenResponse = ensure_success(SERVICE, response).await?.json().await?;
        Ok(token.access_token)
    }

    async fn top<T>(&self, kind: &str, range: TimeRange, limit: u32) -> Result<Vec<T>>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(format!("{API_BASE}/me/top/{kind}"))
            .bearer_auth(token)
            .query(&[
                ("time_range", range.as_str().to_string()),
                ("limit", clamp_limit(limit).to_string()),
            ])
            .send()
            .await?;

        let page: Paged<T> = ensure_success(SERVICE, response).await?.json().await?;
        Ok(page.items)
    }
}

#[async_trait]
impl SpotifyApi for HttpSpotify {
    async fn top_artists(&self, range: TimeRange, limit: u32) -> Result<Vec<SpotifyArtist>> {
        self.top("artists", range, limit).await
    }

    async fn top_tracks(&self, range: TimeRange, limit: u32) -> Result<Vec<SpotifyTrack>> {
        self.top("tracks", range, limit).await
    }
}
