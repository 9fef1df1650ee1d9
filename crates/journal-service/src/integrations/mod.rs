//! REST clients for the platforms the journal talks to.
//!
//! Each platform sits behind a trait so reconcilers and the cross-poster can
//! be driven by fakes in tests. A platform whose credentials are missing is
//! simply absent from [`Integrations`].

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::Config;

pub mod bluesky;
pub mod github;
pub mod mastodon;
pub mod spotify;

pub use bluesky::{BlueskyApi, BlueskyPost, BlueskyRecord, HttpBluesky};
pub use github::{GithubApi, GithubPull, GithubRepo, GithubUser, HttpGithub, RepoRef};
pub use mastodon::{
    HttpMastodon, MastodonAccount, MastodonApi, MastodonStatus, MediaAttachment, PublishedStatus,
};
pub use spotify::{HttpSpotify, SpotifyApi, SpotifyArtist, SpotifyTrack, TimeRange};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} API error ({status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, IntegrationError>;

/// Pass a successful response through, turn anything else into
/// [`IntegrationError::Api`] carrying the response body.
pub(crate) async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    tracing::warn!(service, status = status.as_u16(), %message, "Remote API returned an error");
    Err(IntegrationError::Api {
        service,
        status: status.as_u16(),
        message,
    })
}

/// The configured platform clients, built once at startup and shared by
/// every request.
#[derive(Clone, Default)]
pub struct Integrations {
    pub mastodon: Option<Arc<dyn MastodonApi>>,
    pub bluesky: Option<Arc<dyn BlueskyApi>>,
    pub github: Option<Arc<dyn GithubApi>>,
    pub spotify: Option<Arc<dyn SpotifyApi>>,
}

impl Integrations {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("journal-service/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            mastodon: config.mastodon.as_ref().map(|cfg| {
                Arc::new(HttpMastodon::new(client.clone(), cfg)) as Arc<dyn MastodonApi>
            }),
            bluesky: config.bluesky.as_ref().map(|cfg| {
                Arc::new(HttpBluesky::new(client.clone(), cfg)) as Arc<dyn BlueskyApi>
            }),
            github: config.github.as_ref().map(|cfg| {
                Arc::new(HttpGithub::new(client.clone(), cfg)) as Arc<dyn GithubApi>
            }),
            spotify: config.spotify.as_ref().map(|cfg| {
                Arc::new(HttpSpotify::new(client.clone(), cfg)) as Arc<dyn SpotifyApi>
            }),
        })
    }
}
