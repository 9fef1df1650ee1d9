use anyhow::{Context, Result};
use std::env;
use url::Url;

use crate::models::Target;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_BLUESKY_SERVICE: &str = "https://bsky.social";

/// Application configuration loaded from environment variables.
///
/// Every integration is optional: a missing credential leaves the
/// integration unconfigured and the jobs that need it become no-ops.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    /// Secure cookies, and a real session secret is required.
    pub production: bool,
    pub auth: AuthConfig,
    pub mastodon: Option<MastodonConfig>,
    pub bluesky: Option<BlueskyConfig>,
    pub github: Option<GithubConfig>,
    pub spotify: Option<SpotifyConfig>,
    pub crosspost: CrosspostSwitches,
}

#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub admin_password: Option<String>,
    pub session_secret: Option<String>,
    /// Shared key scheduled triggers pass as `?key=`.
    pub cron_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MastodonConfig {
    pub base_url: String,
    pub access_token: String,
}

#[derive(Debug, Clone)]
pub struct BlueskyConfig {
    pub service_url: String,
    pub identifier: String,
    pub app_password: String,
}

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub token: String,
    /// Import repos of this login instead of the token's owner.
    pub owner: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

/// Which scheduled jobs share their posts, and where.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrosspostSwitches {
    pub github_mastodon: bool,
    pub github_bluesky: bool,
    pub spotify_mastodon: bool,
    pub spotify_bluesky: bool,
}

impl CrosspostSwitches {
    pub fn github_targets(&self) -> Vec<Target> {
        targets(self.github_mastodon, self.github_bluesky)
    }

    pub fn spotify_targets(&self) -> Vec<Target> {
        targets(self.spotify_mastodon, self.spotify_bluesky)
    }
}

fn targets(mastodon: bool, bluesky: bool) -> Vec<Target> {
    let mut targets = Vec::new();
    if mastodon {
        targets.push(Target::Mastodon);
    }
    if bluesky {
        targets.push(Target::Bluesky);
    }
    targets
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenvy::dotenv();

        let production = var("JOURNAL_ENV").as_deref() == Some("production");
        let auth = AuthConfig {
            admin_password: var("ADMIN_PASSWORD"),
            session_secret: var("ADMIN_SESSION_SECRET"),
            cron_secret: var("CRON_SECRET"),
        };

        if production && auth.session_secret.is_none() {
            anyhow::bail!("ADMIN_SESSION_SECRET must be set when JOURNAL_ENV=production");
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            production,
            auth,
            mastodon: match (var("MASTODON_BASE_URL"), var("MASTODON_ACCESS_TOKEN")) {
                (Some(base_url), Some(access_token)) => {
                    Url::parse(&base_url).context("MASTODON_BASE_URL must be a valid URL")?;
                    Some(MastodonConfig {
                        base_url: base_url.trim_end_matches('/').to_string(),
                        access_token,
                    })
                }
                _ => None,
            },
            bluesky: match (var("BLUESKY_IDENTIFIER"), var("BLUESKY_APP_PASSWORD")) {
                (Some(identifier), Some(app_password)) => Some(BlueskyConfig {
                    service_url: var("BLUESKY_SERVICE_URL")
                        .map(|url| url.trim_end_matches('/').to_string())
                        .unwrap_or_else(|| DEFAULT_BLUESKY_SERVICE.to_string()),
                    identifier,
                    app_password,
                }),
                _ => None,
            },
            github: var("GITHUB_TOKEN").map(|token| GithubConfig {
                token,
                owner: var("GITHUB_OWNER"),
            }),
            spotify: match (
                var("SPOTIFY_CLIENT_ID"),
                var("SPOTIFY_CLIENT_SECRET"),
                var("SPOTIFY_REFRESH_TOKEN"),
            ) {
                (Some(client_id), Some(client_secret), Some(refresh_token)) => {
                    Some(SpotifyConfig {
                        client_id,
                        client_secret,
                        refresh_token,
                    })
                }
                _ => None,
            },
            crosspost: CrosspostSwitches {
                github_mastodon: flag("GITHUB_SYNC_ENABLE_MASTODON"),
                github_bluesky: flag("GITHUB_SYNC_ENABLE_BLUESKY"),
                spotify_mastodon: flag("SPOTIFY_SYNC_ENABLE_MASTODON"),
                spotify_bluesky: flag("SPOTIFY_SYNC_ENABLE_BLUESKY"),
            },
        })
    }

    /// Cookie value that marks a logged-in admin.
    pub fn session_token(&self) -> &str {
        self.auth.session_secret.as_deref().unwrap_or("1")
    }
}

/// Non-empty value of an environment variable.
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn flag(name: &str) -> bool {
    var(name).is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_token_prefers_secret() {
        let mut config = Config::default();
        assert_eq!(config.session_token(), "1");

        config.auth.session_secret = Some("s3cret".to_string());
        assert_eq!(config.session_token(), "s3cret");
    }

    #[test]
    fn test_crosspost_switches_to_targets() {
        let switches = CrosspostSwitches {
            github_mastodon: true,
            github_bluesky: true,
            spotify_mastodon: false,
            spotify_bluesky: true,
        };

        assert_eq!(
            switches.github_targets(),
            vec![Target::Mastodon, Target::Bluesky]
        );
        assert_eq!(switches.spotify_targets(), vec![Target::Bluesky]);
        assert!(CrosspostSwitches::default().github_targets().is_empty());
    }
}
