//! Admin session cookie and the shared key scheduled triggers use.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::config::Config;
use crate::errors::ApiError;

pub const SESSION_COOKIE: &str = "journal_session";
const SESSION_DAYS: i64 = 30;

/// True when the request carries the admin session. Without an admin
/// password nobody can be logged in.
pub fn has_session(jar: &CookieJar, config: &Config) -> bool {
    config.auth.admin_password.is_some()
        && jar
            .get(SESSION_COOKIE)
            .is_some_and(|cookie| cookie.value() == config.session_token())
}

fn key_matches(key: Option<&str>, config: &Config) -> bool {
    match (key, config.auth.cron_secret.as_deref()) {
        (Some(key), Some(secret)) => key == secret,
        _ => false,
    }
}

pub fn require_session(jar: &CookieJar, config: &Config) -> Result<(), ApiError> {
    if has_session(jar, config) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// Admin session, or the shared key when one is configured.
pub fn require_session_or_key(
    jar: &CookieJar,
    key: Option<&str>,
    config: &Config,
) -> Result<(), ApiError> {
    if has_session(jar, config) || key_matches(key, config) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

/// Scheduled jobs are open until a shared key is configured.
pub fn require_key_if_configured(
    jar: &CookieJar,
    key: Option<&str>,
    config: &Config,
) -> Result<(), ApiError> {
    if config.auth.cron_secret.is_none() {
        return Ok(());
    }
    require_session_or_key(jar, key, config)
}

pub fn session_cookie(config: &Config) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, config.session_token().to_string()))
        .http_only(true)
        .secure(config.production)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::days(SESSION_DAYS))
        .build()
}

/// The cookie shape to remove; the jar turns it into an expired cookie.
pub fn session_removal(config: &Config) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE)
        .http_only(true)
        .secure(config.production)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}
