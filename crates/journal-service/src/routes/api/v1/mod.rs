use crate::AppState;
use axum::{
    Router,
    routing::{get, post},
};

mod jobs;
mod posts;
mod session;

/// Query values from schedulers are parsed leniently: anything that does not
/// parse counts as absent.
fn lenient<T: std::str::FromStr>(value: Option<&str>) -> Option<T> {
    value.and_then(|value| value.trim().parse().ok())
}

pub fn create_api_v1_router<S: AppState>() -> Router<S> {
    Router::new()
        .route("/posts", get(posts::list_posts::<S>).post(posts::create_post::<S>))
        .route("/posts/{id}", get(posts::get_post::<S>))
        .route("/login", post(session::login::<S>))
        .route("/logout", post(session::logout::<S>))
        .route("/sync/mastodon", get(jobs::mastodon_sync::<S>))
        .route("/integrations/github-sync", get(jobs::github_sync::<S>))
        .route(
            "/integrations/github-weekly-sync",
            get(jobs::github_weekly_sync::<S>),
        )
        .route("/integrations/spotify-sync", get(jobs::spotify_sync::<S>))
}
