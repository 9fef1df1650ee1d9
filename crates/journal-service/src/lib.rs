use axum::Router;
use diesel::sqlite::SqliteConnection;
use std::sync::{Arc, Mutex};

pub mod auth;
pub mod config;
pub mod content;
pub mod crosspost;
pub mod db;
pub mod errors;
pub mod external_id;
pub mod integrations;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod schema;
pub mod search;
pub mod shutdown;
pub mod sync;
pub mod text;
pub mod validation;

use config::Config;
use integrations::Integrations;
use repositories::{PostRepository, SqlitePostRepository};

/// Everything a handler needs, behind a trait so tests can swap the store.
pub trait AppState: Clone + Send + Sync + 'static {
    type Posts: PostRepository;

    fn posts(&self) -> &Self::Posts;
    fn config(&self) -> &Config;
    fn integrations(&self) -> &Integrations;
}

#[derive(Clone)]
pub struct DefaultAppState {
    posts: SqlitePostRepository,
    config: Arc<Config>,
    integrations: Integrations,
}

impl DefaultAppState {
    pub fn new(
        db: Arc<Mutex<SqliteConnection>>,
        config: Config,
        integrations: Integrations,
    ) -> Self {
        Self {
            posts: SqlitePostRepository::new(db),
            config: Arc::new(config),
            integrations,
        }
    }
}

impl AppState for DefaultAppState {
    type Posts = SqlitePostRepository;

    fn posts(&self) -> &Self::Posts {
        &self.posts
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn integrations(&self) -> &Integrations {
        &self.integrations
    }
}

pub fn create_app<S: AppState>(state: S) -> Router {
    routes::create_router().with_state(state)
}
