use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use thiserror::Error;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

#[derive(Error, Debug)]
pub enum DbSetupError {
    #[error("could not open database: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("could not run migrations: {0}")]
    Migration(String),
}

/// Open the database at `database_url` and bring its schema up to date.
/// `:memory:` gives a private, empty database.
pub fn establish_connection(database_url: &str) -> Result<SqliteConnection, DbSetupError> {
    let mut connection = SqliteConnection::establish(database_url)?;

    let applied = connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| DbSetupError::Migration(err.to_string()))?;
    if !applied.is_empty() {
        tracing::info!(count = applied.len(), "Applied database migrations");
    }

    Ok(connection)
}
