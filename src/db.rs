use crate::config::Config;
use chrono::prelude::*;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::r2d2;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::OnceLock;

#[cfg(test)]
use std::sync::Once;

#[cfg(test)]
use diesel::connection::Connection;

#[cfg(test)]
use dotenv::dotenv;

pub mod alerts;
pub mod feedback;
pub mod user_settings;
pub mod users;

pub type Pool = r2d2::Pool<r2d2::ConnectionManager<PgConnection>>;
pub type PooledConnection = r2d2::PooledConnection<r2d2::ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

static POOL: OnceLock<Pool> = OnceLock::new();

#[cfg(test)]
static TEST_MIGRATIONS: Once = Once::new();

#[derive(Debug)]
pub struct MigrationError {
    pub msg: String,
}

#[cfg(test)]
pub fn establish_test_connection() -> PgConnection {
    dotenv().ok();

    let url = database_url();

    let mut connection =
        PgConnection::establish(url).unwrap_or_else(|_| panic!("Error connecting to {}", url));

    TEST_MIGRATIONS.call_once(|| {
        run_migrations(&mut connection).expect("Failed to run migrations");
    });

    connection
}

pub fn current_time() -> DateTime<Utc> {
    Utc::now().round_subsecs(0)
}

pub fn pool() -> &'static Pool {
    POOL.get_or_init(create_connection_pool)
}

pub fn create_connection_pool() -> Pool {
    let url = database_url();

    let manager = r2d2::ConnectionManager::<PgConnection>::new(url);

    r2d2::Pool::builder()
        .max_size(Config::database_pool_size())
        .build(manager)
        .unwrap_or_else(|error| panic!("Failed to create a connection pool: {error}"))
}

pub fn database_url() -> &'static str {
    Config::database_url()
}

/// Applies every pending migration and returns the versions that were run.
pub fn run_migrations(conn: &mut PgConnection) -> Result<Vec<String>, MigrationError> {
    let versions = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|error| MigrationError {
            msg: format!("{error}"),
        })?;

    Ok(versions.iter().map(|version| version.to_string()).collect())
}
