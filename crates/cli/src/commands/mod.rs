//! Subcommand implementations.

pub mod clear;
pub mod migrate;
pub mod report;
pub mod seed;

use lotkeeper_server::config::get_database_url;
use lotkeeper_server::db::{self, PgBatchStore};

/// Connect to the database named by `LOTKEEPER_DATABASE_URL`.
///
/// # Errors
///
/// Returns an error if the variable is unset or the connection fails.
pub async fn connect() -> Result<PgBatchStore, Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let database_url = get_database_url("LOTKEEPER_DATABASE_URL")?;
    let pool = db::create_pool(&database_url).await?;
    tracing::info!("Connected to database");

    Ok(PgBatchStore::new(pool))
}
