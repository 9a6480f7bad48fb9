//! Batch storage.
//!
//! # Backends
//!
//! - [`PgBatchStore`] - `PostgreSQL` (`inventory.batch` table), used in production
//! - [`MemoryBatchStore`] - in-process map for development and tests
//!
//! Both enforce the `(code, lot)` uniqueness invariant and make every
//! mutation all-or-nothing.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p lotkeeper-cli -- migrate
//! ```

pub mod batches;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use lotkeeper_core::BatchId;

use crate::models::{Batch, BatchPatch, CodeSummary, NewBatch, Upserted};

pub use batches::PgBatchStore;
pub use memory::MemoryBatchStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate code and lot).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A numeric result does not fit its column.
    #[error("value out of range: {0}")]
    OutOfRange(String),
}

/// Persistent collection of batches keyed by `(code, lot)`.
#[async_trait]
pub trait BatchStore: Send + Sync {
    /// All batches ordered by code, then id.
    async fn list(&self) -> Result<Vec<Batch>, RepositoryError>;

    /// One batch by id.
    async fn get(&self, id: BatchId) -> Result<Batch, RepositoryError>;

    /// Create the batch, or add its quantity to the existing `(code, lot)` row.
    ///
    /// On merge only `quantity` and `registered_at` change.
    async fn upsert(&self, input: &NewBatch) -> Result<Upserted, RepositoryError>;

    /// Apply the fields set in `patch`.
    async fn update(&self, id: BatchId, patch: &BatchPatch) -> Result<Batch, RepositoryError>;

    /// Remove a batch, returning it.
    async fn delete(&self, id: BatchId) -> Result<Batch, RepositoryError>;

    /// Remove every batch, returning how many were removed.
    async fn clear_all(&self) -> Result<u64, RepositoryError>;

    /// Batches of one code ordered by expiry, then id.
    async fn list_by_code(&self, code: &str) -> Result<Vec<Batch>, RepositoryError>;

    /// Totals per code, ordered by code.
    async fn summary_by_code(&self) -> Result<Vec<CodeSummary>, RepositoryError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
