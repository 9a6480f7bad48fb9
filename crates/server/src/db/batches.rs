//! `PostgreSQL` batch store.
//!
//! Queries are built at runtime with `sqlx::query_as` over `FromRow` row
//! types, so the crate builds without a live database.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use lotkeeper_core::{BatchId, Quantity, UpsertOutcome};

use super::{BatchStore, RepositoryError};
use crate::models::{Batch, BatchPatch, CodeSummary, NewBatch, Upserted};

/// Name of the `(code, lot)` unique constraint.
const UNIQUE_CODE_LOT: &str = "batch_code_lot_key";

/// SQLSTATE `numeric_value_out_of_range`.
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// Attempts before a racing insert is reported as a conflict.
const MAX_UPSERT_ATTEMPTS: u32 = 3;

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for batch queries.
#[derive(Debug, sqlx::FromRow)]
struct BatchRow {
    id: i32,
    code: String,
    name: String,
    lot: String,
    expiry: NaiveDate,
    quantity: i32,
    registered_at: DateTime<Utc>,
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Self {
            id: BatchId::new(row.id),
            code: row.code,
            name: row.name,
            lot: row.lot,
            expiry: row.expiry,
            quantity: row.quantity,
            registered_at: row.registered_at,
        }
    }
}

/// Internal row type for the per-code aggregate.
#[derive(Debug, sqlx::FromRow)]
struct CodeSummaryRow {
    code: String,
    name: String,
    total_quantity: i64,
    batch_count: i64,
}

impl From<CodeSummaryRow> for CodeSummary {
    fn from(row: CodeSummaryRow) -> Self {
        Self {
            code: row.code,
            name: row.name,
            total_quantity: row.total_quantity,
            batch_count: row.batch_count,
        }
    }
}

/// Translate constraint and range violations raised by a write.
fn map_write_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.constraint() == Some(UNIQUE_CODE_LOT) {
            return RepositoryError::Conflict(
                "a batch with this code and lot already exists".to_string(),
            );
        }
        if db_err.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE) {
            return RepositoryError::OutOfRange("quantity exceeds the storable maximum".to_string());
        }
    }
    RepositoryError::Database(e)
}

// =============================================================================
// Store
// =============================================================================

/// Batch store backed by the `inventory.batch` table.
#[derive(Debug, Clone)]
pub struct PgBatchStore {
    pool: PgPool,
}

impl PgBatchStore {
    /// Create a new store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// One create-or-merge attempt inside its own transaction.
    ///
    /// The transaction rolls back when dropped on any early return.
    async fn try_upsert(&self, input: &NewBatch) -> Result<Upserted, RepositoryError> {
        let mut tx: Transaction<'_, Postgres> = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, code, name, lot, expiry, quantity, registered_at
            FROM inventory.batch
            WHERE code = $1 AND lot = $2
            FOR UPDATE
            "#,
        )
        .bind(&input.code)
        .bind(&input.lot)
        .fetch_optional(&mut *tx)
        .await?;

        let (row, outcome) = match existing {
            Some(existing) => {
                let row = sqlx::query_as::<_, BatchRow>(
                    r#"
                    UPDATE inventory.batch
                    SET quantity = quantity + $2,
                        registered_at = NOW()
                    WHERE id = $1
                    RETURNING id, code, name, lot, expiry, quantity, registered_at
                    "#,
                )
                .bind(existing.id)
                .bind(input.quantity.get())
                .fetch_one(&mut *tx)
                .await
                .map_err(map_write_error)?;
                (row, UpsertOutcome::Merged)
            }
            None => {
                let row = sqlx::query_as::<_, BatchRow>(
                    r#"
                    INSERT INTO inventory.batch (code, name, lot, expiry, quantity)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id, code, name, lot, expiry, quantity, registered_at
                    "#,
                )
                .bind(&input.code)
                .bind(&input.name)
                .bind(&input.lot)
                .bind(input.expiry)
                .bind(input.quantity.get())
                .fetch_one(&mut *tx)
                .await
                .map_err(map_write_error)?;
                (row, UpsertOutcome::Created)
            }
        };

        tx.commit().await?;

        Ok(Upserted {
            batch: row.into(),
            outcome,
        })
    }
}

#[async_trait]
impl BatchStore for PgBatchStore {
    async fn list(&self) -> Result<Vec<Batch>, RepositoryError> {
        let rows = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, code, name, lot, expiry, quantity, registered_at
            FROM inventory.batch
            ORDER BY code COLLATE "C" ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get(&self, id: BatchId) -> Result<Batch, RepositoryError> {
        let row = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, code, name, lot, expiry, quantity, registered_at
            FROM inventory.batch
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn upsert(&self, input: &NewBatch) -> Result<Upserted, RepositoryError> {
        let mut attempt = 1;
        loop {
            match self.try_upsert(input).await {
                Err(RepositoryError::Conflict(reason)) if attempt < MAX_UPSERT_ATTEMPTS => {
                    tracing::debug!(
                        code = %input.code,
                        lot = %input.lot,
                        attempt,
                        %reason,
                        "Concurrent insert won the create path, retrying as merge"
                    );
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn update(&self, id: BatchId, patch: &BatchPatch) -> Result<Batch, RepositoryError> {
        let row = sqlx::query_as::<_, BatchRow>(
            r#"
            UPDATE inventory.batch
            SET
                code = COALESCE($2, code),
                name = COALESCE($3, name),
                lot = COALESCE($4, lot),
                expiry = COALESCE($5, expiry),
                quantity = COALESCE($6, quantity)
            WHERE id = $1
            RETURNING id, code, name, lot, expiry, quantity, registered_at
            "#,
        )
        .bind(id)
        .bind(patch.code.as_deref())
        .bind(patch.name.as_deref())
        .bind(patch.lot.as_deref())
        .bind(patch.expiry)
        .bind(patch.quantity.map(Quantity::get))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn delete(&self, id: BatchId) -> Result<Batch, RepositoryError> {
        let row = sqlx::query_as::<_, BatchRow>(
            r#"
            DELETE FROM inventory.batch
            WHERE id = $1
            RETURNING id, code, name, lot, expiry, quantity, registered_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn clear_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM inventory.batch")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn list_by_code(&self, code: &str) -> Result<Vec<Batch>, RepositoryError> {
        let rows = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, code, name, lot, expiry, quantity, registered_at
            FROM inventory.batch
            WHERE code = $1
            ORDER BY expiry ASC, id ASC
            "#,
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn summary_by_code(&self) -> Result<Vec<CodeSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, CodeSummaryRow>(
            r#"
            SELECT
                code,
                MIN(name COLLATE "C") AS name,
                COALESCE(SUM(quantity), 0)::bigint AS total_quantity,
                COUNT(*) AS batch_count
            FROM inventory.batch
            GROUP BY code
            ORDER BY code COLLATE "C" ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
