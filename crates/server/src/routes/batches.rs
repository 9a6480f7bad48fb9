//! Batch CRUD, upsert and summary handlers.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tracing::instrument;

use lotkeeper_core::{BatchId, UpsertOutcome};

use crate::db::RepositoryError;
use crate::error::AppError;
use crate::models::{Batch, BatchPatchRequest, BatchRequest, CodeSummary};
use crate::state::AppState;

/// Build the batches router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/batches",
            get(list_batches).post(upsert_batch).delete(clear_batches),
        )
        .route("/batches/add-lot", post(upsert_batch))
        .route("/batches/summary", get(summary))
        .route("/batches/by-code/{code}", get(list_by_code))
        .route(
            "/batches/{id}",
            get(get_batch).put(update_batch).delete(delete_batch),
        )
}

/// Response for a create-or-merge request.
#[derive(Debug, Serialize)]
pub struct UpsertResponse {
    pub message: String,
    pub batch: Batch,
    pub outcome: UpsertOutcome,
}

/// Response for clearing the store.
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub message: String,
    pub removed: u64,
}

fn parse_id(raw: &str) -> Result<BatchId, AppError> {
    raw.parse()
        .map_err(|_| AppError::Validation(format!("invalid batch id `{raw}`")))
}

fn batch_not_found(id: BatchId) -> impl FnOnce(RepositoryError) -> AppError {
    move |e| match e {
        RepositoryError::NotFound => AppError::NotFound(format!("batch {id} not found")),
        other => other.into(),
    }
}

/// List every batch ordered by code.
#[instrument(skip_all)]
async fn list_batches(State(state): State<AppState>) -> Result<Json<Vec<Batch>>, AppError> {
    Ok(Json(state.store().list().await?))
}

/// Create a batch, or add the quantity to the existing `(code, lot)` batch.
///
/// Responds 201 when a batch was created and 200 when merged.
#[instrument(skip_all)]
async fn upsert_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let input = request.validate()?;
    let upserted = state.store().upsert(&input).await?;

    let (status, message) = match upserted.outcome {
        UpsertOutcome::Created => {
            tracing::info!(
                batch_id = %upserted.batch.id,
                code = %upserted.batch.code,
                lot = %upserted.batch.lot,
                quantity = upserted.batch.quantity,
                "Batch created"
            );
            (StatusCode::CREATED, "New batch registered".to_string())
        }
        UpsertOutcome::Merged => {
            tracing::info!(
                batch_id = %upserted.batch.id,
                code = %upserted.batch.code,
                lot = %upserted.batch.lot,
                added = input.quantity.get(),
                quantity = upserted.batch.quantity,
                "Quantity merged into existing batch"
            );
            (
                StatusCode::OK,
                format!(
                    "Quantity added to existing batch. New quantity: {}",
                    upserted.batch.quantity
                ),
            )
        }
    };

    let body = UpsertResponse {
        message,
        batch: upserted.batch,
        outcome: upserted.outcome,
    };
    Ok((status, Json(body)).into_response())
}

/// Remove every batch.
#[instrument(skip_all)]
async fn clear_batches(State(state): State<AppState>) -> Result<Json<ClearResponse>, AppError> {
    let removed = state.store().clear_all().await?;
    tracing::info!(removed, "All batches cleared");

    Ok(Json(ClearResponse {
        message: format!("All data cleared. {removed} batch(es) removed."),
        removed,
    }))
}

/// Totals per code.
#[instrument(skip_all)]
async fn summary(State(state): State<AppState>) -> Result<Json<Vec<CodeSummary>>, AppError> {
    Ok(Json(state.store().summary_by_code().await?))
}

/// Batches of one code ordered by expiry.
#[instrument(skip_all, fields(code = %code))]
async fn list_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Vec<Batch>>, AppError> {
    let batches = state.store().list_by_code(code.trim()).await?;
    if batches.is_empty() {
        return Err(AppError::NotFound(format!("no batches for code `{code}`")));
    }
    Ok(Json(batches))
}

/// One batch by id.
#[instrument(skip_all, fields(batch_id = %id))]
async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Batch>, AppError> {
    let id = parse_id(&id)?;
    let batch = state.store().get(id).await.map_err(batch_not_found(id))?;
    Ok(Json(batch))
}

/// Apply a partial update.
#[instrument(skip_all, fields(batch_id = %id))]
async fn update_batch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<BatchPatchRequest>, JsonRejection>,
) -> Result<Json<Batch>, AppError> {
    let id = parse_id(&id)?;
    let Json(request) = payload?;
    let patch = request.validate()?;

    let batch = state
        .store()
        .update(id, &patch)
        .await
        .map_err(batch_not_found(id))?;
    tracing::info!(batch_id = %id, "Batch updated");

    Ok(Json(batch))
}

/// Remove one batch.
#[instrument(skip_all, fields(batch_id = %id))]
async fn delete_batch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    let batch = state
        .store()
        .delete(id)
        .await
        .map_err(batch_not_found(id))?;
    tracing::info!(
        batch_id = %id,
        code = %batch.code,
        lot = %batch.lot,
        "Batch deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}
