//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                 - Liveness check
//! GET    /health/ready           - Readiness check (store reachable)
//!
//! # Batches
//! GET    /batches                - List batches ordered by code
//! POST   /batches                - Create a batch or merge into (code, lot)
//! POST   /batches/add-lot        - Same as POST /batches
//! DELETE /batches                - Remove every batch
//! GET    /batches/summary        - Totals per code
//! GET    /batches/by-code/{code} - Batches of one code ordered by expiry
//! GET    /batches/{id}           - One batch
//! PUT    /batches/{id}           - Partial update
//! DELETE /batches/{id}           - Remove one batch
//!
//! # Reports
//! GET    /reports/pdf            - Printable report
//! GET    /reports/xlsx           - Spreadsheet report
//! ```

pub mod batches;
pub mod health;
pub mod reports;

use axum::Router;

use crate::state::AppState;

/// All application routes, awaiting state.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(batches::router())
        .merge(reports::router())
}

/// All application routes bound to `state`.
pub fn router(state: AppState) -> Router {
    routes().with_state(state)
}
