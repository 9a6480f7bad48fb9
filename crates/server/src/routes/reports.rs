//! Report download handlers.

use axum::{
    Router,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::instrument;

use crate::error::AppError;
use crate::report::{self, ReportContext, ReportFile};
use crate::state::AppState;

/// Build the reports router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reports/pdf", get(pdf_report))
        .route("/reports/xlsx", get(xlsx_report))
}

fn attachment(file: ReportFile) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    (
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response()
}

/// Download the printable report.
#[instrument(skip_all)]
async fn pdf_report(State(state): State<AppState>) -> Result<Response, AppError> {
    let file = report::printable_report(state.store(), &ReportContext::now()).await?;
    Ok(attachment(file))
}

/// Download the spreadsheet report.
#[instrument(skip_all)]
async fn xlsx_report(State(state): State<AppState>) -> Result<Response, AppError> {
    let file = report::spreadsheet_report(state.store(), &ReportContext::now()).await?;
    Ok(attachment(file))
}
