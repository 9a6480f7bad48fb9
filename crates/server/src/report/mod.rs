//! Stock reports.
//!
//! Both encodings share one pass over the code-sorted batch list
//! ([`grouped_rows`]) that interleaves detail rows with a subtotal after
//! each run of equal codes and a grand total at the end.
//!
//! - [`pdf`] - paginated printable document
//! - [`xlsx`] - workbook with a per-code summary sheet and a detail sheet

pub mod pdf;
pub mod xlsx;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use crate::db::{BatchStore, RepositoryError};
use crate::models::{Batch, CodeSummary};

/// Label of the final row.
pub const GRAND_TOTAL_LABEL: &str = "TOTAL GERAL";

/// Content type of printable reports.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Content type of spreadsheet reports.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Errors that can occur while producing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The printable report needs at least one batch.
    #[error("no batches to report")]
    NoBatches,

    /// Reading the batches failed.
    #[error("store error: {0}")]
    Store(#[from] RepositoryError),

    /// The PDF writer failed.
    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    /// The spreadsheet writer failed.
    #[error("spreadsheet rendering failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// One row of the grouped report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportRow<'a> {
    /// A single batch.
    Detail(&'a Batch),
    /// Sum over one contiguous run of batches sharing a code.
    Subtotal { code: &'a str, quantity: i64 },
    /// Sum over every batch.
    GrandTotal { quantity: i64 },
}

impl ReportRow<'_> {
    /// Caption printed beside a subtotal or total, `None` for details.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        match self {
            Self::Detail(_) => None,
            Self::Subtotal { code, .. } => Some(format!("Subtotal {code}:")),
            Self::GrandTotal { .. } => Some(format!("{GRAND_TOTAL_LABEL}:")),
        }
    }
}

/// Interleave subtotals and a grand total into a code-sorted batch list.
///
/// A subtotal closes every run of equal codes, so a code that reappears
/// after a different one gets a second subtotal. Callers pass the output of
/// [`BatchStore::list`], where that cannot happen.
#[must_use]
pub fn grouped_rows(batches: &[Batch]) -> Vec<ReportRow<'_>> {
    let mut rows = Vec::with_capacity(batches.len() * 2 + 1);
    let mut current_code: Option<&str> = None;
    let mut subtotal: i64 = 0;
    let mut grand_total: i64 = 0;

    for batch in batches {
        if current_code != Some(batch.code.as_str()) {
            if let Some(code) = current_code {
                rows.push(ReportRow::Subtotal {
                    code,
                    quantity: subtotal,
                });
            }
            subtotal = 0;
            current_code = Some(batch.code.as_str());
        }

        rows.push(ReportRow::Detail(batch));
        subtotal += i64::from(batch.quantity);
        grand_total += i64::from(batch.quantity);
    }

    if let Some(code) = current_code {
        rows.push(ReportRow::Subtotal {
            code,
            quantity: subtotal,
        });
    }
    rows.push(ReportRow::GrandTotal {
        quantity: grand_total,
    });

    rows
}

/// A rendered report ready to be sent or saved.
#[derive(Debug, Clone)]
pub struct ReportFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

/// Inputs shared by every report of one request.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext {
    /// Wall-clock time printed in headers and filenames.
    pub generated_at: NaiveDateTime,
}

impl ReportContext {
    /// Context stamped with the current local time.
    #[must_use]
    pub fn now() -> Self {
        Self {
            generated_at: Local::now().naive_local(),
        }
    }

    /// Suggested download name, e.g. `inventory_report_20261019_1430.pdf`.
    #[must_use]
    pub fn filename(&self, extension: &str) -> String {
        format!(
            "inventory_report_{}.{extension}",
            self.generated_at.format("%Y%m%d_%H%M")
        )
    }
}

/// Render the printable report from the current store contents.
///
/// # Errors
///
/// Returns `ReportError::NoBatches` if the store is empty, or the store or
/// renderer error otherwise.
pub async fn printable_report(
    store: &dyn BatchStore,
    ctx: &ReportContext,
) -> Result<ReportFile, ReportError> {
    let batches = store.list().await?;
    if batches.is_empty() {
        return Err(ReportError::NoBatches);
    }

    let rows = grouped_rows(&batches);
    let bytes = pdf::render(&rows, ctx)?;
    tracing::info!(batches = batches.len(), size = bytes.len(), "PDF report rendered");

    Ok(ReportFile {
        bytes,
        content_type: PDF_CONTENT_TYPE,
        filename: ctx.filename("pdf"),
    })
}

/// Render the spreadsheet report from the current store contents.
///
/// Both sheets come from one read of the store, so the summary always
/// agrees with the detail rows. An empty store yields sheets with headers
/// only.
///
/// # Errors
///
/// Returns the store or renderer error.
pub async fn spreadsheet_report(
    store: &dyn BatchStore,
    ctx: &ReportContext,
) -> Result<ReportFile, ReportError> {
    let batches = store.list().await?;
    let summary = CodeSummary::from_batches(&batches);

    let rows = grouped_rows(&batches);
    let bytes = xlsx::render(&summary, &rows)?;
    tracing::info!(
        batches = batches.len(),
        codes = summary.len(),
        size = bytes.len(),
        "Spreadsheet report rendered"
    );

    Ok(ReportFile {
        bytes,
        content_type: XLSX_CONTENT_TYPE,
        filename: ctx.filename("xlsx"),
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%d/%m/%Y %H:%M").to_string()
}
