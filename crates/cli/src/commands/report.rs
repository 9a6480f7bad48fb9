//! Write reports to disk.

use std::path::{Path, PathBuf};

use lotkeeper_server::report::{self, ReportContext, ReportFile};

use super::connect;

async fn save(file: &ReportFile, out_dir: &Path) -> Result<PathBuf, std::io::Error> {
    tokio::fs::create_dir_all(out_dir).await?;
    let path = out_dir.join(&file.filename);
    tokio::fs::write(&path, &file.bytes).await?;
    Ok(path)
}

/// Render the printable report into `out_dir`.
///
/// # Errors
///
/// Returns an error if the store is empty, rendering fails or the file
/// cannot be written.
pub async fn pdf(out_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = connect().await?;
    let file = report::printable_report(&store, &ReportContext::now()).await?;
    let path = save(&file, out_dir).await?;
    tracing::info!(path = %path.display(), size = file.bytes.len(), "PDF report written");
    Ok(())
}

/// Render the spreadsheet report into `out_dir`.
///
/// # Errors
///
/// Returns an error if rendering fails or the file cannot be written.
pub async fn xlsx(out_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let store = connect().await?;
    let file = report::spreadsheet_report(&store, &ReportContext::now()).await?;
    let path = save(&file, out_dir).await?;
    tracing::info!(path = %path.display(), size = file.bytes.len(), "Spreadsheet report written");
    Ok(())
}
