//! Remove every batch.

use lotkeeper_server::db::BatchStore;

use super::connect;

/// Delete all batches, but only when `confirmed`.
///
/// # Errors
///
/// Returns an error if not confirmed or the delete fails.
pub async fn run(confirmed: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !confirmed {
        return Err("refusing to remove every batch without --yes".into());
    }

    let store = connect().await?;
    let removed = store.clear_all().await?;
    tracing::info!(removed, "All batches cleared");

    Ok(())
}
