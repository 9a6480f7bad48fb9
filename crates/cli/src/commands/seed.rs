//! Seed the database with batches from a YAML file.
//!
//! ```yaml
//! batches:
//!   - code: A1
//!     name: Vitamin C 500mg
//!     lot: L2026-01
//!     expiry: 2027-01-15
//!     quantity: 120
//! ```
//!
//! Every entry goes through the same validation and upsert as
//! `POST /batches`, so seeding a file twice doubles the quantities.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use lotkeeper_server::db::BatchStore;
use lotkeeper_server::models::{BatchRequest, NewBatch};

use super::connect;

/// Top-level layout of a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub batches: Vec<BatchRequest>,
}

/// Validate every entry, collecting errors as `"entry N: reason"`.
fn validate(file: &SeedFile) -> Result<Vec<NewBatch>, Vec<String>> {
    let mut valid = Vec::with_capacity(file.batches.len());
    let mut errors = Vec::new();

    for (index, request) in file.batches.iter().enumerate() {
        match request.validate() {
            Ok(batch) => valid.push(batch),
            Err(e) => errors.push(format!("entry {}: {e}", index + 1)),
        }
    }

    if errors.is_empty() { Ok(valid) } else { Err(errors) }
}

/// Upsert every batch listed in `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry is
/// invalid, or a database operation fails.
pub async fn batches(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("File not found: {}", path.display()).into());
    }

    info!(path = %path.display(), "Loading batches from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let file: SeedFile = serde_yaml::from_str(&content)?;
    let inputs = match validate(&file) {
        Ok(inputs) => inputs,
        Err(errors) => {
            error!("Seed file validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };

    info!(batches = inputs.len(), "Seed file validated");

    let store = connect().await?;

    let mut created = 0_usize;
    let mut merged = 0_usize;
    for input in &inputs {
        let upserted = store.upsert(input).await?;
        info!(
            code = %upserted.batch.code,
            lot = %upserted.batch.lot,
            quantity = upserted.batch.quantity,
            outcome = %upserted.outcome,
            "Seeded batch"
        );
        if upserted.outcome.is_created() {
            created += 1;
        } else {
            merged += 1;
        }
    }

    info!("Seeding complete!");
    info!("  Batches created: {created}");
    info!("  Batches merged: {merged}");

    Ok(())
}
