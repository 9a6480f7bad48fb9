//! In-memory batch store.
//!
//! Rows live in a `BTreeMap` behind one `RwLock`. Every mutation holds the
//! write lock for its whole read-modify-write, which is what keeps
//! `(code, lot)` unique. Suitable for development (`LOTKEEPER_STORAGE=memory`)
//! and tests; contents are lost on restart.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use lotkeeper_core::{BatchId, UpsertOutcome};

use super::{BatchStore, RepositoryError};
use crate::models::{Batch, BatchPatch, CodeSummary, NewBatch, Upserted};

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i32,
    rows: BTreeMap<BatchId, Batch>,
}

impl MemoryState {
    fn find_key(&self, code: &str, lot: &str) -> Option<BatchId> {
        self.rows
            .values()
            .find(|b| b.code == code && b.lot == lot)
            .map(|b| b.id)
    }
}

/// Batch store kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryBatchStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryBatchStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .read()
            .map_err(|_| RepositoryError::DataCorruption("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .write()
            .map_err(|_| RepositoryError::DataCorruption("store lock poisoned".to_string()))
    }
}

#[async_trait]
impl BatchStore for MemoryBatchStore {
    async fn list(&self) -> Result<Vec<Batch>, RepositoryError> {
        let state = self.read()?;
        let mut batches: Vec<Batch> = state.rows.values().cloned().collect();
        // Ids are already ascending, so a stable sort leaves ties in id order.
        batches.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(batches)
    }

    async fn get(&self, id: BatchId) -> Result<Batch, RepositoryError> {
        self.read()?
            .rows
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn upsert(&self, input: &NewBatch) -> Result<Upserted, RepositoryError> {
        let mut state = self.write()?;

        if let Some(id) = state.find_key(&input.code, &input.lot) {
            let batch = state
                .rows
                .get_mut(&id)
                .ok_or_else(|| RepositoryError::DataCorruption(format!("index lost batch {id}")))?;
            batch.quantity = batch
                .quantity
                .checked_add(input.quantity.get())
                .ok_or_else(|| {
                    RepositoryError::OutOfRange(
                        "quantity exceeds the storable maximum".to_string(),
                    )
                })?;
            batch.registered_at = Utc::now();
            return Ok(Upserted {
                batch: batch.clone(),
                outcome: UpsertOutcome::Merged,
            });
        }

        state.next_id += 1;
        let batch = Batch {
            id: BatchId::new(state.next_id),
            code: input.code.clone(),
            name: input.name.clone(),
            lot: input.lot.clone(),
            expiry: input.expiry,
            quantity: input.quantity.get(),
            registered_at: Utc::now(),
        };
        state.rows.insert(batch.id, batch.clone());

        Ok(Upserted {
            batch,
            outcome: UpsertOutcome::Created,
        })
    }

    async fn update(&self, id: BatchId, patch: &BatchPatch) -> Result<Batch, RepositoryError> {
        let mut state = self.write()?;

        let mut updated = state.rows.get(&id).cloned().ok_or(RepositoryError::NotFound)?;
        patch.apply_to(&mut updated);

        if state
            .find_key(&updated.code, &updated.lot)
            .is_some_and(|other| other != id)
        {
            return Err(RepositoryError::Conflict(
                "a batch with this code and lot already exists".to_string(),
            ));
        }

        state.rows.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, id: BatchId) -> Result<Batch, RepositoryError> {
        self.write()?
            .rows
            .remove(&id)
            .ok_or(RepositoryError::NotFound)
    }

    async fn clear_all(&self) -> Result<u64, RepositoryError> {
        let mut state = self.write()?;
        let removed = state.rows.len() as u64;
        state.rows.clear();
        Ok(removed)
    }

    async fn list_by_code(&self, code: &str) -> Result<Vec<Batch>, RepositoryError> {
        let state = self.read()?;
        let mut batches: Vec<Batch> = state
            .rows
            .values()
            .filter(|b| b.code == code)
            .cloned()
            .collect();
        batches.sort_by_key(|b| b.expiry);
        Ok(batches)
    }

    async fn summary_by_code(&self) -> Result<Vec<CodeSummary>, RepositoryError> {
        let state = self.read()?;
        Ok(CodeSummary::from_batches(state.rows.values()))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use lotkeeper_core::Quantity;

    use super::*;

    fn new_batch(code: &str, lot: &str, quantity: i64) -> NewBatch {
        NewBatch {
            code: code.to_string(),
            name: format!("Product {code}"),
            lot: lot.to_string(),
            expiry: NaiveDate::from_ymd_opt(2027, 6, 30).unwrap(),
            quantity: Quantity::new(quantity).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_merges() {
        let store = MemoryBatchStore::new();

        let first = store.upsert(&new_batch("A1", "L1", 10)).await.unwrap();
        assert_eq!(first.outcome, UpsertOutcome::Created);
        assert_eq!(first.batch.quantity, 10);

        let second = store.upsert(&new_batch("A1", "L1", 5)).await.unwrap();
        assert_eq!(second.outcome, UpsertOutcome::Merged);
        assert_eq!(second.batch.id, first.batch.id);
        assert_eq!(second.batch.quantity, 15);
        assert!(second.batch.registered_at >= first.batch.registered_at);

        let third = store.upsert(&new_batch("A1", "L2", 3)).await.unwrap();
        assert_eq!(third.outcome, UpsertOutcome::Created);
        assert_ne!(third.batch.id, first.batch.id);

        let summary = store.summary_by_code().await.unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].total_quantity, 18);
        assert_eq!(summary[0].batch_count, 2);
    }

    #[tokio::test]
    async fn test_merge_keeps_original_name_and_expiry() {
        let store = MemoryBatchStore::new();
        store.upsert(&new_batch("A1", "L1", 1)).await.unwrap();

        let mut again = new_batch("A1", "L1", 1);
        again.name = "Renamed".to_string();
        again.expiry = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        let merged = store.upsert(&again).await.unwrap();

        assert_eq!(merged.batch.name, "Product A1");
        assert_eq!(
            merged.batch.expiry,
            NaiveDate::from_ymd_opt(2027, 6, 30).unwrap()
        );
    }

    #[tokio::test]
    async fn test_merge_overflow_is_out_of_range() {
        let store = MemoryBatchStore::new();
        store
            .upsert(&new_batch("A1", "L1", i64::from(i32::MAX)))
            .await
            .unwrap();

        let err = store.upsert(&new_batch("A1", "L1", 1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::OutOfRange(_)));
        assert_eq!(store.list().await.unwrap()[0].quantity, i32::MAX);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_never_duplicate() {
        let store = MemoryBatchStore::new();

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.upsert(&new_batch("C9", "L1", 2)).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().outcome.is_created() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        let batches = store.list().await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].quantity, 64);
    }

    #[tokio::test]
    async fn test_list_orders_by_code_then_id() {
        let store = MemoryBatchStore::new();
        store.upsert(&new_batch("B2", "L1", 1)).await.unwrap();
        store.upsert(&new_batch("A1", "L9", 1)).await.unwrap();
        store.upsert(&new_batch("B2", "L0", 1)).await.unwrap();
        store.upsert(&new_batch("A1", "L1", 1)).await.unwrap();

        let keys: Vec<(String, String)> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|b| (b.code, b.lot))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("A1".to_string(), "L9".to_string()),
                ("A1".to_string(), "L1".to_string()),
                ("B2".to_string(), "L1".to_string()),
                ("B2".to_string(), "L0".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_by_code_orders_by_expiry() {
        let store = MemoryBatchStore::new();
        for (lot, month) in [("L1", 9), ("L2", 3), ("L3", 6)] {
            let mut input = new_batch("A1", lot, 1);
            input.expiry = NaiveDate::from_ymd_opt(2027, month, 1).unwrap();
            store.upsert(&input).await.unwrap();
        }
        store.upsert(&new_batch("Z9", "L1", 1)).await.unwrap();

        let lots: Vec<String> = store
            .list_by_code("A1")
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.lot)
            .collect();
        assert_eq!(lots, vec!["L2", "L3", "L1"]);
        assert!(store.list_by_code("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_applies_partial_fields() {
        let store = MemoryBatchStore::new();
        let created = store.upsert(&new_batch("A1", "L1", 4)).await.unwrap().batch;

        let patch = BatchPatch {
            quantity: Some(Quantity::new(40).unwrap()),
            ..BatchPatch::default()
        };
        let updated = store.update(created.id, &patch).await.unwrap();

        assert_eq!(updated.quantity, 40);
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.registered_at, created.registered_at);
    }

    #[tokio::test]
    async fn test_update_rejects_duplicate_key() {
        let store = MemoryBatchStore::new();
        store.upsert(&new_batch("A1", "L1", 1)).await.unwrap();
        let other = store.upsert(&new_batch("A1", "L2", 1)).await.unwrap().batch;

        let patch = BatchPatch {
            lot: Some("L1".to_string()),
            ..BatchPatch::default()
        };
        let err = store.update(other.id, &patch).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(store.get(other.id).await.unwrap().lot, "L2");
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryBatchStore::new();
        let err = store
            .update(BatchId::new(99), &BatchPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_delete_missing_leaves_store_unchanged() {
        let store = MemoryBatchStore::new();
        store.upsert(&new_batch("A1", "L1", 1)).await.unwrap();

        let err = store.delete(BatchId::new(404)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_returns_removed_batch() {
        let store = MemoryBatchStore::new();
        let created = store.upsert(&new_batch("A1", "L1", 1)).await.unwrap().batch;

        let removed = store.delete(created.id).await.unwrap();
        assert_eq!(removed, created);
        assert!(matches!(
            store.get(created.id).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_clear_all_reports_count() {
        let store = MemoryBatchStore::new();
        for i in 0..7 {
            store
                .upsert(&new_batch(&format!("C{}", i % 3), &format!("L{i}"), 1))
                .await
                .unwrap();
        }

        assert_eq!(store.clear_all().await.unwrap(), 7);
        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(store.clear_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_summary_matches_rows() {
        let store = MemoryBatchStore::new();
        store.upsert(&new_batch("B2", "L1", 4)).await.unwrap();
        store.upsert(&new_batch("A1", "L1", 10)).await.unwrap();
        store.upsert(&new_batch("B2", "L2", 6)).await.unwrap();
        store.upsert(&new_batch("B2", "L1", 1)).await.unwrap();

        let batches = store.list().await.unwrap();
        let summary = store.summary_by_code().await.unwrap();

        assert_eq!(
            summary.iter().map(|s| s.code.as_str()).collect::<Vec<_>>(),
            vec!["A1", "B2"]
        );
        for group in &summary {
            let rows: Vec<&Batch> = batches.iter().filter(|b| b.code == group.code).collect();
            let total: i64 = rows.iter().map(|b| i64::from(b.quantity)).sum();
            assert_eq!(group.total_quantity, total);
            assert_eq!(group.batch_count, rows.len() as i64);
        }
    }
}
