//! In-memory feature store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use candela_types::Record;

use crate::{FeatureGroup, FeatureStore, StoreError};

#[derive(Debug, Default)]
struct Table {
    rows: Vec<Record>,
    index: HashMap<Vec<String>, usize>,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, Table>,
    upsert_calls: Vec<usize>,
    materializations: usize,
    failures_remaining: u32,
}

/// Feature store kept in memory.
///
/// Failures can be injected with [`fail_next`](Self::fail_next) to exercise
/// retry paths.
#[derive(Debug, Default)]
pub struct MemoryFeatureStore {
    state: Mutex<State>,
}

impl MemoryFeatureStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` upserts fail without writing anything.
    pub fn fail_next(&self, n: u32) {
        self.lock().failures_remaining = n;
    }

    /// Returns the online rows of a group in first-insertion order.
    #[must_use]
    pub fn online(&self, group: &FeatureGroup) -> Vec<Record> {
        self.lock()
            .tables
            .get(&group.to_string())
            .map(|table| table.rows.clone())
            .unwrap_or_default()
    }

    /// Returns the batch sizes of all successful upserts.
    #[must_use]
    pub fn upsert_calls(&self) -> Vec<usize> {
        self.lock().upsert_calls.clone()
    }

    /// Returns how many upserts requested offline materialization.
    #[must_use]
    pub fn materializations(&self) -> usize {
        self.lock().materializations
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl FeatureStore for MemoryFeatureStore {
    async fn upsert(
        &self,
        batch: &[Record],
        group: &FeatureGroup,
        materialize_offline: bool,
    ) -> Result<(), StoreError> {
        let keys = batch
            .iter()
            .map(|record| group.key_of(record))
            .collect::<Result<Vec<_>, _>>()?;

        let mut state = self.lock();
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }

        let table = state.tables.entry(group.to_string()).or_default();
        for (key, record) in keys.into_iter().zip(batch) {
            match table.index.get(&key) {
                Some(&i) => table.rows[i] = record.clone(),
                None => {
                    table.index.insert(key, table.rows.len());
                    table.rows.push(record.clone());
                }
            }
        }
        state.upsert_calls.push(batch.len());
        if materialize_offline {
            state.materializations += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(ts: i64, close: f64) -> Record {
        match json!({"product_id": "BTC/USD", "timestamp_ms": ts, "close": close}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_equal_keys() {
        let store = MemoryFeatureStore::new();
        let group = FeatureGroup::new("ohlcv", 1);

        store.upsert(&[record(1, 1.0), record(2, 2.0)], &group, false).await.unwrap();
        store.upsert(&[record(1, 9.0)], &group, false).await.unwrap();

        let rows = store.online(&group);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["close"], 9.0);
        assert_eq!(store.upsert_calls(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryFeatureStore::new();
        let group = FeatureGroup::new("ohlcv", 1);
        store.fail_next(1);

        assert!(store.upsert(&[record(1, 1.0)], &group, false).await.is_err());
        assert!(store.online(&group).is_empty());
        assert!(store.upsert(&[record(1, 1.0)], &group, false).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_key_rejects_whole_batch() {
        let store = MemoryFeatureStore::new();
        let group = FeatureGroup::new("ohlcv", 1);
        let mut bad = record(2, 1.0);
        bad.remove("product_id");

        let err = store.upsert(&[record(1, 1.0), bad], &group, false).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingField { .. }));
        assert!(store.online(&group).is_empty());
    }
}
