//! Record batching in front of a feature store.

use std::num::NonZeroUsize;

use candela_types::Record;
use tracing::{debug, info, warn};

use crate::{FeatureGroup, FeatureStore, FlushError};

/// Buffers records and pushes them to a [`FeatureStore`] in whole batches.
///
/// The buffer is cleared only after the store accepted the entire batch; a
/// failed flush leaves it exactly as it was so the caller can retry.
#[derive(Debug)]
pub struct BatchSink<F> {
    store: F,
    group: FeatureGroup,
    batch_size: NonZeroUsize,
    materialize_offline: bool,
    buffer: Vec<Record>,
    records_flushed: u64,
    flush_count: u64,
}

impl<F: FeatureStore> BatchSink<F> {
    /// Creates a sink writing to `group` in batches of `batch_size`.
    #[must_use]
    pub fn new(store: F, group: FeatureGroup, batch_size: NonZeroUsize) -> Self {
        Self {
            store,
            group,
            batch_size,
            materialize_offline: false,
            buffer: Vec::with_capacity(batch_size.get()),
            records_flushed: 0,
            flush_count: 0,
        }
    }

    /// Sets whether each flush also materializes the offline store.
    #[must_use]
    pub const fn with_materialize_offline(mut self, materialize_offline: bool) -> Self {
        self.materialize_offline = materialize_offline;
        self
    }

    /// Returns the target feature group.
    #[must_use]
    pub const fn group(&self) -> &FeatureGroup {
        &self.group
    }

    /// Returns the flush threshold.
    #[must_use]
    pub const fn batch_size(&self) -> NonZeroUsize {
        self.batch_size
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &F {
        &self.store
    }

    /// Appends one record to the buffer.
    pub fn add(&mut self, record: Record) {
        debug_assert!(
            self.buffer.len() <= self.batch_size.get(),
            "buffer must be flushed once it reaches the batch size"
        );
        self.buffer.push(record);
    }

    /// Returns true once the buffer has reached the batch size.
    #[must_use]
    pub fn should_flush(&self) -> bool {
        self.buffer.len() >= self.batch_size.get()
    }

    /// Returns the number of buffered records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns the buffered records.
    #[must_use]
    pub fn buffered(&self) -> &[Record] {
        &self.buffer
    }

    /// Returns the number of records delivered so far.
    #[must_use]
    pub const fn records_flushed(&self) -> u64 {
        self.records_flushed
    }

    /// Returns the number of successful non-empty flushes.
    #[must_use]
    pub const fn flush_count(&self) -> u64 {
        self.flush_count
    }

    /// Pushes the whole buffer to the store as one unit.
    ///
    /// Returns the number of records delivered. An empty buffer is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a [`FlushError`] if the store rejects the batch. The buffer is
    /// left untouched.
    pub async fn flush(&mut self) -> Result<usize, FlushError> {
        if self.buffer.is_empty() {
            return Ok(0);
        }

        let records = self.buffer.len();
        match self
            .store
            .upsert(&self.buffer, &self.group, self.materialize_offline)
            .await
        {
            Ok(()) => {
                self.buffer.clear();
                self.records_flushed += records as u64;
                self.flush_count += 1;
                info!(group = %self.group, records, "batch flushed");
                Ok(records)
            }
            Err(source) => {
                warn!(group = %self.group, records, error = %source, "batch flush failed");
                Err(FlushError { records, source })
            }
        }
    }

    /// Empties the buffer without delivering it, returning what was dropped.
    ///
    /// Callers must report the returned records as discarded.
    pub fn discard(&mut self) -> Vec<Record> {
        let dropped = std::mem::take(&mut self.buffer);
        if !dropped.is_empty() {
            debug!(group = %self.group, records = dropped.len(), "buffer discarded");
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryFeatureStore;
    use serde_json::json;
    use std::sync::Arc;

    fn record(ts: i64) -> Record {
        match json!({"product_id": "BTC/USD", "timestamp_ms": ts, "close": 1.0}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn sink(store: Arc<MemoryFeatureStore>, size: usize) -> BatchSink<Arc<MemoryFeatureStore>> {
        BatchSink::new(store, FeatureGroup::new("ohlcv", 1), NonZeroUsize::new(size).unwrap())
    }

    #[tokio::test]
    async fn test_should_flush_at_threshold() {
        let store = Arc::new(MemoryFeatureStore::new());
        let mut sink = sink(Arc::clone(&store), 2);

        sink.add(record(1));
        assert!(!sink.should_flush());
        sink.add(record(2));
        assert!(sink.should_flush());

        assert_eq!(sink.flush().await.unwrap(), 2);
        assert!(sink.is_empty());
        assert_eq!(sink.records_flushed(), 2);
        assert_eq!(sink.flush_count(), 1);
        assert_eq!(store.upsert_calls(), vec![2]);
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_buffer() {
        let store = Arc::new(MemoryFeatureStore::new());
        store.fail_next(1);
        let mut sink = sink(Arc::clone(&store), 2);
        sink.add(record(1));
        sink.add(record(2));
        let before = sink.buffered().to_vec();

        let err = sink.flush().await.unwrap_err();
        assert_eq!(err.records, 2);
        assert_eq!(sink.buffered(), before.as_slice());
        assert_eq!(sink.flush_count(), 0);

        assert_eq!(sink.flush().await.unwrap(), 2);
        assert!(sink.is_empty());
        assert_eq!(store.online(&FeatureGroup::new("ohlcv", 1)).len(), 2);
    }

    #[tokio::test]
    async fn test_empty_flush_is_noop() {
        let store = Arc::new(MemoryFeatureStore::new());
        let mut sink = sink(Arc::clone(&store), 4);
        assert_eq!(sink.flush().await.unwrap(), 0);
        assert!(store.upsert_calls().is_empty());
    }

    #[tokio::test]
    async fn test_materialize_flag_passthrough() {
        let store = Arc::new(MemoryFeatureStore::new());
        let mut sink = sink(Arc::clone(&store), 1).with_materialize_offline(true);
        sink.add(record(1));
        sink.flush().await.unwrap();
        assert_eq!(store.materializations(), 1);
    }

    #[test]
    fn test_discard() {
        let mut sink = sink(Arc::new(MemoryFeatureStore::new()), 4);
        sink.add(record(1));
        assert_eq!(sink.discard().len(), 1);
        assert!(sink.is_empty());
    }
}
