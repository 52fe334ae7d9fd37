//! Raw record driver.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use candela_sink::{BatchSink, FeatureGroup, FeatureStore, Publisher};
use candela_source::RecordSource;
use candela_types::{Record, field_as_key};
use tracing::{debug, info, warn};

use crate::output::Output;
use crate::{PipelineConfig, PipelineError, RunSummary};

/// Drives a [`RecordSource`] straight into a batch sink and/or a publisher,
/// without aggregation.
///
/// The source is committed only when everything it returned has been
/// flushed, so a restart redelivers unflushed records.
pub struct RecordPipeline<S> {
    source: S,
    key_field: String,
    output: Output,
    config: PipelineConfig,
    summary: RunSummary,
}

impl<S: fmt::Debug> fmt::Debug for RecordPipeline<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordPipeline")
            .field("source", &self.source)
            .field("key_field", &self.key_field)
            .field("config", &self.config)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

impl<S: RecordSource> RecordPipeline<S> {
    /// Creates a pipeline over `source`.
    ///
    /// Published records are keyed by their `product_id` field.
    #[must_use]
    pub fn new(source: S, config: PipelineConfig) -> Self {
        Self {
            source,
            key_field: "product_id".to_string(),
            output: Output::new(config.flush_retry),
            config,
            summary: RunSummary::default(),
        }
    }

    /// Sets the field used as the publish key.
    #[must_use]
    pub fn with_key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = field.into();
        self
    }

    /// Buffers records for `store` under `group`.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn FeatureStore>, group: FeatureGroup) -> Self {
        let sink = BatchSink::new(store, group, self.config.batch_size)
            .with_materialize_offline(self.config.materialize_offline);
        self.output.set_sink(sink);
        self
    }

    /// Publishes every record keyed by the key field.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Box<dyn Publisher>) -> Self {
        self.output.set_publisher(publisher);
        self
    }

    /// Returns the source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Returns the number of records waiting for a flush.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.output.buffered()
    }

    /// Returns the counters collected so far.
    #[must_use]
    pub const fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Runs until the source is exhausted or `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails, a flush exhausts its retries,
    /// a record cannot be published, or the source rejects a commit.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<RunSummary, PipelineError>
    where
        F: Future<Output = ()> + Send,
    {
        let mut shutdown = std::pin::pin!(shutdown);
        info!(batch_size = self.config.batch_size.get(), "record pipeline started");

        loop {
            if self.source.is_done() {
                self.output.close(&mut self.summary).await?;
                self.source.commit().await.map_err(PipelineError::Commit)?;
                break;
            }

            let polled = tokio::select! {
                biased;
                () = &mut shutdown => None,
                result = self.source.next_batch() => Some(result),
            };
            let Some(result) = polled else {
                self.stop().await;
                break;
            };

            let records = result.map_err(PipelineError::Source)?;
            self.handle(records).await?;
        }

        info!(summary = %self.summary, "record pipeline finished");
        Ok(self.summary)
    }

    async fn handle(&mut self, records: Vec<Record>) -> Result<(), PipelineError> {
        if !records.is_empty() {
            debug!(records = records.len(), "processing batch");
        }
        for record in records {
            self.summary.records_received += 1;
            let key = field_as_key(&record, &self.key_field).unwrap_or_default();
            self.output.deliver(&key, record, &mut self.summary).await?;
        }
        if self.output.is_drained() {
            self.source.commit().await.map_err(PipelineError::Commit)?;
        }
        Ok(())
    }

    async fn stop(&mut self) {
        info!("shutdown requested");
        self.summary.stopped = true;
        if self.output.shutdown(&mut self.summary).await {
            if let Err(e) = self.source.commit().await {
                warn!(error = %e, "commit failed on shutdown");
            }
        }
    }
}
