//! Downstream delivery shared by the pipelines.

use std::sync::Arc;

use candela_sink::{BatchSink, FeatureStore, Publisher};
use candela_types::{Record, RetryPolicy};
use tracing::{error, warn};

use crate::{PipelineError, RunSummary};

/// Batch sink and publisher a pipeline delivers into.
pub(crate) struct Output {
    sink: Option<BatchSink<Arc<dyn FeatureStore>>>,
    publisher: Option<Box<dyn Publisher>>,
    flush_retry: RetryPolicy,
}

impl Output {
    pub(crate) const fn new(flush_retry: RetryPolicy) -> Self {
        Self {
            sink: None,
            publisher: None,
            flush_retry,
        }
    }

    pub(crate) fn set_sink(&mut self, sink: BatchSink<Arc<dyn FeatureStore>>) {
        self.sink = Some(sink);
    }

    pub(crate) fn set_publisher(&mut self, publisher: Box<dyn Publisher>) {
        self.publisher = Some(publisher);
    }

    pub(crate) const fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub(crate) const fn has_publisher(&self) -> bool {
        self.publisher.is_some()
    }

    pub(crate) fn buffered(&self) -> usize {
        self.sink.as_ref().map_or(0, BatchSink::len)
    }

    /// True when nothing handed over is still waiting for a flush.
    pub(crate) fn is_drained(&self) -> bool {
        self.buffered() == 0
    }

    /// Publishes `record` under `key` and buffers it, flushing a full batch.
    pub(crate) async fn deliver(
        &mut self,
        key: &str,
        record: Record,
        summary: &mut RunSummary,
    ) -> Result<(), PipelineError> {
        if let Some(publisher) = self.publisher.as_mut() {
            publisher
                .publish(key, &record)
                .await
                .map_err(PipelineError::Publish)?;
            summary.records_published += 1;
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.add(record);
            if sink.should_flush() {
                self.flush(summary).await?;
            }
        }
        Ok(())
    }

    /// Flushes the buffer, retrying with backoff.
    ///
    /// The buffer is kept intact between attempts.
    pub(crate) async fn flush(&mut self, summary: &mut RunSummary) -> Result<(), PipelineError> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        let mut attempt = 0;
        loop {
            match sink.flush().await {
                Ok(0) => return Ok(()),
                Ok(records) => {
                    summary.records_flushed += records as u64;
                    summary.flush_count += 1;
                    return Ok(());
                }
                Err(e) if self.flush_retry.allows_retry(attempt) => {
                    let delay = self.flush_retry.backoff_delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.flush_retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying flush"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(records = e.records, error = %e, "flush retries exhausted");
                    return Err(PipelineError::FlushExhausted {
                        attempts: attempt + 1,
                        source: e,
                    });
                }
            }
        }
    }

    /// Final flush at end of stream; also flushes the publisher.
    pub(crate) async fn close(&mut self, summary: &mut RunSummary) -> Result<(), PipelineError> {
        self.flush(summary).await?;
        if let Some(publisher) = self.publisher.as_mut() {
            publisher.flush().await.map_err(PipelineError::Publish)?;
        }
        Ok(())
    }

    /// Best-effort flush on shutdown.
    ///
    /// A batch that cannot be delivered is dropped and counted in
    /// `records_discarded` instead of failing the run. Returns `true` if
    /// everything buffered was delivered.
    pub(crate) async fn shutdown(&mut self, summary: &mut RunSummary) -> bool {
        let delivered = match self.flush(summary).await {
            Ok(()) => true,
            Err(e) => {
                let dropped = self.sink.as_mut().map_or(0, |sink| sink.discard().len());
                summary.records_discarded += dropped as u64;
                error!(records = dropped, error = %e, "discarding buffered records on shutdown");
                false
            }
        };
        if let Some(publisher) = self.publisher.as_mut() {
            if let Err(e) = publisher.flush().await {
                warn!(error = %e, "publisher flush failed on shutdown");
            }
        }
        delivered
    }
}
