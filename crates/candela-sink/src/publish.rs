//! Keyed record egress.

use async_trait::async_trait;
use candela_types::{Record, Result};

/// Hands records to a message transport, keyed for partitioning.
#[async_trait]
pub trait Publisher: Send {
    /// Publishes one record under `key` (typically the instrument id).
    async fn publish(&mut self, key: &str, record: &Record) -> Result<()>;

    /// Makes everything published so far durable.
    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<T: Publisher + ?Sized> Publisher for Box<T> {
    async fn publish(&mut self, key: &str, record: &Record) -> Result<()> {
        (**self).publish(key, record).await
    }

    async fn flush(&mut self) -> Result<()> {
        (**self).flush().await
    }
}
