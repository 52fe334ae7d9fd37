//! Feature store abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use candela_types::Record;

use crate::{FeatureGroup, StoreError};

/// Upsert interface of a feature store.
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// Writes a batch as one unit into the online table of `group`.
    ///
    /// Rows replace earlier rows with the same primary key. When
    /// `materialize_offline` is set the store also brings its offline copy up
    /// to date.
    async fn upsert(
        &self,
        batch: &[Record],
        group: &FeatureGroup,
        materialize_offline: bool,
    ) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: FeatureStore + ?Sized> FeatureStore for Arc<T> {
    async fn upsert(
        &self,
        batch: &[Record],
        group: &FeatureGroup,
        materialize_offline: bool,
    ) -> Result<(), StoreError> {
        (**self).upsert(batch, group, materialize_offline).await
    }
}

#[async_trait]
impl<T: FeatureStore + ?Sized> FeatureStore for Box<T> {
    async fn upsert(
        &self,
        batch: &[Record],
        group: &FeatureGroup,
        materialize_offline: bool,
    ) -> Result<(), StoreError> {
        (**self).upsert(batch, group, materialize_offline).await
    }
}
