//! Topic producer.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use candela_sink::Publisher;
use candela_types::{Record, Result};
use chrono::Utc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::{TopicEntry, TopicError};

/// Appends keyed records to a topic file.
///
/// Every entry is written with a single append of one complete line, so
/// consumers never observe a partial entry as complete.
#[derive(Debug)]
pub struct TopicProducer {
    topic: String,
    path: PathBuf,
    file: File,
    sent: u64,
}

impl TopicProducer {
    pub(crate) async fn open(topic: &str, path: PathBuf) -> std::result::Result<Self, TopicError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| TopicError::WriteFile {
                path: path.clone(),
                source: e,
            })?;
        info!(topic, path = %path.display(), "producer opened");
        Ok(Self {
            topic: topic.to_string(),
            path,
            file,
            sent: 0,
        })
    }

    /// Returns the topic name.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the topic file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of entries sent by this producer.
    #[must_use]
    pub const fn sent(&self) -> u64 {
        self.sent
    }

    /// Appends one record under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be serialized or written.
    pub async fn send(&mut self, key: &str, record: &Record) -> std::result::Result<(), TopicError> {
        let entry = TopicEntry {
            key: key.to_string(),
            value: record.clone(),
            timestamp_ms: Utc::now().timestamp_millis(),
        };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        self.file
            .write_all(&line)
            .await
            .map_err(|e| self.write_error(e))?;
        // tokio completes file writes in the background until flushed
        self.file.flush().await.map_err(|e| self.write_error(e))?;
        self.sent += 1;
        debug!(topic = %self.topic, key, "entry appended");
        Ok(())
    }

    /// Syncs the topic file to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be flushed.
    pub async fn sync(&mut self) -> std::result::Result<(), TopicError> {
        self.file.sync_data().await.map_err(|e| self.write_error(e))
    }

    fn write_error(&self, source: std::io::Error) -> TopicError {
        TopicError::WriteFile {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl Publisher for TopicProducer {
    async fn publish(&mut self, key: &str, record: &Record) -> Result<()> {
        Ok(self.send(key, record).await?)
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(self.sync().await?)
    }
}
