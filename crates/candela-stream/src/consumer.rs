//! Topic consumer with committed offsets.

use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use candela_source::RecordSource;
use candela_types::{Record, Result};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info, warn};

use crate::{TopicEntry, TopicError};

/// Reads a topic from a consumer group's committed byte offset.
///
/// Only complete lines are consumed. [`commit`](Self::commit) persists the
/// read position; a restarted consumer resumes from the last commit, so
/// entries read but not committed are delivered again.
#[derive(Debug)]
pub struct TopicConsumer {
    topic: String,
    group: String,
    path: PathBuf,
    offset_path: PathBuf,
    position: u64,
    committed: u64,
    poll_interval: Duration,
    max_batch: usize,
    stop_when_idle: bool,
    idle: bool,
    skipped: u64,
}

impl TopicConsumer {
    pub(crate) async fn open(
        topic: &str,
        group: &str,
        path: PathBuf,
        offset_path: PathBuf,
    ) -> std::result::Result<Self, TopicError> {
        let committed = read_offset(&offset_path).await?;
        info!(topic, group, offset = committed, "consumer opened");
        Ok(Self {
            topic: topic.to_string(),
            group: group.to_string(),
            path,
            offset_path,
            position: committed,
            committed,
            poll_interval: Duration::from_millis(500),
            max_batch: 1000,
            stop_when_idle: false,
            idle: false,
            skipped: 0,
        })
    }

    /// Sets how long a poll waits when no new entries are available.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the maximum number of entries returned per poll.
    #[must_use]
    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch.max(1);
        self
    }

    /// Makes the consumer report completion once it has caught up.
    ///
    /// By default a consumer follows the topic forever.
    #[must_use]
    pub const fn with_stop_when_idle(mut self, stop_when_idle: bool) -> Self {
        self.stop_when_idle = stop_when_idle;
        self
    }

    /// Returns the topic name.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the consumer group.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Returns the byte offset of the next unread entry.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }

    /// Returns the last committed byte offset.
    #[must_use]
    pub const fn committed(&self) -> u64 {
        self.committed
    }

    /// Returns the number of unreadable lines skipped so far.
    #[must_use]
    pub const fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Reads the next complete entries after the current position.
    ///
    /// Waits up to the poll interval when nothing new is available and then
    /// returns an empty batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic file cannot be read.
    pub async fn poll(&mut self) -> std::result::Result<Vec<TopicEntry>, TopicError> {
        let entries = self.poll_with_offsets().await?;
        Ok(entries.into_iter().map(|(_, entry)| entry).collect())
    }

    /// Like [`poll`](Self::poll), but pairs every entry with the byte offset
    /// its line starts at.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic file cannot be read.
    pub async fn poll_with_offsets(
        &mut self,
    ) -> std::result::Result<Vec<(u64, TopicEntry)>, TopicError> {
        let entries = self.read_available().await?;
        if !entries.is_empty() {
            self.idle = false;
            return Ok(entries);
        }

        tokio::time::sleep(self.poll_interval).await;
        let entries = self.read_available().await?;
        self.idle = entries.is_empty();
        Ok(entries)
    }

    /// Persists the current position as the group's committed offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset file cannot be written.
    pub async fn commit(&mut self) -> std::result::Result<(), TopicError> {
        self.commit_to(self.position).await
    }

    /// Persists `offset` as the group's committed offset.
    ///
    /// Entries from `offset` on are delivered again to a restarted consumer.
    /// The offset is clamped to the read position and never moves the
    /// committed offset backwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset file cannot be written.
    pub async fn commit_to(&mut self, offset: u64) -> std::result::Result<(), TopicError> {
        let offset = offset.min(self.position);
        if offset <= self.committed {
            return Ok(());
        }
        let tmp = self.offset_path.with_extension("offset.tmp");
        let write_error = |source| TopicError::WriteFile {
            path: self.offset_path.clone(),
            source,
        };
        tokio::fs::write(&tmp, offset.to_string())
            .await
            .map_err(write_error)?;
        tokio::fs::rename(&tmp, &self.offset_path)
            .await
            .map_err(write_error)?;
        debug!(topic = %self.topic, group = %self.group, offset, "offset committed");
        self.committed = offset;
        Ok(())
    }

    async fn read_available(
        &mut self,
    ) -> std::result::Result<Vec<(u64, TopicEntry)>, TopicError> {
        let read_error = |source| TopicError::ReadFile {
            path: self.path.clone(),
            source,
        };
        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(read_error(e)),
        };
        file.seek(SeekFrom::Start(self.position))
            .await
            .map_err(read_error)?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await.map_err(read_error)?;

        let mut entries = Vec::new();
        let mut consumed = 0usize;
        for line in buf.split_inclusive(|&b| b == b'\n') {
            if entries.len() >= self.max_batch || !line.ends_with(b"\n") {
                break;
            }
            let start = self.position + consumed as u64;
            consumed += line.len();
            let line = line.trim_ascii();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_slice::<TopicEntry>(line) {
                Ok(entry) => entries.push((start, entry)),
                Err(e) => {
                    self.skipped += 1;
                    warn!(topic = %self.topic, error = %e, "skipping unreadable entry");
                }
            }
        }
        self.position += consumed as u64;
        Ok(entries)
    }
}

#[async_trait]
impl RecordSource for TopicConsumer {
    async fn next_batch(&mut self) -> Result<Vec<Record>> {
        let entries = self.poll().await?;
        Ok(entries.into_iter().map(|entry| entry.value).collect())
    }

    fn is_done(&self) -> bool {
        self.stop_when_idle && self.idle
    }

    async fn commit(&mut self) -> Result<()> {
        Ok(Self::commit(self).await?)
    }
}

async fn read_offset(path: &Path) -> std::result::Result<u64, TopicError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => content
            .trim()
            .parse()
            .map_err(|_| TopicError::CorruptOffset {
                path: path.to_path_buf(),
                content,
            }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(TopicError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
