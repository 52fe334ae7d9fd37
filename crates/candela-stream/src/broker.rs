//! Broker directory layout.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::{TopicConsumer, TopicError, TopicProducer};

/// A directory of topic logs.
#[derive(Debug, Clone)]
pub struct Broker {
    root: PathBuf,
}

impl Broker {
    /// Opens the broker at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, TopicError> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root).map_err(|e| TopicError::CreateDir {
                path: root.clone(),
                source: e,
            })?;
        }
        Ok(Self { root })
    }

    /// Returns the default broker directory.
    ///
    /// Uses the platform data directory (e.g. `~/.local/share/candela/broker`
    /// on Linux), falling back to `./.candela/broker`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "candela").map_or_else(
            || PathBuf::from(".candela").join("broker"),
            |dirs| dirs.data_dir().join("broker"),
        )
    }

    /// Returns the broker directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the log file of a topic.
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::InvalidName`] for names that are not path-safe.
    pub fn topic_path(&self, topic: &str) -> Result<PathBuf, TopicError> {
        validate_name(topic)?;
        Ok(self.root.join(format!("{topic}.jsonl")))
    }

    /// Returns the committed-offset file of a consumer group on a topic.
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::InvalidName`] for names that are not path-safe.
    pub fn offset_path(&self, topic: &str, group: &str) -> Result<PathBuf, TopicError> {
        validate_name(topic)?;
        validate_name(group)?;
        Ok(self.root.join(format!("{topic}.{group}.offset")))
    }

    /// Opens a producer appending to `topic`.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic file cannot be opened.
    pub async fn producer(&self, topic: &str) -> Result<TopicProducer, TopicError> {
        TopicProducer::open(topic, self.topic_path(topic)?).await
    }

    /// Opens a consumer of `topic` for the consumer group `group`.
    ///
    /// # Errors
    ///
    /// Returns an error if the committed offset cannot be read.
    pub async fn consumer(&self, topic: &str, group: &str) -> Result<TopicConsumer, TopicError> {
        TopicConsumer::open(
            topic,
            group,
            self.topic_path(topic)?,
            self.offset_path(topic, group)?,
        )
        .await
    }
}

fn validate_name(name: &str) -> Result<(), TopicError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(TopicError::InvalidName(name.to_string()))
    }
}
