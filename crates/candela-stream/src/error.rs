//! Topic log errors.

use std::path::PathBuf;

use candela_types::CandelaError;
use thiserror::Error;

/// Errors that can occur while reading or writing topics.
#[derive(Error, Debug)]
pub enum TopicError {
    /// Topic and group names must be non-empty and path-safe.
    #[error("Invalid name '{0}': use letters, digits, '-' and '_'")]
    InvalidName(String),

    /// Failed to create the broker directory.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        /// The path that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to read a topic or offset file.
    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write a topic or offset file.
    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The offset file does not hold a byte offset.
    #[error("Corrupt offset file '{path}': {content}")]
    CorruptOffset {
        /// The offset file.
        path: PathBuf,
        /// What was found instead.
        content: String,
    },

    /// Failed to serialize an entry.
    #[error("Failed to serialize entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<TopicError> for CandelaError {
    fn from(err: TopicError) -> Self {
        Self::Topic(err.to_string())
    }
}
