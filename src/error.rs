//! Error kinds surfaced by the document, embedding, and chat stages.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn the source document into text. Always fatal at startup.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be opened or read.
    #[error("failed to read document {path:?}: {source}")]
    Io {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a readable zip container.
    #[error("document is not a valid .docx archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    /// The archive has no main document part.
    #[error("document archive is missing part {0}")]
    MissingPart(&'static str),
    /// The main document part is not well-formed XML.
    #[error("malformed document XML at byte {position}: {message}")]
    Xml {
        /// Reader offset where parsing stopped.
        position: u64,
        /// Parser message.
        message: String,
    },
}

/// Embedding call that failed on every attempt allowed by the retry policy.
#[derive(Debug, Error)]
#[error("embedding failed after {attempts} attempt(s): {source:#}")]
pub struct EmbeddingError {
    /// Number of attempts made before giving up.
    pub attempts: usize,
    /// Error returned by the final attempt.
    #[source]
    pub source: anyhow::Error,
}

/// Chat completion call failure. Not retried.
#[derive(Debug, Error)]
#[error("chat completion failed: {source:#}")]
pub struct ChatError {
    /// Error returned by the chat backend.
    #[source]
    pub source: anyhow::Error,
}

impl From<anyhow::Error> for ChatError {
    fn from(source: anyhow::Error) -> Self {
        Self { source }
    }
}
