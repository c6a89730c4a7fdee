use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to ingest {path}: {reason}")]
    Ingestion { path: PathBuf, reason: String },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector index unavailable: {0}")]
    Retrieval(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn ingestion(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Ingestion { path: path.into(), reason: reason.to_string() }
    }

    pub fn embedding(err: impl ToString) -> Self {
        Self::Embedding(err.to_string())
    }

    pub fn retrieval(err: impl ToString) -> Self {
        Self::Retrieval(err.to_string())
    }
}

/// Failure modes of the text-generation provider.
///
/// These never reach the caller of `answer`; the composer turns them into a
/// degraded response.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("the language model did not respond in time ({0})")]
    Timeout(String),

    #[error("the language model quota or rate limit was exceeded ({0})")]
    Quota(String),

    #[error("the language model could not be reached ({0})")]
    Network(String),

    #[error("the language model returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("the language model returned an unreadable response ({0})")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
