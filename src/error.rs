//! Error types for Seqflow.
//!
//! All errors in Seqflow are represented by the `SeqflowError` enum,
//! which provides specific variants for different error categories.
//! Retriability is a property of the variant: configuration, cycle,
//! template and conversion errors are final, transport and storage
//! errors may succeed on a later attempt.

use std::{io::ErrorKind, string::FromUtf8Error};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Seqflow operations.
///
/// Each variant represents a specific category of error that can occur
/// during workflow definition, execution, or storage operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum SeqflowError {
    /// Engine-level errors (startup, shutdown, triggering).
    #[error("{0}")]
    Engine(String),

    /// Configuration errors: missing trigger ids, unregistered node
    /// types, missing or invalid node config values, missing
    /// credentials. Never retried.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON shape, type coercion).
    #[error("{0}")]
    Convert(String),

    /// The workflow graph contains a cycle and cannot be ordered.
    #[error("{0}")]
    CyclicGraph(String),

    /// Template resolution errors (unresolvable path, bad syntax).
    #[error("{0}")]
    Template(String),

    /// Transient transport or provider errors. Candidates for a
    /// whole-run retry.
    #[error("{0}")]
    Transient(String),

    /// Runtime execution errors.
    #[error("{0}")]
    Runtime(String),

    /// Storage operation errors.
    #[error("{0}")]
    Store(String),

    /// Workflow definition errors.
    #[error("{0}")]
    Workflow(String),

    /// Node definition or execution errors.
    #[error("{0}")]
    Node(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),

    /// Message queue errors.
    #[error("{0}")]
    Queue(String),
}

impl SeqflowError {
    /// Whether a whole-run retry can reasonably be expected to succeed.
    ///
    /// Only failures caused by the outside world qualify; everything
    /// that is wrong with the workflow itself fails the run at once.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            SeqflowError::Transient(_) | SeqflowError::Store(_) | SeqflowError::IoError(_)
        )
    }
}

impl From<SeqflowError> for String {
    fn from(val: SeqflowError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for SeqflowError {
    fn from(error: std::io::Error) -> Self {
        SeqflowError::IoError(error.to_string())
    }
}

impl From<SeqflowError> for std::io::Error {
    fn from(val: SeqflowError) -> Self {
        #[allow(clippy::io_other_error)]
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<FromUtf8Error> for SeqflowError {
    fn from(_: FromUtf8Error) -> Self {
        SeqflowError::Runtime("Error with utf-8 string convert".to_string())
    }
}

impl From<serde_json::Error> for SeqflowError {
    fn from(error: serde_json::Error) -> Self {
        SeqflowError::Convert(error.to_string())
    }
}

impl From<jsonschema::ValidationError<'_>> for SeqflowError {
    fn from(error: jsonschema::ValidationError<'_>) -> Self {
        SeqflowError::Config(error.to_string())
    }
}

impl From<reqwest::Error> for SeqflowError {
    fn from(error: reqwest::Error) -> Self {
        SeqflowError::Transient(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        assert!(SeqflowError::Transient("connection reset".to_string()).is_retriable());
        assert!(SeqflowError::Store("pool timeout".to_string()).is_retriable());
        assert!(!SeqflowError::Config("endpoint is required".to_string()).is_retriable());
        assert!(!SeqflowError::CyclicGraph("Workflow contains a cycle".to_string()).is_retriable());
        assert!(!SeqflowError::Template("unresolved path: a.b".to_string()).is_retriable());
        assert!(!SeqflowError::Convert("invalid type".to_string()).is_retriable());
    }
}
