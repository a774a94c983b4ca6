//! Transport Layer Abstraction
//!
//! The connection collaborator that performs one wire round trip per batch.
//! Retry policy, if any, lives behind this trait and is invisible to the
//! controller.

use crate::constants::error_codes;
use crate::operation::WriteKind;
use crate::outcome::{BatchOutcome, WriteError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

/// Acknowledgment level requested from the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteConcern {
    /// Number of acknowledging members, or a tag such as "majority"
    pub w: Option<String>,
    pub journal: Option<bool>,
    pub wtimeout_ms: Option<u64>,
}

impl Default for WriteConcern {
    fn default() -> Self {
        Self {
            w: Some("1".to_string()),
            journal: None,
            wtimeout_ms: None,
        }
    }
}

impl WriteConcern {
    pub fn majority() -> Self {
        Self {
            w: Some("majority".to_string()),
            ..Default::default()
        }
    }
}

/// One encoded operation together with its global index
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedOperation {
    pub global_index: usize,
    pub kind: WriteKind,
    pub bytes: Vec<u8>,
}

/// Everything the transport needs for one round trip
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// `None` when the batch mixes kinds
    pub kind: Option<WriteKind>,
    pub operations: Vec<EncodedOperation>,
    pub write_concern: WriteConcern,
    /// Whether the server should stop at the first failing operation
    pub ordered: bool,
    pub bypass_document_validation: bool,
}

impl BatchRequest {
    pub fn first_index(&self) -> usize {
        self.operations
            .first()
            .map(|op| op.global_index)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// A round trip that failed outright
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Batch timed out after {0:?}")]
    Timeout(Duration),
    #[error("Batch cancelled")]
    Cancelled,
    /// The transport knows which operations failed; indices are batch-local
    #[error("Batch failed with {} operation errors", .0.len())]
    OperationFailures(Vec<WriteError>),
}

impl TransportError {
    pub fn code(&self) -> i32 {
        match self {
            TransportError::Network(_) => error_codes::NETWORK_ERROR,
            TransportError::Timeout(_) => error_codes::NETWORK_TIMEOUT,
            TransportError::Cancelled => error_codes::INTERRUPTED,
            TransportError::OperationFailures(errors) => errors
                .first()
                .map(|e| e.code)
                .unwrap_or(error_codes::NETWORK_ERROR),
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, TransportError::Cancelled)
    }

    /// Batch-local outcome describing this failure: the per-operation errors
    /// when known, else one synthetic error at the batch's first operation
    pub fn into_outcome(self) -> BatchOutcome {
        match self {
            TransportError::OperationFailures(errors) if !errors.is_empty() => BatchOutcome {
                write_errors: errors,
                ..Default::default()
            },
            other => BatchOutcome::from_error(WriteError::new(0, other.code(), other.to_string())),
        }
    }
}

#[async_trait]
pub trait BatchTransport: Send + Sync + Debug {
    /// Perform one round trip. Indices in the returned outcome are batch-local.
    async fn send_batch(&self, request: BatchRequest) -> Result<BatchOutcome, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_outcome_for_network_failure() {
        let outcome = TransportError::Network("connection reset".to_string()).into_outcome();
        assert_eq!(outcome.write_errors.len(), 1);
        assert_eq!(outcome.write_errors[0].index, 0);
        assert_eq!(outcome.write_errors[0].code, error_codes::NETWORK_ERROR);
        assert!(outcome.write_errors[0].errmsg.contains("connection reset"));
    }

    #[test]
    fn test_operation_failures_preserved() {
        let outcome = TransportError::OperationFailures(vec![
            WriteError::new(2, 50, "a"),
            WriteError::new(4, 50, "b"),
        ])
        .into_outcome();
        assert_eq!(
            outcome
                .write_errors
                .iter()
                .map(|e| e.index)
                .collect::<Vec<_>>(),
            vec![2, 4]
        );
    }

    #[test]
    fn test_codes() {
        assert_eq!(
            TransportError::Timeout(Duration::from_millis(5)).code(),
            error_codes::NETWORK_TIMEOUT
        );
        assert_eq!(TransportError::Cancelled.code(), error_codes::INTERRUPTED);
        assert!(TransportError::Cancelled.is_cancellation());
    }

    #[test]
    fn test_write_concern_levels() {
        assert_eq!(WriteConcern::default().w.as_deref(), Some("1"));
        let majority = WriteConcern::majority();
        assert_eq!(majority.w.as_deref(), Some("majority"));
        assert_eq!(majority.journal, None);
    }
}
