//! Error types for the bulk write core.

use crate::aggregator::BulkWriteFailure;
use crate::state_machine::StateMachineError;
use thiserror::Error;

/// Top-level error returned by the bulk write facade.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BulkWriteError {
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Planning error: {0}")]
    Planning(#[from] PlanningError),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Limits error: {0}")]
    Limits(String),
    #[error("State machine error: {0}")]
    StateMachine(#[from] StateMachineError),
    #[error(transparent)]
    Failure(Box<BulkWriteFailure>),
}

impl BulkWriteError {
    /// The partial result attached to a bulk failure, if this is one
    pub fn failure(&self) -> Option<&BulkWriteFailure> {
        match self {
            BulkWriteError::Failure(failure) => Some(failure.as_ref()),
            _ => None,
        }
    }
}

impl From<BulkWriteFailure> for BulkWriteError {
    fn from(failure: BulkWriteFailure) -> Self {
        BulkWriteError::Failure(Box::new(failure))
    }
}

impl From<config::ConfigError> for BulkWriteError {
    fn from(error: config::ConfigError) -> Self {
        BulkWriteError::Configuration(error.to_string())
    }
}

/// Raised before any batch is sent; a bulk write that fails planning is never
/// partially executed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanningError {
    #[error("Unknown write operation '{name}'")]
    UnknownOperation { name: String },
    #[error("Malformed write request: {0}")]
    MalformedRequest(String),
    #[error("Invalid document for operation {index}: {reason}")]
    InvalidDocument { index: usize, reason: String },
    #[error("Failed to encode operation {index}: {reason}")]
    Encoding { index: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, BulkWriteError>;
pub type PlanningResult<T> = std::result::Result<T, PlanningError>;
