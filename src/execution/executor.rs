//! # Batch Executor
//!
//! Sends one planned batch through the injected transport and returns an
//! outcome whose indices are global. No retries happen here.

use super::cancellation::CancellationSignal;
use super::transport::{BatchRequest, BatchTransport, EncodedOperation, TransportError, WriteConcern};
use crate::codec::OperationEncoder;
use crate::error::PlanningResult;
use crate::outcome::BatchOutcome;
use crate::planner::Batch;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Result of sending one batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// Outcome with global indices
    pub outcome: BatchOutcome,
    /// Set when the round trip failed outright
    pub transport_error: Option<TransportError>,
    /// Operations the server worked through; an ordered batch stops at its
    /// first error, and a batch abandoned before sending attempted none
    pub operations_attempted: usize,
}

impl BatchReport {
    pub fn is_failure(&self) -> bool {
        self.transport_error.is_some() || self.outcome.has_write_errors()
    }

    pub fn was_cancelled(&self) -> bool {
        self.transport_error
            .as_ref()
            .is_some_and(TransportError::is_cancellation)
    }
}

/// Per-execution settings handed to every send
#[derive(Debug, Clone)]
pub struct SendOptions {
    pub ordered: bool,
    pub write_concern: WriteConcern,
    pub bypass_document_validation: bool,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct BatchExecutor {
    transport: Arc<dyn BatchTransport>,
    encoder: Arc<dyn OperationEncoder>,
}

impl BatchExecutor {
    pub fn new(transport: Arc<dyn BatchTransport>, encoder: Arc<dyn OperationEncoder>) -> Self {
        Self { transport, encoder }
    }

    /// Encode every operation of the batch into a transport request
    pub fn encode(&self, batch: &Batch, options: &SendOptions) -> PlanningResult<BatchRequest> {
        let operations = batch
            .operations()
            .iter()
            .map(|operation| {
                Ok(EncodedOperation {
                    global_index: operation.global_index,
                    kind: operation.kind(),
                    bytes: self.encoder.encode(operation)?,
                })
            })
            .collect::<PlanningResult<Vec<_>>>()?;

        Ok(BatchRequest {
            kind: batch.kind(),
            operations,
            write_concern: options.write_concern.clone(),
            ordered: options.ordered,
            bypass_document_validation: options.bypass_document_validation,
        })
    }

    /// Send one encoded batch. Transport failures, timeouts and cancellation
    /// are folded into the returned report rather than propagated.
    pub async fn send(
        &self,
        request: BatchRequest,
        options: &SendOptions,
        cancellation: &CancellationSignal,
    ) -> BatchReport {
        let offset = request.first_index();
        let operation_count = request.len();
        let ordered = request.ordered;
        let dispatched = !cancellation.is_cancelled();

        let result = if dispatched {
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => Err(TransportError::Cancelled),
                result = self.round_trip(request, options.timeout) => result,
            }
        } else {
            Err(TransportError::Cancelled)
        };

        match result {
            Ok(outcome) => {
                let operations_attempted = attempted(&outcome, operation_count, ordered);
                let outcome = outcome.rebase(offset);
                debug!(
                    first_index = offset,
                    operation_count = operation_count,
                    operations_attempted = operations_attempted,
                    write_errors = outcome.write_errors.len(),
                    "Batch round trip complete"
                );
                BatchReport {
                    outcome,
                    transport_error: None,
                    operations_attempted,
                }
            }
            Err(error) => {
                let outcome = error.clone().into_outcome();
                let operations_attempted = match &error {
                    _ if !dispatched => 0,
                    TransportError::OperationFailures(_) => {
                        attempted(&outcome, operation_count, ordered)
                    }
                    // The whole batch reached the connection; how far the
                    // server got is unknown
                    _ => operation_count,
                };
                warn!(
                    first_index = offset,
                    operation_count = operation_count,
                    dispatched = dispatched,
                    error = %error,
                    "Batch round trip failed"
                );
                BatchReport {
                    outcome: outcome.rebase(offset),
                    transport_error: Some(error),
                    operations_attempted,
                }
            }
        }
    }

    async fn round_trip(
        &self,
        request: BatchRequest,
        timeout: Option<Duration>,
    ) -> Result<BatchOutcome, TransportError> {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, self.transport.send_batch(request))
                .await
                .map_err(|_| TransportError::Timeout(limit))?,
            None => self.transport.send_batch(request).await,
        }
    }
}

/// Count for a batch-local outcome
fn attempted(outcome: &BatchOutcome, operation_count: usize, ordered: bool) -> usize {
    if !ordered {
        return operation_count;
    }
    outcome
        .write_errors
        .iter()
        .map(|error| error.index + 1)
        .min()
        .map_or(operation_count, |stop| stop.min(operation_count))
}
