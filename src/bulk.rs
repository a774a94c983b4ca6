//! # Bulk Write
//!
//! The caller-facing object: queue writes, then execute them once.
//!
//! ```rust,no_run
//! use bulk_write_core::{BulkWrite, BulkWriteConfig, ExecutionMode, StaticLimits};
//! use bulk_write_core::execution::transport::BatchTransport;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example(transport: Arc<dyn BatchTransport>) -> Result<(), Box<dyn std::error::Error>> {
//! let mut bulk = BulkWrite::new(transport, Arc::new(StaticLimits::default()), BulkWriteConfig::default())?;
//! bulk.insert_one(json!({"_id": 1}))?;
//! bulk.update_one(json!({"_id": 1}), json!({"$set": {"seen": true}}))?;
//!
//! match bulk.execute(ExecutionMode::Ordered).await {
//!     Ok(result) => println!("inserted {}", result.inserted_count),
//!     Err(error) => {
//!         if let Some(failure) = error.failure() {
//!             println!("partial result: {}", failure.document());
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use crate::aggregator::BulkWriteResult;
use crate::codec::{JsonEncoder, OperationEncoder};
use crate::config::{BulkWriteConfig, ExecutionMode};
use crate::error::{BulkWriteError, Result};
use crate::execution::cancellation::{CancellationHandle, CancellationSignal};
use crate::execution::controller::ExecutionController;
use crate::execution::executor::{BatchExecutor, SendOptions};
use crate::execution::transport::BatchTransport;
use crate::limits::LimitsProvider;
use crate::logging::{log_bulk_operation, log_error};
use crate::operation::{OperationQueue, WriteModel};
use crate::planner::plan;
use crate::state_machine::{ExecutionState, HaltPolicy};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Single-use bulk write against one collection
#[derive(Debug)]
pub struct BulkWrite {
    id: Uuid,
    queue: OperationQueue,
    transport: Arc<dyn BatchTransport>,
    limits_provider: Arc<dyn LimitsProvider>,
    encoder: Arc<dyn OperationEncoder>,
    config: BulkWriteConfig,
    state: ExecutionState,
    cancellation_handle: CancellationHandle,
    cancellation: CancellationSignal,
}

impl BulkWrite {
    pub fn new(
        transport: Arc<dyn BatchTransport>,
        limits_provider: Arc<dyn LimitsProvider>,
        config: BulkWriteConfig,
    ) -> Result<Self> {
        Self::with_encoder(transport, limits_provider, Arc::new(JsonEncoder), config)
    }

    pub fn with_encoder(
        transport: Arc<dyn BatchTransport>,
        limits_provider: Arc<dyn LimitsProvider>,
        encoder: Arc<dyn OperationEncoder>,
        config: BulkWriteConfig,
    ) -> Result<Self> {
        config.validate()?;
        let (cancellation_handle, cancellation) = CancellationHandle::new();
        Ok(Self {
            id: Uuid::new_v4(),
            queue: OperationQueue::new(),
            transport,
            limits_provider,
            encoder,
            config,
            state: ExecutionState::Pending,
            cancellation_handle,
            cancellation,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Handle that aborts in-flight batches of this bulk write when triggered
    pub fn cancellation_handle(&self) -> CancellationHandle {
        self.cancellation_handle.clone()
    }

    /// Queue a write model and return its global index
    pub fn enqueue(&mut self, model: WriteModel) -> Result<usize> {
        self.queue.enqueue(model)
    }

    /// Queue a request in the driver's `{"insert_one": {...}}` shape
    pub fn enqueue_request(&mut self, request: &Value) -> Result<usize> {
        let model = WriteModel::from_request(request)?;
        self.enqueue(model)
    }

    pub fn insert_one(&mut self, document: Value) -> Result<usize> {
        self.enqueue(WriteModel::InsertOne { document })
    }

    pub fn update_one(&mut self, filter: Value, update: Value) -> Result<usize> {
        self.enqueue(WriteModel::UpdateOne {
            filter,
            update,
            upsert: false,
        })
    }

    pub fn update_many(&mut self, filter: Value, update: Value) -> Result<usize> {
        self.enqueue(WriteModel::UpdateMany {
            filter,
            update,
            upsert: false,
        })
    }

    /// Update one document, inserting it when nothing matches
    pub fn upsert_one(&mut self, filter: Value, update: Value) -> Result<usize> {
        self.enqueue(WriteModel::UpdateOne {
            filter,
            update,
            upsert: true,
        })
    }

    pub fn replace_one(&mut self, filter: Value, replacement: Value) -> Result<usize> {
        self.enqueue(WriteModel::ReplaceOne {
            filter,
            replacement,
            upsert: false,
        })
    }

    pub fn delete_one(&mut self, filter: Value) -> Result<usize> {
        self.enqueue(WriteModel::DeleteOne { filter })
    }

    pub fn delete_many(&mut self, filter: Value) -> Result<usize> {
        self.enqueue(WriteModel::DeleteMany { filter })
    }

    /// Plan, send and aggregate every queued operation.
    ///
    /// Returns the aggregated result, or [`BulkWriteError::Failure`] carrying
    /// the partial result when any operation or acknowledgment failed.
    pub async fn execute(&mut self, mode: ExecutionMode) -> Result<BulkWriteResult> {
        if !self.state.accepts_operations() {
            return Err(BulkWriteError::InvalidState(format!(
                "bulk write {} already executed (state: {})",
                self.id, self.state
            )));
        }
        self.queue.close();
        self.state = ExecutionState::Running;

        let started = Instant::now();
        let execution_id = self.id.to_string();
        log_bulk_operation(
            "execute",
            &execution_id,
            mode.is_ordered(),
            "started",
            None,
            Some(&format!("{} operations", self.queue.len())),
        );

        let result = self.run(mode, &execution_id).await;

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result {
            Ok(_) => log_bulk_operation(
                "execute",
                &execution_id,
                mode.is_ordered(),
                &self.state.to_string(),
                Some(duration_ms),
                None,
            ),
            Err(error) => log_error("bulk_write", "execute", &error.to_string(), Some(&execution_id)),
        }
        result
    }

    async fn run(&mut self, mode: ExecutionMode, execution_id: &str) -> Result<BulkWriteResult> {
        if self.queue.is_empty() {
            self.state = ExecutionState::Completed;
            return Ok(BulkWriteResult::default());
        }

        let limits = match self.limits_provider.limits().await.and_then(|limits| {
            limits.with_overrides(self.config.max_batch_count, self.config.max_batch_bytes)
        }) {
            Ok(limits) => limits,
            Err(error) => {
                self.state = ExecutionState::Failed;
                return Err(error);
            }
        };

        let batches = match plan(
            self.queue.operations(),
            &limits,
            self.encoder.as_ref(),
            self.config.grouping,
        ) {
            Ok(batches) => batches,
            Err(error) => {
                self.state = ExecutionState::Failed;
                return Err(error.into());
            }
        };

        let controller = ExecutionController::new(
            execution_id.to_string(),
            BatchExecutor::new(self.transport.clone(), self.encoder.clone()),
            SendOptions {
                ordered: mode.is_ordered(),
                write_concern: self.config.write_concern.clone(),
                bypass_document_validation: self.config.bypass_document_validation,
                timeout: self.config.batch_timeout(),
            },
            HaltPolicy::new(mode, self.config.cancellation_policy),
            self.config.max_in_flight,
        );

        let report = match controller.run(batches, &self.cancellation).await {
            Ok(report) => report,
            Err(error) => {
                self.state = ExecutionState::Failed;
                return Err(error);
            }
        };
        self.state = report.state;
        report.outcome.map_err(BulkWriteError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::transport::{BatchRequest, TransportError};
    use crate::limits::StaticLimits;
    use crate::outcome::BatchOutcome;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BatchTransport for CountingTransport {
        async fn send_batch(
            &self,
            request: BatchRequest,
        ) -> std::result::Result<BatchOutcome, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(BatchOutcome {
                inserted: request.len() as u64,
                ..Default::default()
            })
        }
    }

    /// Errors if consulted; empty executions must not ask for limits
    #[derive(Debug)]
    struct UnreachableLimits;

    #[async_trait]
    impl LimitsProvider for UnreachableLimits {
        async fn max_batch_count(&self) -> Result<usize> {
            Err(BulkWriteError::Limits("limits queried".to_string()))
        }

        async fn max_batch_bytes(&self) -> Result<usize> {
            Err(BulkWriteError::Limits("limits queried".to_string()))
        }
    }

    #[tokio::test]
    async fn test_empty_execute_skips_transport() {
        let transport = Arc::new(CountingTransport::default());
        let mut bulk = BulkWrite::new(
            transport.clone(),
            Arc::new(UnreachableLimits),
            BulkWriteConfig::default(),
        )
        .unwrap();

        let result = bulk.execute(ExecutionMode::Ordered).await.unwrap();
        assert_eq!(result, BulkWriteResult::default());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert_eq!(bulk.state(), ExecutionState::Completed);
    }

    #[tokio::test]
    async fn test_bulk_write_is_single_use() {
        let transport = Arc::new(CountingTransport::default());
        let mut bulk = BulkWrite::new(
            transport.clone(),
            Arc::new(StaticLimits::default()),
            BulkWriteConfig::default(),
        )
        .unwrap();
        assert_eq!(bulk.insert_one(json!({"_id": 1})).unwrap(), 0);
        assert_eq!(bulk.insert_one(json!({"_id": 2})).unwrap(), 1);

        let result = bulk.execute(ExecutionMode::Unordered).await.unwrap();
        assert_eq!(result.inserted_count, 2);

        assert!(matches!(
            bulk.insert_one(json!({"_id": 3})),
            Err(BulkWriteError::InvalidState(_))
        ));
        assert!(matches!(
            bulk.execute(ExecutionMode::Unordered).await,
            Err(BulkWriteError::InvalidState(_))
        ));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_planning_error_sends_nothing() {
        let transport = Arc::new(CountingTransport::default());
        let mut bulk = BulkWrite::new(
            transport.clone(),
            Arc::new(StaticLimits::default()),
            BulkWriteConfig::default(),
        )
        .unwrap();
        bulk.insert_one(json!({"_id": 1})).unwrap();
        bulk.update_one(json!({"_id": 1}), json!({"not_an_operator": 1}))
            .unwrap();

        let err = bulk.execute(ExecutionMode::Ordered).await.unwrap_err();
        assert!(matches!(err, BulkWriteError::Planning(_)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
        assert_eq!(bulk.state(), ExecutionState::Failed);
    }

    #[tokio::test]
    async fn test_enqueue_request_rejects_unknown_kind() {
        let mut bulk = BulkWrite::new(
            Arc::new(CountingTransport::default()),
            Arc::new(StaticLimits::default()),
            BulkWriteConfig::default(),
        )
        .unwrap();
        assert_eq!(
            bulk.enqueue_request(&json!({"delete_one": {"filter": {"_id": 1}}}))
                .unwrap(),
            0
        );
        let err = bulk
            .enqueue_request(&json!({"merge_one": {"_id": 1}}))
            .unwrap_err();
        assert!(matches!(err, BulkWriteError::Planning(_)));
        assert_eq!(bulk.len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = BulkWriteConfig {
            max_in_flight: 0,
            ..Default::default()
        };
        let err = BulkWrite::new(
            Arc::new(CountingTransport::default()),
            Arc::new(StaticLimits::default()),
            config,
        )
        .unwrap_err();
        assert!(matches!(err, BulkWriteError::Configuration(_)));
    }
}
