#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Bulk Write Core
//!
//! Batch splitting, dispatch and result aggregation for document database
//! bulk writes.
//!
//! ## Overview
//!
//! An application queues insert, update and delete operations against one
//! collection. The core partitions them into batches that respect the
//! server's operation-count and message-size limits, sends each batch through
//! an injected transport, and folds the per-batch outcomes into one result.
//! Every error is reported against the operation's position in the original
//! queue, never against its position inside a batch.
//!
//! ## Ordering
//!
//! - **Ordered**: batches go out one at a time; the first failing batch stops
//!   dispatch and later operations are never attempted.
//! - **Unordered**: every batch is attempted. Batches may overlap in flight
//!   (`max_in_flight`) but outcomes are folded in planning order.
//!
//! ## Module Organization
//!
//! - [`operation`] - Write models and the operation queue
//! - [`codec`] - Operation encoding and size estimation
//! - [`limits`] - Server capacity limits
//! - [`planner`] - Batch partitioning
//! - [`execution`] - Transport seam, batch executor and execution controller
//! - [`state_machine`] - Execution lifecycle and halt policy
//! - [`aggregator`] - Result merging and the bulk failure type
//! - [`bulk`] - The caller-facing [`BulkWrite`]
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod aggregator;
pub mod bulk;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod execution;
pub mod limits;
pub mod logging;
pub mod operation;
pub mod outcome;
pub mod planner;
pub mod state_machine;

pub use aggregator::{aggregate, BulkWriteFailure, BulkWriteResult, ResultAggregator};
pub use bulk::BulkWrite;
pub use codec::{JsonEncoder, OperationEncoder};
pub use config::{BatchGrouping, BulkWriteConfig, CancellationPolicy, ExecutionMode};
pub use error::{BulkWriteError, PlanningError, Result};
pub use execution::{BatchTransport, CancellationHandle, TransportError, WriteConcern};
pub use limits::{Limits, LimitsProvider, StaticLimits};
pub use operation::{Operation, OperationQueue, WriteKind, WriteModel};
pub use outcome::{BatchOutcome, Upserted, WriteConcernError, WriteError};
pub use planner::{plan, Batch};
pub use state_machine::ExecutionState;
