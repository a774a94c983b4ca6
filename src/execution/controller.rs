//! # Execution Controller
//!
//! Drives planned batches through the executor. Ordered executions send one
//! batch at a time and stop after the first failing batch. Unordered
//! executions send every batch, optionally keeping several in flight; their
//! outcomes are still recorded in planning order so repeated runs report
//! errors identically.

use super::cancellation::CancellationSignal;
use super::executor::{BatchExecutor, BatchReport, SendOptions};
use super::transport::BatchRequest;
use crate::aggregator::{BulkWriteFailure, BulkWriteResult, ResultAggregator};
use crate::config::ExecutionMode;
use crate::error::Result;
use crate::logging::log_batch_operation;
use crate::planner::Batch;
use crate::state_machine::{ExecutionEvent, ExecutionState, ExecutionStateMachine, HaltPolicy};
use futures::stream::{FuturesOrdered, StreamExt};
use tracing::{debug, info};

/// Outcome of a full controller run
#[derive(Debug)]
pub struct ExecutionReport {
    pub state: ExecutionState,
    pub outcome: std::result::Result<BulkWriteResult, BulkWriteFailure>,
    /// Batches planned but never sent because dispatch halted
    pub batches_skipped: usize,
}

pub struct ExecutionController {
    execution_id: String,
    executor: BatchExecutor,
    options: SendOptions,
    max_in_flight: usize,
    state_machine: ExecutionStateMachine,
    aggregator: ResultAggregator,
}

impl ExecutionController {
    pub fn new(
        execution_id: String,
        executor: BatchExecutor,
        options: SendOptions,
        policy: HaltPolicy,
        max_in_flight: usize,
    ) -> Self {
        Self {
            execution_id,
            executor,
            options,
            max_in_flight: max_in_flight.max(1),
            state_machine: ExecutionStateMachine::new(policy),
            aggregator: ResultAggregator::new(),
        }
    }

    pub fn state(&self) -> ExecutionState {
        self.state_machine.state()
    }

    /// Send `batches` and aggregate their outcomes. Consumes the controller;
    /// it cannot be run twice.
    ///
    /// Every batch is encoded before the first one is dispatched, so an
    /// encoding failure leaves the collection untouched.
    pub async fn run(
        mut self,
        batches: Vec<Batch>,
        cancellation: &CancellationSignal,
    ) -> Result<ExecutionReport> {
        let requests = batches
            .iter()
            .map(|batch| self.executor.encode(batch, &self.options))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        self.state_machine.transition(ExecutionEvent::Start)?;
        let planned = batches.len();

        let concurrent =
            self.state_machine.policy().mode == ExecutionMode::Unordered && self.max_in_flight > 1;
        if concurrent {
            self.run_concurrent(&batches, requests, cancellation).await?;
        } else {
            self.run_sequential(&batches, requests, cancellation).await?;
        }

        let state = self.state_machine.transition(ExecutionEvent::Finish)?;
        let sent = self.state_machine.batches_completed();
        info!(
            execution_id = %self.execution_id,
            state = %state,
            batches_planned = planned,
            batches_sent = sent,
            halted = self.state_machine.is_halted(),
            errors_observed = self.state_machine.errors_observed(),
            cancelled = self.state_machine.was_cancelled(),
            "Bulk write execution finished"
        );

        Ok(ExecutionReport {
            state,
            outcome: self.aggregator.finish(),
            batches_skipped: planned - sent,
        })
    }

    async fn run_sequential(
        &mut self,
        batches: &[Batch],
        requests: Vec<BatchRequest>,
        cancellation: &CancellationSignal,
    ) -> Result<()> {
        for (batch_number, request) in requests.into_iter().enumerate() {
            if !self.state_machine.should_dispatch() {
                debug!(
                    execution_id = %self.execution_id,
                    batch_number = batch_number,
                    "Dispatch halted; remaining batches left unsent"
                );
                break;
            }
            let report = self.executor.send(request, &self.options, cancellation).await;
            self.record(batch_number, &batches[batch_number], report)?;
        }
        Ok(())
    }

    async fn run_concurrent(
        &mut self,
        batches: &[Batch],
        requests: Vec<BatchRequest>,
        cancellation: &CancellationSignal,
    ) -> Result<()> {
        let executor = self.executor.clone();
        let options = self.options.clone();
        let mut pending = requests.into_iter().enumerate();
        let mut in_flight = FuturesOrdered::new();

        let dispatch = |number: usize, request: BatchRequest| {
            let executor = executor.clone();
            let options = options.clone();
            let cancellation = cancellation.clone();
            async move { (number, executor.send(request, &options, &cancellation).await) }
        };

        for (number, request) in pending.by_ref().take(self.max_in_flight) {
            in_flight.push_back(dispatch(number, request));
        }

        // FuturesOrdered yields in push order, i.e. planning order
        while let Some((batch_number, report)) = in_flight.next().await {
            self.record(batch_number, &batches[batch_number], report)?;
            if self.state_machine.should_dispatch() {
                if let Some((number, request)) = pending.next() {
                    in_flight.push_back(dispatch(number, request));
                }
            }
        }
        Ok(())
    }

    fn record(&mut self, batch_number: usize, batch: &Batch, report: BatchReport) -> Result<()> {
        let failed = report.is_failure();
        let cancelled = report.was_cancelled();
        let write_concern_error = report.outcome.write_concern_error.is_some();

        log_batch_operation(
            "send_batch",
            &self.execution_id,
            batch_number,
            batch.first_index(),
            batch.last_index(),
            if failed { "failed" } else { "succeeded" },
            report.transport_error.as_ref().map(|e| e.to_string()).as_deref(),
        );

        self.state_machine
            .transition(ExecutionEvent::BatchCompleted {
                batch_number,
                failed,
                write_concern_error,
                cancelled,
            })?;
        self.aggregator.add(report.outcome, report.operations_attempted);
        Ok(())
    }
}
