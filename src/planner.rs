//! # Batch Planner
//!
//! Partitions queued operations into wire-sized batches. Planning is a pure
//! function of its inputs: the same operations and limits always produce the
//! same partition, and concatenating the batches reproduces the input order.
//!
//! A new batch starts when adding the next operation would exceed either the
//! count limit or the byte limit, or, with [`BatchGrouping::ByKind`], when the
//! operation kind changes. The byte check runs before the operation is added,
//! so a batch never exceeds either limit unless it holds a single operation
//! that is oversized on its own. Such an operation is sent alone; rejecting it
//! is the server's call.

use crate::codec::OperationEncoder;
use crate::config::BatchGrouping;
use crate::error::PlanningResult;
use crate::limits::Limits;
use crate::operation::{Operation, WriteKind};

/// Operations sent together in one wire message
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    operations: Vec<Operation>,
    byte_estimate: usize,
}

impl Batch {
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn byte_estimate(&self) -> usize {
        self.byte_estimate
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Global index of the first operation; the remapping offset for this batch
    pub fn first_index(&self) -> usize {
        self.operations
            .first()
            .map(|op| op.global_index)
            .unwrap_or_default()
    }

    /// Global index of the last operation
    pub fn last_index(&self) -> usize {
        self.operations
            .last()
            .map(|op| op.global_index)
            .unwrap_or_default()
    }

    /// The shared kind, or `None` for a mixed batch
    pub fn kind(&self) -> Option<WriteKind> {
        let first = self.operations.first()?.kind();
        self.operations
            .iter()
            .all(|op| op.kind() == first)
            .then_some(first)
    }
}

#[derive(Default)]
struct BatchBuilder {
    operations: Vec<Operation>,
    byte_estimate: usize,
}

impl BatchBuilder {
    fn fits(&self, size: usize, kind: WriteKind, limits: &Limits, grouping: BatchGrouping) -> bool {
        if self.operations.is_empty() {
            return true;
        }
        if self.operations.len() + 1 > limits.max_batch_count() {
            return false;
        }
        if self.byte_estimate + size > limits.max_batch_bytes() {
            return false;
        }
        match grouping {
            BatchGrouping::ByKind => self.operations[0].kind() == kind,
            BatchGrouping::Mixed => true,
        }
    }

    fn push(&mut self, operation: Operation, size: usize) {
        self.byte_estimate += size;
        self.operations.push(operation);
    }

    fn take(&mut self) -> Option<Batch> {
        if self.operations.is_empty() {
            return None;
        }
        let builder = std::mem::take(self);
        Some(Batch {
            operations: builder.operations,
            byte_estimate: builder.byte_estimate,
        })
    }
}

/// Partition `operations` into batches honouring `limits`.
///
/// Every operation is validated first, so a malformed operation fails the
/// whole plan before anything reaches the transport.
pub fn plan(
    operations: &[Operation],
    limits: &Limits,
    encoder: &dyn OperationEncoder,
    grouping: BatchGrouping,
) -> PlanningResult<Vec<Batch>> {
    for operation in operations {
        operation.model.validate(operation.global_index)?;
    }

    let mut batches = Vec::new();
    let mut current = BatchBuilder::default();

    for operation in operations {
        let size = encoder.estimate_size(operation);
        if !current.fits(size, operation.kind(), limits, grouping) {
            batches.extend(current.take());
        }
        current.push(operation.clone(), size);
    }
    batches.extend(current.take());

    tracing::debug!(
        operation_count = operations.len(),
        batch_count = batches.len(),
        max_batch_count = limits.max_batch_count(),
        max_batch_bytes = limits.max_batch_bytes(),
        "Planned bulk write batches"
    );

    Ok(batches)
}
