//! # Result Aggregator
//!
//! Merges per-batch outcomes into one [`BulkWriteResult`]. This is the only
//! place a bulk result or a [`BulkWriteFailure`] is built: outcomes go in,
//! one of the two comes out.

use crate::constants::result_keys;
use crate::outcome::{BatchOutcome, Upserted, WriteConcernError, WriteError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkWriteResult {
    pub inserted_count: u64,
    pub matched_count: u64,
    pub modified_count: u64,
    pub deleted_count: u64,
    pub upserted_count: u64,
    pub upserted: Vec<Upserted>,
    pub write_errors: Vec<WriteError>,
    pub write_concern_errors: Vec<WriteConcernError>,
    /// Batches actually sent
    pub batches_sent: usize,
    /// Operations the server worked through, failed ones included
    pub operations_attempted: usize,
}

impl BulkWriteResult {
    pub fn has_errors(&self) -> bool {
        !self.write_errors.is_empty() || !self.write_concern_errors.is_empty()
    }

    /// Index of the first operation that failed, if any
    pub fn first_error_index(&self) -> Option<usize> {
        self.write_errors.first().map(|error| error.index)
    }

    /// Result mapping in the shape existing driver clients consume
    pub fn to_document(&self) -> Value {
        let write_errors: Vec<Value> = self
            .write_errors
            .iter()
            .map(|error| {
                json!({
                    result_keys::INDEX: error.index,
                    result_keys::CODE: error.code,
                    result_keys::ERRMSG: error.errmsg,
                })
            })
            .collect();
        let write_concern_errors: Vec<Value> = self
            .write_concern_errors
            .iter()
            .map(|error| {
                json!({
                    result_keys::CODE: error.code,
                    result_keys::ERRMSG: error.errmsg,
                })
            })
            .collect();
        let upserted: Vec<Value> = self
            .upserted
            .iter()
            .map(|u| json!({ result_keys::INDEX: u.index, "_id": u.id }))
            .collect();

        json!({
            result_keys::INSERTED_COUNT: self.inserted_count,
            result_keys::MATCHED_COUNT: self.matched_count,
            result_keys::MODIFIED_COUNT: self.modified_count,
            result_keys::DELETED_COUNT: self.deleted_count,
            result_keys::UPSERTED_COUNT: self.upserted_count,
            result_keys::UPSERTED: upserted,
            result_keys::WRITE_ERRORS: write_errors,
            result_keys::WRITE_CONCERN_ERRORS: write_concern_errors,
        })
    }
}

/// Raised when any operation failed; carries everything that did succeed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error(
    "Bulk write failed: {} write errors, {} write concern errors",
    .result.write_errors.len(),
    .result.write_concern_errors.len()
)]
pub struct BulkWriteFailure {
    result: BulkWriteResult,
}

impl BulkWriteFailure {
    pub fn result(&self) -> &BulkWriteResult {
        &self.result
    }

    pub fn into_result(self) -> BulkWriteResult {
        self.result
    }

    /// The compatibility mapping with `writeErrors` and counts
    pub fn document(&self) -> Value {
        self.result.to_document()
    }
}

/// Accumulates outcomes in send order
#[derive(Debug, Default)]
pub struct ResultAggregator {
    result: BulkWriteResult,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one outcome in; its indices must already be global
    pub fn add(&mut self, outcome: BatchOutcome, operations_attempted: usize) {
        let result = &mut self.result;
        result.batches_sent += 1;
        result.operations_attempted += operations_attempted;
        result.inserted_count += outcome.inserted;
        result.matched_count += outcome.matched;
        result.modified_count += outcome.modified;
        result.deleted_count += outcome.deleted;
        result.upserted_count += outcome.upserted_count();
        result.upserted.extend(outcome.upserted);
        result.write_errors.extend(outcome.write_errors);
        result.write_concern_errors.extend(outcome.write_concern_error);
    }

    pub fn finish(self) -> Result<BulkWriteResult, BulkWriteFailure> {
        if self.result.has_errors() {
            Err(BulkWriteFailure {
                result: self.result,
            })
        } else {
            Ok(self.result)
        }
    }
}

/// Merge outcomes received in send order into one result. Each outcome comes
/// with the number of operations the server attempted for it.
pub fn aggregate<I>(outcomes: I) -> Result<BulkWriteResult, BulkWriteFailure>
where
    I: IntoIterator<Item = (BatchOutcome, usize)>,
{
    let mut aggregator = ResultAggregator::new();
    for (outcome, operations_attempted) in outcomes {
        aggregator.add(outcome, operations_attempted);
    }
    aggregator.finish()
}
