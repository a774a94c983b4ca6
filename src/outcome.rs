//! Per-batch outcomes as reported by the transport.
//!
//! Indices inside a [`BatchOutcome`] are batch-local when they come off the
//! wire. The executor rebases them with [`BatchOutcome::rebase`] before the
//! outcome reaches the aggregator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A server-reported failure of one operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteError {
    pub index: usize,
    pub code: i32,
    pub errmsg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl WriteError {
    pub fn new(index: usize, code: i32, errmsg: impl Into<String>) -> Self {
        Self {
            index,
            code,
            errmsg: errmsg.into(),
            details: None,
        }
    }
}

/// Acknowledgment failure; independent of per-operation errors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteConcernError {
    pub code: i32,
    pub errmsg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl WriteConcernError {
    pub fn new(code: i32, errmsg: impl Into<String>) -> Self {
        Self {
            code,
            errmsg: errmsg.into(),
            details: None,
        }
    }
}

/// Document created by an upsert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upserted {
    pub index: usize,
    #[serde(rename = "_id")]
    pub id: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub inserted: u64,
    pub matched: u64,
    pub modified: u64,
    pub deleted: u64,
    pub upserted: Vec<Upserted>,
    pub write_errors: Vec<WriteError>,
    pub write_concern_error: Option<WriteConcernError>,
}

impl BatchOutcome {
    /// Outcome carrying a single error and no successes
    pub fn from_error(error: WriteError) -> Self {
        Self {
            write_errors: vec![error],
            ..Default::default()
        }
    }

    pub fn has_write_errors(&self) -> bool {
        !self.write_errors.is_empty()
    }

    pub fn upserted_count(&self) -> u64 {
        self.upserted.len() as u64
    }

    /// Shift batch-local indices by the batch's first global index
    pub fn rebase(mut self, offset: usize) -> Self {
        for error in &mut self.write_errors {
            error.index += offset;
        }
        for upserted in &mut self.upserted {
            upserted.index += offset;
        }
        self
    }
}
