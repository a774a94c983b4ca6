//! Operation encoding seam.
//!
//! The planner only needs a size estimate per operation; the executor needs the
//! encoded bytes. Both come from the same encoder so estimates and payloads
//! never drift apart.

use crate::error::{PlanningError, PlanningResult};
use crate::operation::{Operation, WriteModel};
use serde_json::{json, Value};
use std::fmt::Debug;

pub trait OperationEncoder: Send + Sync + Debug {
    /// Encode one operation into its wire form
    fn encode(&self, operation: &Operation) -> PlanningResult<Vec<u8>>;

    /// Serialized size of the operation in bytes
    fn estimate_size(&self, operation: &Operation) -> usize;
}

/// Encodes operations as the JSON statement documents of the write commands
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl JsonEncoder {
    /// Statement document for one operation, as it appears inside an
    /// `insert`, `update` or `delete` command
    pub fn statement(model: &WriteModel) -> Value {
        match model {
            WriteModel::InsertOne { document } => document.clone(),
            WriteModel::UpdateOne { filter, update, .. }
            | WriteModel::UpdateMany { filter, update, .. } => json!({
                "q": filter,
                "u": update,
                "multi": !model.is_single(),
                "upsert": model.is_upsert(),
            }),
            WriteModel::ReplaceOne {
                filter,
                replacement,
                ..
            } => json!({
                "q": filter,
                "u": replacement,
                "multi": false,
                "upsert": model.is_upsert(),
            }),
            // limit 0 removes every match
            WriteModel::DeleteOne { filter } | WriteModel::DeleteMany { filter } => json!({
                "q": filter,
                "limit": u8::from(model.is_single()),
            }),
        }
    }
}

impl OperationEncoder for JsonEncoder {
    fn encode(&self, operation: &Operation) -> PlanningResult<Vec<u8>> {
        serde_json::to_vec(&Self::statement(&operation.model)).map_err(|e| {
            PlanningError::Encoding {
                index: operation.global_index,
                reason: e.to_string(),
            }
        })
    }

    fn estimate_size(&self, operation: &Operation) -> usize {
        // serde_json::Value always serializes; fall back to 0 rather than panic
        serde_json::to_vec(&Self::statement(&operation.model))
            .map(|bytes| bytes.len())
            .unwrap_or(0)
    }
}
