//! # Operation Queue
//!
//! Typed write models and the append-only queue that assigns each of them its
//! global index. The global index is the only identifier callers ever see in
//! error reports, so it is fixed at enqueue time and never reassigned.

use crate::constants::request_keys;
use crate::error::{BulkWriteError, PlanningError, PlanningResult, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Wire-level grouping of write models; each kind maps to one write command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for WriteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

impl std::str::FromStr for WriteKind {
    type Err = PlanningError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(PlanningError::UnknownOperation {
                name: s.to_string(),
            }),
        }
    }
}

/// A single write as supplied by the application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WriteModel {
    InsertOne {
        document: Value,
    },
    UpdateOne {
        filter: Value,
        update: Value,
        upsert: bool,
    },
    UpdateMany {
        filter: Value,
        update: Value,
        upsert: bool,
    },
    ReplaceOne {
        filter: Value,
        replacement: Value,
        upsert: bool,
    },
    DeleteOne {
        filter: Value,
    },
    DeleteMany {
        filter: Value,
    },
}

impl WriteModel {
    pub fn kind(&self) -> WriteKind {
        match self {
            Self::InsertOne { .. } => WriteKind::Insert,
            Self::UpdateOne { .. } | Self::UpdateMany { .. } | Self::ReplaceOne { .. } => {
                WriteKind::Update
            }
            Self::DeleteOne { .. } | Self::DeleteMany { .. } => WriteKind::Delete,
        }
    }

    /// Whether the server should touch at most one matching document
    pub fn is_single(&self) -> bool {
        !matches!(self, Self::UpdateMany { .. } | Self::DeleteMany { .. })
    }

    pub fn is_upsert(&self) -> bool {
        match self {
            Self::UpdateOne { upsert, .. }
            | Self::UpdateMany { upsert, .. }
            | Self::ReplaceOne { upsert, .. } => *upsert,
            _ => false,
        }
    }

    /// Parse the driver request shape, e.g. `{"update_one": {"filter": {..}, "update": {..}}}`
    pub fn from_request(request: &Value) -> PlanningResult<Self> {
        let object = request.as_object().ok_or_else(|| {
            PlanningError::MalformedRequest("write request must be an object".to_string())
        })?;
        if object.len() != 1 {
            return Err(PlanningError::MalformedRequest(format!(
                "write request must have exactly one operation key, found {}",
                object.len()
            )));
        }
        let Some((name, body)) = object.iter().next() else {
            return Err(PlanningError::MalformedRequest(
                "empty write request".to_string(),
            ));
        };

        let model = match name.as_str() {
            request_keys::INSERT_ONE => Self::InsertOne {
                document: body.clone(),
            },
            request_keys::UPDATE_ONE => Self::UpdateOne {
                filter: required(body, name, request_keys::FILTER)?,
                update: required(body, name, request_keys::UPDATE)?,
                upsert: upsert_flag(body),
            },
            request_keys::UPDATE_MANY => Self::UpdateMany {
                filter: required(body, name, request_keys::FILTER)?,
                update: required(body, name, request_keys::UPDATE)?,
                upsert: upsert_flag(body),
            },
            request_keys::REPLACE_ONE => Self::ReplaceOne {
                filter: required(body, name, request_keys::FILTER)?,
                replacement: required(body, name, request_keys::REPLACEMENT)?,
                upsert: upsert_flag(body),
            },
            request_keys::DELETE_ONE => Self::DeleteOne {
                filter: required(body, name, request_keys::FILTER)?,
            },
            request_keys::DELETE_MANY => Self::DeleteMany {
                filter: required(body, name, request_keys::FILTER)?,
            },
            other => {
                return Err(PlanningError::UnknownOperation {
                    name: other.to_string(),
                })
            }
        };
        Ok(model)
    }

    /// Structural checks the server would otherwise reject per document
    pub fn validate(&self, index: usize) -> PlanningResult<()> {
        let invalid = |reason: &str| PlanningError::InvalidDocument {
            index,
            reason: reason.to_string(),
        };

        match self {
            Self::InsertOne { document } => {
                document
                    .as_object()
                    .ok_or_else(|| invalid("insert document must be an object"))?;
            }
            Self::UpdateOne { filter, update, .. } | Self::UpdateMany { filter, update, .. } => {
                expect_object(filter).ok_or_else(|| invalid("filter must be an object"))?;
                let update =
                    expect_object(update).ok_or_else(|| invalid("update must be an object"))?;
                if update.is_empty() {
                    return Err(invalid("update document must not be empty"));
                }
                if !update.keys().all(|key| key.starts_with('$')) {
                    return Err(invalid("update document must only contain $-operators"));
                }
            }
            Self::ReplaceOne {
                filter,
                replacement,
                ..
            } => {
                expect_object(filter).ok_or_else(|| invalid("filter must be an object"))?;
                let replacement = expect_object(replacement)
                    .ok_or_else(|| invalid("replacement must be an object"))?;
                if replacement.keys().any(|key| key.starts_with('$')) {
                    return Err(invalid("replacement document must not contain $-operators"));
                }
            }
            Self::DeleteOne { filter } | Self::DeleteMany { filter } => {
                expect_object(filter).ok_or_else(|| invalid("filter must be an object"))?;
            }
        }
        Ok(())
    }
}

fn expect_object(value: &Value) -> Option<&Map<String, Value>> {
    value.as_object()
}

fn required(body: &Value, operation: &str, key: &str) -> PlanningResult<Value> {
    body.get(key).cloned().ok_or_else(|| {
        PlanningError::MalformedRequest(format!("{operation} requires '{key}'"))
    })
}

fn upsert_flag(body: &Value) -> bool {
    body.get(request_keys::UPSERT)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// A queued write with its immutable global index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub global_index: usize,
    pub model: WriteModel,
}

impl Operation {
    pub fn kind(&self) -> WriteKind {
        self.model.kind()
    }
}

/// Append-only sequence of operations. Closed for writes once execution
/// starts.
#[derive(Debug, Default)]
pub struct OperationQueue {
    operations: Vec<Operation>,
    closed: bool,
}

impl OperationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a write model and return its global index
    pub fn enqueue(&mut self, model: WriteModel) -> Result<usize> {
        if self.closed {
            return Err(BulkWriteError::InvalidState(
                "cannot enqueue operations after execution has started".to_string(),
            ));
        }
        let global_index = self.operations.len();
        self.operations.push(Operation {
            global_index,
            model,
        });
        Ok(global_index)
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
