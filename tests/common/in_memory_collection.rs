use async_trait::async_trait;
use bulk_write_core::constants::error_codes;
use bulk_write_core::execution::{
    BatchRequest, BatchTransport, EncodedOperation, TransportError, WriteConcern,
};
use bulk_write_core::{BatchOutcome, Upserted, WriteConcernError, WriteError, WriteKind};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

/// What the server saw for one round trip
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub kind: Option<WriteKind>,
    pub first_index: usize,
    pub global_indices: Vec<usize>,
    pub ordered: bool,
    pub write_concern: WriteConcern,
}

/// Single-collection server stand-in with a unique index on `_id`.
///
/// Behaves like the write commands: ordered batches stop at the first failing
/// statement, unordered batches run every statement. Faults are keyed by the
/// first global index of a batch so they stay deterministic under concurrent
/// dispatch.
#[derive(Debug, Default)]
pub struct InMemoryCollection {
    documents: Mutex<Vec<Value>>,
    requests: Mutex<Vec<RecordedRequest>>,
    transport_failures: Mutex<HashMap<usize, TransportError>>,
    write_concern_failures: Mutex<HashMap<usize, WriteConcernError>>,
    latencies: Mutex<HashMap<usize, Duration>>,
    next_generated_id: Mutex<u64>,
}

impl InMemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the round trip of the batch starting at `first_index`
    pub fn fail_batch_at(&self, first_index: usize, error: TransportError) {
        self.transport_failures.lock().insert(first_index, error);
    }

    /// Apply the batch starting at `first_index`, then report a write-concern error
    pub fn write_concern_error_at(&self, first_index: usize, error: WriteConcernError) {
        self.write_concern_failures.lock().insert(first_index, error);
    }

    /// Delay the batch starting at `first_index`
    pub fn delay_batch_at(&self, first_index: usize, latency: Duration) {
        self.latencies.lock().insert(first_index, latency);
    }

    pub fn count(&self) -> usize {
        self.documents.lock().len()
    }

    pub fn find(&self, filter: &Value) -> Vec<Value> {
        self.documents
            .lock()
            .iter()
            .filter(|doc| matches_filter(doc, filter))
            .cloned()
            .collect()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Every global index the server was asked to apply, in arrival order
    pub fn attempted_indices(&self) -> Vec<usize> {
        self.requests
            .lock()
            .iter()
            .flat_map(|r| r.global_indices.iter().copied())
            .collect()
    }

    fn apply(&self, local: usize, operation: &EncodedOperation, outcome: &mut BatchOutcome) -> bool {
        let statement: Value = match serde_json::from_slice(&operation.bytes) {
            Ok(statement) => statement,
            Err(e) => {
                outcome
                    .write_errors
                    .push(WriteError::new(local, 2, format!("failed to decode statement: {e}")));
                return false;
            }
        };

        match operation.kind {
            WriteKind::Insert => self.insert(local, statement, outcome),
            WriteKind::Update => self.update(local, &statement, outcome),
            WriteKind::Delete => {
                self.delete(&statement, outcome);
                true
            }
        }
    }

    fn insert(&self, local: usize, document: Value, outcome: &mut BatchOutcome) -> bool {
        let mut documents = self.documents.lock();
        if let Some(id) = document.get("_id") {
            if documents.iter().any(|doc| doc.get("_id") == Some(id)) {
                outcome.write_errors.push(WriteError::new(
                    local,
                    error_codes::DUPLICATE_KEY,
                    format!("E11000 duplicate key error collection: test.bulk index: _id_ dup key: {{ _id: {id} }}"),
                ));
                return false;
            }
        }
        documents.push(document);
        outcome.inserted += 1;
        true
    }

    fn update(&self, local: usize, statement: &Value, outcome: &mut BatchOutcome) -> bool {
        let filter = &statement["q"];
        let update = &statement["u"];
        let multi = statement["multi"].as_bool().unwrap_or(false);
        let upsert = statement["upsert"].as_bool().unwrap_or(false);

        let mut documents = self.documents.lock();
        let mut matched = 0;
        for doc in documents.iter_mut().filter(|doc| matches_filter(doc, filter)) {
            matched += 1;
            let updated = apply_update(doc, update);
            if updated != *doc {
                *doc = updated;
                outcome.modified += 1;
            }
            if !multi {
                break;
            }
        }
        outcome.matched += matched;

        if matched == 0 && upsert {
            let mut seed = Map::new();
            if let Some(filter) = filter.as_object() {
                for (key, value) in filter {
                    if !key.starts_with('$') {
                        seed.insert(key.clone(), value.clone());
                    }
                }
            }
            let mut document = apply_update(&Value::Object(seed), update);
            let id = match document.get("_id") {
                Some(id) => id.clone(),
                None => {
                    let mut next = self.next_generated_id.lock();
                    *next += 1;
                    let id = Value::String(format!("generated-{next}"));
                    document["_id"] = id.clone();
                    id
                }
            };
            if documents.iter().any(|doc| doc.get("_id") == Some(&id)) {
                outcome.write_errors.push(WriteError::new(
                    local,
                    error_codes::DUPLICATE_KEY,
                    "E11000 duplicate key error on upsert",
                ));
                return false;
            }
            documents.push(document);
            outcome.upserted.push(Upserted { index: local, id });
        }
        true
    }

    fn delete(&self, statement: &Value, outcome: &mut BatchOutcome) {
        let filter = &statement["q"];
        let limit = statement["limit"].as_u64().unwrap_or(0);
        let mut documents = self.documents.lock();
        let mut deleted = 0;
        documents.retain(|doc| {
            if (limit == 0 || deleted < limit) && matches_filter(doc, filter) {
                deleted += 1;
                false
            } else {
                true
            }
        });
        outcome.deleted += deleted;
    }
}

#[async_trait]
impl BatchTransport for InMemoryCollection {
    async fn send_batch(&self, request: BatchRequest) -> Result<BatchOutcome, TransportError> {
        let first_index = request.first_index();
        self.requests.lock().push(RecordedRequest {
            kind: request.kind,
            first_index,
            global_indices: request.operations.iter().map(|op| op.global_index).collect(),
            ordered: request.ordered,
            write_concern: request.write_concern.clone(),
        });

        let latency = self.latencies.lock().get(&first_index).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let failure = self.transport_failures.lock().remove(&first_index);
        if let Some(error) = failure {
            return Err(error);
        }

        let mut outcome = BatchOutcome::default();
        for (local, operation) in request.operations.iter().enumerate() {
            let applied = self.apply(local, operation, &mut outcome);
            if !applied && request.ordered {
                break;
            }
        }
        outcome.write_concern_error = self.write_concern_failures.lock().remove(&first_index);
        Ok(outcome)
    }
}

fn matches_filter(document: &Value, filter: &Value) -> bool {
    match filter.as_object() {
        Some(filter) => filter
            .iter()
            .all(|(key, expected)| document.get(key) == Some(expected)),
        None => false,
    }
}

/// `$set`, `$inc` and `$unset`; anything without operators is a replacement
fn apply_update(document: &Value, update: &Value) -> Value {
    let Some(update) = update.as_object() else {
        return document.clone();
    };
    if !update.keys().any(|key| key.starts_with('$')) {
        let mut replacement = update.clone();
        if let Some(id) = document.get("_id") {
            replacement.insert("_id".to_string(), id.clone());
        }
        return Value::Object(replacement);
    }

    let mut result = document.as_object().cloned().unwrap_or_default();
    if let Some(fields) = update.get("$set").and_then(Value::as_object) {
        for (key, value) in fields {
            result.insert(key.clone(), value.clone());
        }
    }
    if let Some(fields) = update.get("$inc").and_then(Value::as_object) {
        for (key, delta) in fields {
            let current = result.get(key).and_then(Value::as_i64).unwrap_or(0);
            let delta = delta.as_i64().unwrap_or(0);
            result.insert(key.clone(), Value::from(current + delta));
        }
    }
    if let Some(fields) = update.get("$unset").and_then(Value::as_object) {
        for key in fields.keys() {
            result.remove(key);
        }
    }
    Value::Object(result)
}
