use super::InMemoryCollection;
use bulk_write_core::{BulkWrite, BulkWriteConfig, StaticLimits};
use serde_json::{json, Value};
use std::sync::Arc;

/// Bulk write against `collection` with explicit limits
pub fn bulk_write(
    collection: &Arc<InMemoryCollection>,
    max_batch_count: usize,
    max_batch_bytes: usize,
    config: BulkWriteConfig,
) -> BulkWrite {
    BulkWrite::new(
        collection.clone(),
        Arc::new(StaticLimits::new(max_batch_count, max_batch_bytes).expect("valid limits")),
        config,
    )
    .expect("valid config")
}

pub fn small_document(id: i64) -> Value {
    json!({ "_id": id })
}

/// Document whose encoded size is a little over `payload_bytes`
pub fn large_document(id: i64, payload_bytes: usize) -> Value {
    json!({ "_id": id, "x": "y".repeat(payload_bytes) })
}
