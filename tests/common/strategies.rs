use bulk_write_core::{Operation, WriteModel};
use proptest::prelude::*;
use serde_json::json;

/// Strategy for generating one valid write model with a payload of up to `max_payload` bytes
pub fn write_model_strategy(max_payload: usize) -> impl Strategy<Value = WriteModel> {
    (0u8..6, 0i64..10_000, 0..=max_payload).prop_map(|(variant, id, payload)| {
        let padding = "p".repeat(payload);
        match variant {
            0 | 1 => WriteModel::InsertOne {
                document: json!({ "_id": id, "pad": padding }),
            },
            2 => WriteModel::UpdateOne {
                filter: json!({ "_id": id }),
                update: json!({ "$set": { "pad": padding } }),
                upsert: id % 2 == 0,
            },
            3 => WriteModel::ReplaceOne {
                filter: json!({ "_id": id }),
                replacement: json!({ "pad": padding }),
                upsert: false,
            },
            4 => WriteModel::DeleteOne {
                filter: json!({ "_id": id }),
            },
            _ => WriteModel::DeleteMany {
                filter: json!({ "pad": padding }),
            },
        }
    })
}

/// Strategy for generating a queue of operations with sequential global indices
pub fn operations_strategy(
    max_len: usize,
    max_payload: usize,
) -> impl Strategy<Value = Vec<Operation>> {
    prop::collection::vec(write_model_strategy(max_payload), 0..max_len).prop_map(|models| {
        models
            .into_iter()
            .enumerate()
            .map(|(global_index, model)| Operation {
                global_index,
                model,
            })
            .collect()
    })
}

/// Strategy for generating insert-only queues
pub fn insert_operations_strategy(max_len: usize) -> impl Strategy<Value = Vec<Operation>> {
    (0..max_len).prop_map(|len| {
        (0..len)
            .map(|i| Operation {
                global_index: i,
                model: WriteModel::InsertOne {
                    document: json!({ "_id": i }),
                },
            })
            .collect()
    })
}
