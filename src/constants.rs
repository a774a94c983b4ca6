//! # Wire Constants
//!
//! Server defaults, synthetic error codes and the result mapping keys that
//! existing driver clients depend on.

/// Server default for the number of write operations in one batch
pub const DEFAULT_MAX_BATCH_COUNT: usize = 100_000;

/// Server default for the maximum size of one wire message in bytes
pub const DEFAULT_MAX_BATCH_BYTES: usize = 48_000_000;

/// Size of an empty document on the wire; any byte limit must exceed it
pub const MIN_DOCUMENT_BYTES: usize = 5;

/// Codes attached to write errors synthesized from transport failures
pub mod error_codes {
    /// Connection lost or reset mid round trip
    pub const NETWORK_ERROR: i32 = 9001;
    /// Round trip exceeded the configured batch timeout
    pub const NETWORK_TIMEOUT: i32 = 89;
    /// Batch abandoned because the caller cancelled the bulk write
    pub const INTERRUPTED: i32 = 11601;
    /// Unique index violation, as reported by the server
    pub const DUPLICATE_KEY: i32 = 11000;
}

/// Keys of the result mapping exposed to callers
pub mod result_keys {
    pub const WRITE_ERRORS: &str = "writeErrors";
    pub const WRITE_CONCERN_ERRORS: &str = "writeConcernErrors";
    pub const INSERTED_COUNT: &str = "insertedCount";
    pub const MATCHED_COUNT: &str = "matchedCount";
    pub const MODIFIED_COUNT: &str = "modifiedCount";
    pub const DELETED_COUNT: &str = "deletedCount";
    pub const UPSERTED_COUNT: &str = "upsertedCount";
    pub const UPSERTED: &str = "upserted";
    pub const INDEX: &str = "index";
    pub const CODE: &str = "code";
    pub const ERRMSG: &str = "errmsg";
}

/// Request keys understood by `WriteModel::from_request`
pub mod request_keys {
    pub const INSERT_ONE: &str = "insert_one";
    pub const UPDATE_ONE: &str = "update_one";
    pub const UPDATE_MANY: &str = "update_many";
    pub const REPLACE_ONE: &str = "replace_one";
    pub const DELETE_ONE: &str = "delete_one";
    pub const DELETE_MANY: &str = "delete_many";

    pub const FILTER: &str = "filter";
    pub const UPDATE: &str = "update";
    pub const REPLACEMENT: &str = "replacement";
    pub const UPSERT: &str = "upsert";
}
