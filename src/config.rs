use crate::error::{BulkWriteError, Result};
use crate::execution::transport::WriteConcern;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prefix for environment overrides, e.g. `BULK_WRITE_MAX_IN_FLIGHT=4`
pub const ENV_PREFIX: &str = "BULK_WRITE";

/// Ordering discipline of one execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Halt at the first failing operation
    Ordered,
    /// Attempt every operation and collect all errors
    Unordered,
}

impl ExecutionMode {
    pub fn is_ordered(&self) -> bool {
        matches!(self, Self::Ordered)
    }
}

impl From<bool> for ExecutionMode {
    fn from(ordered: bool) -> Self {
        if ordered {
            Self::Ordered
        } else {
            Self::Unordered
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ordered => write!(f, "ordered"),
            Self::Unordered => write!(f, "unordered"),
        }
    }
}

/// How the planner treats a change of operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchGrouping {
    /// Every batch holds one kind; a kind change closes the batch
    ByKind,
    /// Kinds may be mixed inside a batch
    Mixed,
}

/// What an unordered execution does once the caller cancels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationPolicy {
    /// Stop dispatching further batches
    Halt,
    /// Keep dispatching; each remaining batch records its own cancellation
    Continue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkWriteConfig {
    /// Batches in flight at once for unordered executions. Ordered executions
    /// are always sequential.
    pub max_in_flight: usize,
    /// Per-batch round trip timeout; none when unset
    pub batch_timeout_ms: Option<u64>,
    pub grouping: BatchGrouping,
    pub cancellation_policy: CancellationPolicy,
    pub write_concern: WriteConcern,
    pub bypass_document_validation: bool,
    /// Overrides for the limits reported by the server
    pub max_batch_count: Option<usize>,
    pub max_batch_bytes: Option<usize>,
}

impl Default for BulkWriteConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 1,
            batch_timeout_ms: None,
            grouping: BatchGrouping::ByKind,
            cancellation_policy: CancellationPolicy::Halt,
            write_concern: WriteConcern::default(),
            bypass_document_validation: false,
            max_batch_count: None,
            max_batch_bytes: None,
        }
    }
}

impl BulkWriteConfig {
    /// Build a configuration from the defaults layered with `BULK_WRITE_*`
    /// environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_environment(environment_source())
    }

    fn from_environment(source: config::Environment) -> Result<Self> {
        let settings = config::Config::builder().add_source(source).build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_in_flight == 0 {
            return Err(BulkWriteError::Configuration(
                "max_in_flight must be at least 1".to_string(),
            ));
        }
        if self.batch_timeout_ms == Some(0) {
            return Err(BulkWriteError::Configuration(
                "batch_timeout_ms must be positive when set".to_string(),
            ));
        }
        if self.max_batch_count == Some(0) {
            return Err(BulkWriteError::Configuration(
                "max_batch_count override must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn batch_timeout(&self) -> Option<Duration> {
        self.batch_timeout_ms.map(Duration::from_millis)
    }
}

fn environment_source() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
