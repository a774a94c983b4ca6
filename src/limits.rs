//! Server capacity limits consumed by the planner.
//!
//! Limits come from a [`LimitsProvider`], normally the connection that knows
//! the server's handshake values. [`StaticLimits`] covers fixed values:
//!
//! ```rust
//! use bulk_write_core::{LimitsProvider, StaticLimits};
//!
//! # tokio_test::block_on(async {
//! let provider = StaticLimits::new(1_000, 16 * 1024 * 1024).unwrap();
//! let limits = provider.limits().await.unwrap();
//! assert_eq!(limits.max_batch_count(), 1_000);
//! # });
//! ```

use crate::constants::{DEFAULT_MAX_BATCH_BYTES, DEFAULT_MAX_BATCH_COUNT, MIN_DOCUMENT_BYTES};
use crate::error::{BulkWriteError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    max_batch_count: usize,
    max_batch_bytes: usize,
}

impl Limits {
    pub fn new(max_batch_count: usize, max_batch_bytes: usize) -> Result<Self> {
        if max_batch_count == 0 {
            return Err(BulkWriteError::Limits(
                "max_batch_count must be at least 1".to_string(),
            ));
        }
        if max_batch_bytes <= MIN_DOCUMENT_BYTES {
            return Err(BulkWriteError::Limits(format!(
                "max_batch_bytes must exceed {MIN_DOCUMENT_BYTES} bytes, got {max_batch_bytes}"
            )));
        }
        Ok(Self {
            max_batch_count,
            max_batch_bytes,
        })
    }

    pub fn max_batch_count(&self) -> usize {
        self.max_batch_count
    }

    pub fn max_batch_bytes(&self) -> usize {
        self.max_batch_bytes
    }

    /// Apply configured overrides on top of server-reported limits
    pub fn with_overrides(self, count: Option<usize>, bytes: Option<usize>) -> Result<Self> {
        Self::new(
            count.unwrap_or(self.max_batch_count),
            bytes.unwrap_or(self.max_batch_bytes),
        )
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_batch_count: DEFAULT_MAX_BATCH_COUNT,
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
        }
    }
}

/// Capability negotiation collaborator. Queried once per execution.
#[async_trait]
pub trait LimitsProvider: Send + Sync + Debug {
    async fn max_batch_count(&self) -> Result<usize>;

    async fn max_batch_bytes(&self) -> Result<usize>;

    async fn limits(&self) -> Result<Limits> {
        let count = self.max_batch_count().await?;
        let bytes = self.max_batch_bytes().await?;
        Limits::new(count, bytes)
    }
}

/// Fixed limits known up front
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLimits {
    limits: Limits,
}

impl StaticLimits {
    pub fn new(max_batch_count: usize, max_batch_bytes: usize) -> Result<Self> {
        Ok(Self {
            limits: Limits::new(max_batch_count, max_batch_bytes)?,
        })
    }
}

impl From<Limits> for StaticLimits {
    fn from(limits: Limits) -> Self {
        Self { limits }
    }
}

#[async_trait]
impl LimitsProvider for StaticLimits {
    async fn max_batch_count(&self) -> Result<usize> {
        Ok(self.limits.max_batch_count)
    }

    async fn max_batch_bytes(&self) -> Result<usize> {
        Ok(self.limits.max_batch_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_validation() {
        assert!(Limits::new(0, 1024).is_err());
        assert!(Limits::new(1, MIN_DOCUMENT_BYTES).is_err());
        let limits = Limits::new(1, MIN_DOCUMENT_BYTES + 1).unwrap();
        assert_eq!(limits.max_batch_count(), 1);
    }

    #[test]
    fn test_overrides() {
        let limits = Limits::default()
            .with_overrides(Some(1000), None)
            .unwrap();
        assert_eq!(limits.max_batch_count(), 1000);
        assert_eq!(limits.max_batch_bytes(), DEFAULT_MAX_BATCH_BYTES);
        assert!(Limits::default().with_overrides(None, Some(1)).is_err());
    }

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticLimits::new(10, 4096).unwrap();
        let limits = provider.limits().await.unwrap();
        assert_eq!(limits, Limits::new(10, 4096).unwrap());
    }
}
