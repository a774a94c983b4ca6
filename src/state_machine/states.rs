use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a single bulk write execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    /// Initial state; no batch sent yet and the queue is still open
    #[default]
    Pending,
    /// Batches are being dispatched
    Running,
    /// Every planned batch was sent and nothing failed
    Completed,
    /// At least one write error or write-concern error was collected
    Failed,
}

impl ExecutionState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check if this is an active state (batches being dispatched)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Whether operations may still be enqueued
    pub fn accepts_operations(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ExecutionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid execution state: {s}")),
        }
    }
}
