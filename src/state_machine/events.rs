use serde::{Deserialize, Serialize};

/// Events that drive an execution through its lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ExecutionEvent {
    /// Queue closed, dispatch begins
    Start,
    /// One batch came back; `failed` when it carried write errors or a
    /// transport failure, `write_concern_error` when acknowledgment failed
    BatchCompleted {
        batch_number: usize,
        failed: bool,
        write_concern_error: bool,
        cancelled: bool,
    },
    /// No more batches will be sent
    Finish,
}

impl ExecutionEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::BatchCompleted { .. } => "batch_completed",
            Self::Finish => "finish",
        }
    }
}
