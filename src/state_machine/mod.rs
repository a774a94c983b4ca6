// State machine module for bulk write executions
//
// Tracks one execution from queue close to its terminal state and owns the
// halt decision that separates ordered from unordered dispatch.

pub mod errors;
pub mod events;
pub mod execution_state_machine;
pub mod states;

// Re-export main types for convenient access
pub use errors::{StateMachineError, StateMachineResult};
pub use events::ExecutionEvent;
pub use execution_state_machine::{ExecutionStateMachine, HaltPolicy};
pub use states::ExecutionState;
