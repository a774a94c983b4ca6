use super::errors::{StateMachineError, StateMachineResult};
use super::events::ExecutionEvent;
use super::states::ExecutionState;
use crate::config::{CancellationPolicy, ExecutionMode};
use tracing::debug;

/// Decides whether dispatch stops after a batch. Kept apart from the state
/// machine so each discipline can be checked on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HaltPolicy {
    pub mode: ExecutionMode,
    pub cancellation: CancellationPolicy,
}

impl HaltPolicy {
    pub fn new(mode: ExecutionMode, cancellation: CancellationPolicy) -> Self {
        Self { mode, cancellation }
    }

    /// Write-concern errors never halt; only operation failures and
    /// cancellation do.
    pub fn halts_after(&self, failed: bool, cancelled: bool) -> bool {
        match self.mode {
            ExecutionMode::Ordered => failed || cancelled,
            ExecutionMode::Unordered => {
                cancelled && self.cancellation == CancellationPolicy::Halt
            }
        }
    }
}

/// `Pending → Running → {Completed, Failed}` with the halt decision held as
/// explicit state. Single use: terminal states accept no events.
#[derive(Debug, Clone)]
pub struct ExecutionStateMachine {
    state: ExecutionState,
    policy: HaltPolicy,
    errors_observed: bool,
    write_concern_failed: bool,
    cancelled: bool,
    halted: bool,
    batches_completed: usize,
}

impl ExecutionStateMachine {
    pub fn new(policy: HaltPolicy) -> Self {
        Self {
            state: ExecutionState::Pending,
            policy,
            errors_observed: false,
            write_concern_failed: false,
            cancelled: false,
            halted: false,
            batches_completed: 0,
        }
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn policy(&self) -> HaltPolicy {
        self.policy
    }

    /// Whether another batch may be dispatched
    pub fn should_dispatch(&self) -> bool {
        self.state.is_active() && !self.halted
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn errors_observed(&self) -> bool {
        self.errors_observed
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn batches_completed(&self) -> usize {
        self.batches_completed
    }

    /// Apply an event and return the resulting state
    pub fn transition(&mut self, event: ExecutionEvent) -> StateMachineResult<ExecutionState> {
        let from = self.state;
        let target = self.determine_target_state(from, &event)?;

        if let ExecutionEvent::BatchCompleted {
            failed,
            write_concern_error,
            cancelled,
            ..
        } = event
        {
            self.batches_completed += 1;
            self.errors_observed |= failed;
            self.write_concern_failed |= write_concern_error;
            self.cancelled |= cancelled;
            if self.policy.halts_after(failed, cancelled) {
                self.halted = true;
            }
        }

        let target = match target {
            ExecutionState::Completed if self.errors_observed || self.write_concern_failed => {
                ExecutionState::Failed
            }
            other => other,
        };

        if from != target {
            debug!(
                from = %from,
                to = %target,
                event = event.event_type(),
                mode = %self.policy.mode,
                "Bulk write execution transition"
            );
        }
        self.state = target;
        Ok(target)
    }

    fn determine_target_state(
        &self,
        current_state: ExecutionState,
        event: &ExecutionEvent,
    ) -> StateMachineResult<ExecutionState> {
        let target = match (current_state, event) {
            (ExecutionState::Pending, ExecutionEvent::Start) => ExecutionState::Running,
            // Outcomes of batches already in flight are still recorded after a halt
            (ExecutionState::Running, ExecutionEvent::BatchCompleted { .. }) => {
                ExecutionState::Running
            }
            // Settled below once the collected errors are known
            (ExecutionState::Running, ExecutionEvent::Finish) => ExecutionState::Completed,

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }
}
