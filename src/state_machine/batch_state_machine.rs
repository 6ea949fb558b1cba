use super::{
    errors::{StateMachineError, StateMachineResult},
    events::BatchTaskEvent,
    states::BatchTaskStatus,
};

/// Determine the target state for a batch given its current state and an event
///
/// The scheduler owns `Start`, `Complete` and `Fail`; the control surface only
/// issues `Rearm`, which is refused while the batch is running.
pub fn determine_target_state(
    current_state: BatchTaskStatus,
    event: &BatchTaskEvent,
) -> StateMachineResult<BatchTaskStatus> {
    let target = match (current_state, event) {
        (BatchTaskStatus::Pending, BatchTaskEvent::Start) => BatchTaskStatus::Running,

        (BatchTaskStatus::Running, BatchTaskEvent::Complete) => BatchTaskStatus::Completed,

        (BatchTaskStatus::Running, BatchTaskEvent::Fail(_)) => BatchTaskStatus::Failed,
        (BatchTaskStatus::Pending, BatchTaskEvent::Fail(_)) => BatchTaskStatus::Failed,

        (BatchTaskStatus::Pending, BatchTaskEvent::Rearm)
        | (BatchTaskStatus::Completed, BatchTaskEvent::Rearm)
        | (BatchTaskStatus::Failed, BatchTaskEvent::Rearm) => BatchTaskStatus::Pending,

        (from_state, _) => {
            return Err(StateMachineError::InvalidTransition {
                from: from_state.to_string(),
                event: event.event_type().to_string(),
            })
        }
    };

    Ok(target)
}
