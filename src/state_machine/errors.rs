use thiserror::Error;

use crate::error::BatcherError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateMachineError {
    #[error("Invalid state transition from {from} on event {event}")]
    InvalidTransition { from: String, event: String },
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;

impl From<StateMachineError> for BatcherError {
    fn from(error: StateMachineError) -> Self {
        BatcherError::StateTransitionError(error.to_string())
    }
}
