// Batch and sub-task lifecycle states plus the transition table the
// scheduler and control surface both consult before writing a status.

pub mod batch_state_machine;
pub mod errors;
pub mod events;
pub mod states;

pub use batch_state_machine::determine_target_state;
pub use errors::{StateMachineError, StateMachineResult};
pub use events::BatchTaskEvent;
pub use states::{BatchTaskStatus, SubTaskStatus};
