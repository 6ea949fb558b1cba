//! # Execution Client
//!
//! Submission of concrete job documents to the external engine and polling
//! for their terminal status. [`ExecutionEngine`] is the seam the scheduler
//! depends on; [`EngineClient`] is the HTTP implementation.

pub mod client;
pub mod engine;

pub use client::{interpret_history, EngineClient};
pub use engine::{CompletionOutcome, ExecutionEngine, JobHandle, SubmitError};
