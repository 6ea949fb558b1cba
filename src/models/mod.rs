//! # Job Store Models
//!
//! Row types for the `batch_tasks` and `sub_tasks` tables, each with its
//! queries as associated async functions taking a `SqlitePool`.

pub mod batch_task;
pub mod sub_task;

pub use batch_task::{BatchTask, NewBatchTask};
pub use sub_task::SubTask;
