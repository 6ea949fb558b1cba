//! # Services
//!
//! Control-surface operations over the job store: create, trigger, list,
//! get and delete batch tasks.

pub mod batch_task_service;

pub use batch_task_service::{
    parse_batch_config, BatchTaskDetail, BatchTaskService, DEFAULT_BATCH_NAME,
};
