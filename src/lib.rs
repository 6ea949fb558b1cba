#![allow(clippy::doc_markdown)] // Allow technical terms like SQLite, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Batcher Core
//!
//! Single-worker batch scheduler for an external workflow execution engine.
//!
//! ## Overview
//!
//! A *batch task* holds one template document (a workflow graph keyed by node
//! id) and an ordered list of parameter overrides. The scheduler expands the
//! template once per override entry, submits each concrete document to the
//! engine, waits for it to finish, and records sub-task and batch progress in
//! a SQLite job store.
//!
//! ## Module Organization
//!
//! - [`expansion`] - Pure template expansion and the override types
//! - [`execution`] - Engine submission and completion polling
//! - [`orchestration`] - The scheduler loop and per-batch executor
//! - [`state_machine`] - Batch and sub-task statuses and allowed transitions
//! - [`models`] - Job store records and queries
//! - [`database`] - Connection pool and schema migrations
//! - [`services`] - Control-surface operations (create, trigger, list, get, delete)
//! - [`web`] - HTTP control surface
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use batcher_core::config::BatcherConfig;
//! use batcher_core::database::{DatabaseConnection, DatabaseMigrations};
//! use batcher_core::execution::EngineClient;
//! use batcher_core::orchestration::BatchScheduler;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BatcherConfig::default();
//! let db = DatabaseConnection::new(&config.database).await?;
//! DatabaseMigrations::run_all(db.pool()).await?;
//!
//! let engine = Arc::new(EngineClient::new(config.engine.clone())?);
//! let scheduler = BatchScheduler::new(
//!     db.pool().clone(),
//!     engine,
//!     config.scheduler.clone(),
//!     config.engine.completion_timeout(),
//! );
//! scheduler.start().await?;
//! // ...
//! scheduler.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod execution;
pub mod expansion;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod services;
pub mod state_machine;
pub mod web;

pub use config::{BatcherConfig, ConfigManager};
pub use error::{BatcherError, BatcherResult};
pub use execution::{CompletionOutcome, EngineClient, ExecutionEngine, JobHandle, SubmitError};
pub use expansion::{expand, BatchConfig, Document, OverrideSpec, Overrides};
pub use models::{BatchTask, SubTask};
pub use orchestration::BatchScheduler;
pub use services::BatchTaskService;
pub use state_machine::{BatchTaskStatus, SubTaskStatus};
