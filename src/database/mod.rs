//! # Database Operations
//!
//! SQLite-backed persistence for batch tasks and their sub-tasks.
//!
//! ## Key Components
//!
//! - [`connection`] - Pool construction and health checks
//! - [`migrations`] - Embedded, versioned schema migrations
//!
//! Record types and their queries live in [`crate::models`].
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use batcher_core::config::DatabaseConfig;
//! use batcher_core::database::{DatabaseConnection, DatabaseMigrations};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseConnection::new(&DatabaseConfig::default()).await?;
//! DatabaseMigrations::run_all(db.pool()).await?;
//! assert!(db.health_check().await?);
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod migrations;

pub use connection::DatabaseConnection;
pub use migrations::{DatabaseMigrations, Migration};
