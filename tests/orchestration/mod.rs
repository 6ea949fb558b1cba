//! Scheduler Loop Integration Tests
//!
//! Drive the scheduler against a scripted engine and an isolated SQLite store.

pub mod batch_execution_test;
