//! Engine Client Integration Tests
//!
//! Exercise [`EngineClient`](batcher_core::execution::EngineClient) against a
//! local fake of the engine's job API.
