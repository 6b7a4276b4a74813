//! Persistence for collected telemetry
//!
//! This module provides a trait-based abstraction for storing operational
//! records and health snapshots.
//!
//! ## Design
//!
//! - **Trait-based**: `TelemetryStore` allows swapping implementations
//! - **Async**: all operations are async for compatibility with the
//!   tokio-based collector
//! - **Single writer**: the collection cycle is the only writer; external
//!   readers (dashboards) may query while an append is in flight, which the
//!   SQLite backend supports through WAL journaling
//!
//! ## Semantics
//!
//! - Operational records are appended idempotently: a record already known
//!   under its natural key `(service_id, client_id, request_timestamp)` is
//!   silently skipped.
//! - Health snapshots are appended unconditionally; each one is a new
//!   point-in-time fact.
//! - The core never deletes persisted telemetry; retention is an external
//!   concern.

pub mod error;
pub mod sqlite;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use sqlite::SqliteStore;
pub use store::{ResponseTimePoint, StatusCounts, TelemetryStore};
