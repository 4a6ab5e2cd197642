//! Database Backend Abstractions
//!
//! The engine only needs a handful of operations from a database, captured by
//! [`SqlBackend`]. `postgres` is the real implementation; `memory` emulates
//! the ledger statements in process and records everything else.

pub mod core;
pub mod memory;
pub mod postgres;

pub use core::*;
pub use memory::MemoryBackend;
pub use postgres::PostgresBackend;
