//! # lockstep-migrate
//!
//! The database side of lockstep: a narrow backend contract, the version
//! ledger, and the engine that applies, reverses and diffs scripts resolved by
//! `lockstep-core`.

pub mod backends;
pub mod error;
pub mod migrations;

pub use backends::{MemoryBackend, PostgresBackend, SqlBackend};
pub use error::{MigrateError, MigrateResult};
pub use migrations::*;
