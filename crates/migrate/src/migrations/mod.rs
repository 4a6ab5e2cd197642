//! Migration System
//!
//! `ledger` tracks applied versions, `engine` reconciles scripts on disk
//! against it, `definitions` holds the reports both produce.

pub mod definitions;
pub mod engine;
pub mod ledger;

pub use definitions::*;
pub use engine::{compute_diff, MigrationEngine};
pub use ledger::{Ledger, LedgerSql};
