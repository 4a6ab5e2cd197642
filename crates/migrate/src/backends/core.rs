//! Core Database Backend Trait

use async_trait::async_trait;

use crate::error::MigrateResult;

/// The narrow contract the engine consumes from a SQL backend.
///
/// Calls are issued one at a time over a single connection; implementations
/// need not support overlapping use.
#[async_trait]
pub trait SqlBackend: Send {
    /// Run a query returning a single boolean, e.g. an existence check
    async fn execute_scalar_bool(&mut self, sql: &str) -> MigrateResult<bool>;

    /// Run SQL text with no result. May contain several statements.
    async fn execute(&mut self, sql: &str) -> MigrateResult<()>;

    /// Run a single parameterized statement and return the affected row count
    async fn execute_with_params(&mut self, sql: &str, params: &[&str]) -> MigrateResult<u64>;

    /// Run a query whose first column is text and collect it
    async fn query_strings(&mut self, sql: &str) -> MigrateResult<Vec<String>>;

    /// Release the connection
    async fn close(self) -> MigrateResult<()>;
}
