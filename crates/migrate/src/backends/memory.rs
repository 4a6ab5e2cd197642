//! In-process backend
//!
//! Understands exactly the statements rendered by [`LedgerSql`] and keeps the
//! ledger in a set. Any other SQL is treated as script content: it is
//! recorded, or rejected when it contains the configured failure marker.
//! Ledger writes can be made to fail as a whole.
//! Used by the test suites to drive the engine without a database server.

use async_trait::async_trait;
use std::collections::BTreeSet;

use super::core::SqlBackend;
use crate::error::{MigrateError, MigrateResult};
use crate::migrations::definitions::LedgerConfig;
use crate::migrations::ledger::LedgerSql;

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    sql: LedgerSql,
    ledger_exists: bool,
    stamps: BTreeSet<String>,
    scripts: Vec<String>,
    statements: Vec<String>,
    fail_marker: Option<String>,
    fail_ledger_writes: bool,
}

impl MemoryBackend {
    /// Backend for the default ledger table
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend for a custom ledger table
    pub fn with_config(config: LedgerConfig) -> Self {
        Self {
            sql: LedgerSql::new(config),
            ..Self::default()
        }
    }

    /// Start with an existing ledger holding `stamps`. Values are stored
    /// as given, so a corrupt ledger can be simulated.
    pub fn with_stamps<I, S>(mut self, stamps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ledger_exists = true;
        self.stamps.extend(stamps.into_iter().map(Into::into));
        self
    }

    /// Fail any script whose SQL contains `marker`
    pub fn fail_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    /// Reject every ledger insert and delete, as a dropped connection would
    pub fn fail_ledger_writes(mut self) -> Self {
        self.fail_ledger_writes = true;
        self
    }

    pub fn ledger_exists(&self) -> bool {
        self.ledger_exists
    }

    /// Current ledger contents, ascending
    pub fn stamps(&self) -> Vec<String> {
        self.stamps.iter().cloned().collect()
    }

    /// Script SQL executed so far, in order
    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    /// Every statement received, in order
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    fn require_ledger(&self) -> MigrateResult<()> {
        if self.ledger_exists {
            Ok(())
        } else {
            Err(MigrateError::Database(format!(
                "relation \"{}\" does not exist",
                self.sql.config().table
            )))
        }
    }

    fn single_param<'a>(params: &[&'a str]) -> MigrateResult<&'a str> {
        match params {
            [value] => Ok(*value),
            _ => Err(MigrateError::Database(format!(
                "expected 1 parameter, got {}",
                params.len()
            ))),
        }
    }
}

#[async_trait]
impl SqlBackend for MemoryBackend {
    async fn execute_scalar_bool(&mut self, sql: &str) -> MigrateResult<bool> {
        self.statements.push(sql.to_string());
        if sql == self.sql.exists_sql() {
            Ok(self.ledger_exists)
        } else {
            Err(MigrateError::Database(format!("unsupported scalar query: {}", sql)))
        }
    }

    async fn execute(&mut self, sql: &str) -> MigrateResult<()> {
        self.statements.push(sql.to_string());

        if sql == self.sql.create_table_sql() {
            if self.ledger_exists {
                return Err(MigrateError::Database(format!(
                    "relation \"{}\" already exists",
                    self.sql.config().table
                )));
            }
            self.ledger_exists = true;
            return Ok(());
        }

        if let Some(marker) = &self.fail_marker {
            if sql.contains(marker.as_str()) {
                return Err(MigrateError::Database(format!("syntax error near \"{}\"", marker)));
            }
        }

        self.scripts.push(sql.to_string());
        Ok(())
    }

    async fn execute_with_params(&mut self, sql: &str, params: &[&str]) -> MigrateResult<u64> {
        self.statements.push(sql.to_string());
        self.require_ledger()?;
        if self.fail_ledger_writes {
            return Err(MigrateError::Database("connection reset".to_string()));
        }
        let value = Self::single_param(params)?;

        if sql == self.sql.insert_version_sql() {
            Ok(u64::from(self.stamps.insert(value.to_string())))
        } else if sql == self.sql.delete_version_sql() {
            Ok(u64::from(self.stamps.remove(value)))
        } else {
            Err(MigrateError::Database(format!("unsupported statement: {}", sql)))
        }
    }

    async fn query_strings(&mut self, sql: &str) -> MigrateResult<Vec<String>> {
        self.statements.push(sql.to_string());
        self.require_ledger()?;

        if sql == self.sql.select_versions_sql() {
            Ok(self.stamps())
        } else {
            Err(MigrateError::Database(format!("unsupported query: {}", sql)))
        }
    }

    async fn close(self) -> MigrateResult<()> {
        Ok(())
    }
}
