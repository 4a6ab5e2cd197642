//! Ledger - the persisted set of applied versions
//!
//! One table, one row per applied version:
//!
//! ```sql
//! CREATE TABLE "public"."__lockstep" (
//!     stamp TEXT NOT NULL PRIMARY KEY CHECK (stamp ~ '^[0-9]{14}$'),
//!     timestamp TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
//! );
//! ```

use std::collections::BTreeSet;

use lockstep_core::Version;

use super::definitions::LedgerConfig;
use crate::backends::SqlBackend;
use crate::error::{MigrateError, MigrateResult};

/// The statements the ledger issues, rendered for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerSql {
    config: LedgerConfig,
}

impl LedgerSql {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn qualified_table(&self) -> String {
        format!(
            "{}.{}",
            quote_identifier(&self.config.schema),
            quote_identifier(&self.config.table)
        )
    }

    /// SQL returning true when the ledger table exists
    pub fn exists_sql(&self) -> String {
        format!(
            "SELECT COUNT(*) = 1 FROM information_schema.tables WHERE table_schema = {} AND table_name = {}",
            quote_literal(&self.config.schema),
            quote_literal(&self.config.table)
        )
    }

    /// SQL to create the ledger table
    pub fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE {} (\n    \
                stamp TEXT NOT NULL PRIMARY KEY CHECK (stamp ~ '^[0-9]{{14}}$'),\n    \
                timestamp TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP\n\
            )",
            self.qualified_table()
        )
    }

    /// SQL to list applied versions, ascending
    pub fn select_versions_sql(&self) -> String {
        format!("SELECT stamp FROM {} ORDER BY stamp", self.qualified_table())
    }

    /// SQL to record a version as applied; affects no rows when already present
    pub fn insert_version_sql(&self) -> String {
        format!(
            "INSERT INTO {} (stamp) VALUES ($1) ON CONFLICT (stamp) DO NOTHING",
            self.qualified_table()
        )
    }

    /// SQL to remove a version
    pub fn delete_version_sql(&self) -> String {
        format!("DELETE FROM {} WHERE stamp = $1", self.qualified_table())
    }
}

impl Default for LedgerSql {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Ledger operations over a backend it owns.
///
/// The engine executes scripts through [`Ledger::backend_mut`] so that ledger
/// writes and script SQL share one connection.
pub struct Ledger<B> {
    backend: B,
    sql: LedgerSql,
}

impl<B: SqlBackend> Ledger<B> {
    pub fn new(backend: B, config: LedgerConfig) -> Self {
        Self {
            backend,
            sql: LedgerSql::new(config),
        }
    }

    pub fn sql(&self) -> &LedgerSql {
        &self.sql
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Create the ledger table if it doesn't exist yet
    pub async fn ensure_initialized(&mut self) -> MigrateResult<()> {
        let exists = self.backend.execute_scalar_bool(&self.sql.exists_sql()).await?;
        if !exists {
            tracing::info!("Creating ledger table {}", self.sql.qualified_table());
            self.backend.execute(&self.sql.create_table_sql()).await?;
        }
        Ok(())
    }

    /// Applied versions, ascending
    pub async fn applied_versions(&mut self) -> MigrateResult<BTreeSet<Version>> {
        let stamps = self.backend.query_strings(&self.sql.select_versions_sql()).await?;
        let mut versions = BTreeSet::new();
        for stamp in stamps {
            versions.insert(Version::try_from(stamp)?);
        }
        Ok(versions)
    }

    /// Record `version` as applied
    pub async fn record_applied(&mut self, version: &Version) -> MigrateResult<()> {
        let inserted = self
            .backend
            .execute_with_params(&self.sql.insert_version_sql(), &[version.as_str()])
            .await?;

        if inserted == 0 {
            return Err(MigrateError::DuplicateVersion(version.to_string()));
        }
        Ok(())
    }

    /// Remove `version`. Returns whether a row was deleted.
    pub async fn record_reversed(&mut self, version: &Version) -> MigrateResult<bool> {
        let deleted = self
            .backend
            .execute_with_params(&self.sql.delete_version_sql(), &[version.as_str()])
            .await?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryBackend;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_ledger_sql_generation() {
        let sql = LedgerSql::default();

        let create = sql.create_table_sql();
        assert!(create.starts_with("CREATE TABLE \"public\".\"__lockstep\""));
        assert!(create.contains("stamp TEXT NOT NULL PRIMARY KEY CHECK (stamp ~ '^[0-9]{14}$')"));
        assert!(create.contains("timestamp TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP"));

        assert_eq!(
            sql.exists_sql(),
            "SELECT COUNT(*) = 1 FROM information_schema.tables WHERE table_schema = 'public' AND table_name = '__lockstep'"
        );
        assert_eq!(sql.select_versions_sql(), "SELECT stamp FROM \"public\".\"__lockstep\" ORDER BY stamp");
        assert!(sql.insert_version_sql().contains("VALUES ($1)"));
        assert_eq!(sql.delete_version_sql(), "DELETE FROM \"public\".\"__lockstep\" WHERE stamp = $1");
    }

    #[test]
    fn test_custom_table() {
        let sql = LedgerSql::new(LedgerConfig {
            schema: "meta".to_string(),
            table: "versions".to_string(),
        });
        assert!(sql.select_versions_sql().contains("\"meta\".\"versions\""));
        assert!(sql.exists_sql().contains("table_schema = 'meta' AND table_name = 'versions'"));
    }

    #[tokio::test]
    async fn test_ensure_initialized_is_idempotent() {
        let mut ledger = Ledger::new(MemoryBackend::new(), LedgerConfig::default());
        ledger.ensure_initialized().await.unwrap();
        ledger.ensure_initialized().await.unwrap();

        let creates = ledger
            .backend()
            .statements()
            .iter()
            .filter(|s| s.starts_with("CREATE TABLE"))
            .count();
        assert_eq!(creates, 1);
        assert!(ledger.backend().ledger_exists());
    }

    #[tokio::test]
    async fn test_record_and_list() {
        let mut ledger = Ledger::new(MemoryBackend::new(), LedgerConfig::default());
        ledger.ensure_initialized().await.unwrap();

        ledger.record_applied(&v("20240101000020")).await.unwrap();
        ledger.record_applied(&v("20240101000010")).await.unwrap();

        let applied: Vec<_> = ledger.applied_versions().await.unwrap().into_iter().collect();
        assert_eq!(applied, [v("20240101000010"), v("20240101000020")]);

        assert!(ledger.record_reversed(&v("20240101000010")).await.unwrap());
        assert!(!ledger.record_reversed(&v("20240101000010")).await.unwrap());
        assert_eq!(ledger.applied_versions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let mut ledger = Ledger::new(MemoryBackend::new(), LedgerConfig::default());
        ledger.ensure_initialized().await.unwrap();
        ledger.record_applied(&v("20240101000010")).await.unwrap();

        match ledger.record_applied(&v("20240101000010")).await {
            Err(MigrateError::DuplicateVersion(version)) => assert_eq!(version, "20240101000010"),
            other => panic!("expected DuplicateVersion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_stored_stamp() {
        let backend = MemoryBackend::new().with_stamps(["2024"]);
        let mut ledger = Ledger::new(backend, LedgerConfig::default());

        match ledger.applied_versions().await {
            Err(MigrateError::Core(lockstep_core::LockstepError::InvalidVersionFormat { value })) => {
                assert_eq!(value, "2024")
            }
            other => panic!("expected InvalidVersionFormat, got {:?}", other),
        }
    }
}
