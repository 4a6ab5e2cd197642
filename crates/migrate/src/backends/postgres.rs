//! PostgreSQL Backend Implementation
//!
//! Runs on one `sqlx` connection. Script text goes through `Executor::execute`
//! on a plain `&str`, which uses the simple query protocol, so a script may
//! hold any number of statements (including `$$`-quoted function bodies).

use async_trait::async_trait;
use sqlx::{Connection, Executor, PgConnection};

use super::core::SqlBackend;
use crate::error::{MigrateError, MigrateResult};

/// PostgreSQL backend over a single connection
pub struct PostgresBackend {
    conn: PgConnection,
}

impl PostgresBackend {
    /// Open a connection to `database_url`
    pub async fn connect(database_url: &str) -> MigrateResult<Self> {
        if !database_url.starts_with("postgresql://") && !database_url.starts_with("postgres://") {
            return Err(MigrateError::Database("Invalid PostgreSQL URL scheme".to_string()));
        }

        let conn = PgConnection::connect(database_url)
            .await
            .map_err(|e| MigrateError::Database(format!("Failed to connect to database: {}", e)))?;

        tracing::debug!("Connected to PostgreSQL");
        Ok(Self::from_connection(conn))
    }

    /// Wrap an already open connection
    pub fn from_connection(conn: PgConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SqlBackend for PostgresBackend {
    async fn execute_scalar_bool(&mut self, sql: &str) -> MigrateResult<bool> {
        let value: bool = sqlx::query_scalar(sql).fetch_one(&mut self.conn).await?;
        Ok(value)
    }

    async fn execute(&mut self, sql: &str) -> MigrateResult<()> {
        (&mut self.conn).execute(sql).await?;
        Ok(())
    }

    async fn execute_with_params(&mut self, sql: &str, params: &[&str]) -> MigrateResult<u64> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(param.to_string());
        }

        let result = query.execute(&mut self.conn).await?;
        Ok(result.rows_affected())
    }

    async fn query_strings(&mut self, sql: &str) -> MigrateResult<Vec<String>> {
        let values: Vec<String> = sqlx::query_scalar(sql).fetch_all(&mut self.conn).await?;
        Ok(values)
    }

    async fn close(self) -> MigrateResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| MigrateError::Database(format!("Failed to close connection: {}", e)))
    }
}
