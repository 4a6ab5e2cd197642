use crate::config::{is_sql_identifier, ConfigError};
use std::env;
use std::str::FromStr;

/// Default ledger table name
pub const DEFAULT_TABLE: &str = "__lockstep";

/// Default schema holding the ledger table
pub const DEFAULT_SCHEMA: &str = "public";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::invalid_value("log_format", s, "text or json")),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Runner configuration.
///
/// Values come from defaults, then `LOCKSTEP_*` environment variables, then
/// whatever the caller sets explicitly.
#[derive(Debug, Clone)]
pub struct LockstepConfig {
    pub database_url: Option<String>,
    pub table: String,
    pub schema: String,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl LockstepConfig {
    /// Create a configuration holding only defaults
    pub fn new() -> Self {
        Self {
            database_url: None,
            table: DEFAULT_TABLE.to_string(),
            schema: DEFAULT_SCHEMA.to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Values are not validated here, so callers can apply overrides first
    /// and then call [`LockstepConfig::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new();

        // Database URL, tool-specific variable first
        for var in ["LOCKSTEP_DATABASE_URL", "DATABASE_URL"] {
            if let Ok(url) = env::var(var) {
                config.database_url = Some(url);
                break;
            }
        }

        if let Ok(table) = env::var("LOCKSTEP_TABLE") {
            config.table = table;
        }

        if let Ok(schema) = env::var("LOCKSTEP_SCHEMA") {
            config.schema = schema;
        }

        if let Ok(log_level) = env::var("LOCKSTEP_LOG_LEVEL") {
            config.log_level = log_level.to_lowercase();
        }

        if let Ok(log_format) = env::var("LOCKSTEP_LOG_FORMAT") {
            config.log_format = log_format.parse()?;
        }

        Ok(config)
    }

    /// Override the database URL
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Override the ledger table name
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Override the ledger schema
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.database_url {
            if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                return Err(ConfigError::invalid_value(
                    "database_url",
                    url,
                    "a postgres:// or postgresql:// URL",
                ));
            }
        }

        for (field, value) in [("table", &self.table), ("schema", &self.schema)] {
            if !is_sql_identifier(value) {
                return Err(ConfigError::invalid_value(
                    field,
                    value,
                    "a plain SQL identifier (letters, digits, underscores)",
                ));
            }
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(ConfigError::invalid_value(
                "log_level",
                &self.log_level,
                format!("one of: {}", valid_levels.join(", ")),
            ));
        }

        Ok(())
    }

    /// The database URL, or an error naming where to set it
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url.as_deref().ok_or_else(|| {
            ConfigError::missing_required(
                "database_url",
                "Pass --database-url or set LOCKSTEP_DATABASE_URL",
            )
        })
    }
}

impl Default for LockstepConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 6] = [
        "LOCKSTEP_DATABASE_URL",
        "DATABASE_URL",
        "LOCKSTEP_TABLE",
        "LOCKSTEP_SCHEMA",
        "LOCKSTEP_LOG_LEVEL",
        "LOCKSTEP_LOG_FORMAT",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_from_empty_env() {
        clear_env();
        let config = LockstepConfig::from_env().unwrap();
        assert_eq!(config.table, "__lockstep");
        assert_eq!(config.schema, "public");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
        assert!(config.require_database_url().is_err());
    }

    #[test]
    #[serial]
    fn test_tool_variable_wins_over_generic_url() {
        clear_env();
        env::set_var("DATABASE_URL", "postgres://generic/db");
        env::set_var("LOCKSTEP_DATABASE_URL", "postgres://specific/db");
        env::set_var("LOCKSTEP_TABLE", "schema_versions");
        env::set_var("LOCKSTEP_LOG_FORMAT", "json");

        let config = LockstepConfig::from_env().unwrap();
        assert_eq!(config.require_database_url().unwrap(), "postgres://specific/db");
        assert_eq!(config.table, "schema_versions");
        assert_eq!(config.log_format, LogFormat::Json);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_env_values_are_rejected() {
        clear_env();
        env::set_var("LOCKSTEP_TABLE", "bad; drop");
        let config = LockstepConfig::from_env().unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "table"
        ));

        clear_env();
        env::set_var("LOCKSTEP_DATABASE_URL", "mysql://localhost/db");
        assert!(LockstepConfig::from_env().unwrap().validate().is_err());

        clear_env();
        env::set_var("LOCKSTEP_LOG_FORMAT", "xml");
        assert!(LockstepConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_override_replaces_foreign_env_url_before_validation() {
        clear_env();
        env::set_var("DATABASE_URL", "mysql://other-tool/db");

        let config = LockstepConfig::from_env()
            .unwrap()
            .with_database_url("postgres://localhost/app");
        assert!(config.validate().is_ok());
        assert_eq!(config.require_database_url().unwrap(), "postgres://localhost/app");
        clear_env();
    }

    #[test]
    fn test_programmatic_overrides() {
        let config = LockstepConfig::new()
            .with_database_url("postgresql://localhost/app")
            .with_table("versions")
            .with_schema("meta");
        assert!(config.validate().is_ok());
        assert_eq!(config.schema, "meta");
    }
}
