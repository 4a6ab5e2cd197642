//! Migration Definitions - types shared by the ledger, engine and callers

use lockstep_core::config::{DEFAULT_SCHEMA, DEFAULT_TABLE};
use lockstep_core::{Direction, LockstepConfig, Version};
use serde::Serialize;
use std::fmt;

/// Where the ledger lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Schema holding the ledger table
    pub schema: String,
    /// Ledger table name
    pub table: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            schema: DEFAULT_SCHEMA.to_string(),
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

impl From<&LockstepConfig> for LedgerConfig {
    fn from(config: &LockstepConfig) -> Self {
        Self {
            schema: config.schema.clone(),
            table: config.table.clone(),
        }
    }
}

/// Why a script was skipped mid-run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Up run met a script the ledger already records
    AlreadyApplied,
    /// Down run met a script whose up half was never recorded
    NeverApplied,
}

/// A non-fatal ledger inconsistency noticed after the run started changing
/// the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerWarning {
    pub kind: WarningKind,
    pub version: Version,
    pub file_name: String,
}

impl fmt::Display for LedgerWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            WarningKind::AlreadyApplied => write!(
                f,
                "WARNING: {} was previously executed. It was skipped.",
                self.file_name
            ),
            WarningKind::NeverApplied => write!(
                f,
                "WARNING: The up script corresponding to {} was not previously executed. {} was therefore skipped.",
                self.file_name, self.file_name
            ),
        }
    }
}

/// Progress of a run, in the order things happen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// About to send a script's SQL to the database
    Running { file_name: String, sql: String },
    /// Script executed and the ledger updated
    Completed { file_name: String, version: Version },
    /// Script skipped because the ledger disagrees with the files
    Warning(LedgerWarning),
}

impl fmt::Display for RunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunEvent::Running { file_name, sql } => write!(f, "Running {}:\n{}", file_name, sql),
            RunEvent::Completed { file_name, .. } => write!(f, "Completed {}:", file_name),
            RunEvent::Warning(warning) => warning.fmt(f),
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub direction: Direction,
    /// Versions applied (up) or reversed (down), in execution order
    pub changed: Vec<Version>,
    pub warnings: Vec<LedgerWarning>,
    pub events: Vec<RunEvent>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl RunReport {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            changed: Vec::new(),
            warnings: Vec::new(),
            events: Vec::new(),
            execution_time_ms: 0,
        }
    }

    /// Nothing was pending
    pub fn is_noop(&self) -> bool {
        self.changed.is_empty()
    }
}

/// Result of comparing the ledger with the scripts on disk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    /// Applied versions with no up script on disk
    pub orphans: Vec<Version>,
    /// File names of up scripts not yet applied
    pub pending: Vec<String>,
    /// `"! <version>"` and `"+ <file name>"` lines, sorted
    pub lines: Vec<String>,
}

impl DiffReport {
    /// Build the report; `lines` is derived from the two sets.
    pub fn new(orphans: Vec<Version>, pending: Vec<String>) -> Self {
        let mut lines: Vec<String> = orphans
            .iter()
            .map(|version| format!("! {}", version))
            .chain(pending.iter().map(|file_name| format!("+ {}", file_name)))
            .collect();
        lines.sort();
        lines.dedup();

        Self { orphans, pending, lines }
    }

    /// Ledger and files agree
    pub fn is_clean(&self) -> bool {
        self.lines.is_empty()
    }
}
