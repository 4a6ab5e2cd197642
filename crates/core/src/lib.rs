//! # lockstep-core
//!
//! Version stamps, script discovery and ordering, and configuration for the
//! lockstep migration runner. Nothing in this crate talks to a database.

pub mod config;
pub mod error;
pub mod resolver;
pub mod scaffold;
pub mod script;
pub mod version;

pub use config::{ConfigError, LockstepConfig, LogFormat};
pub use error::{LockstepError, LockstepResult};
pub use resolver::{ScriptResolver, TargetSpec};
pub use scaffold::{create_revision, RevisionFiles};
pub use script::{match_file_name, Direction, Script};
pub use version::{is_version, Version};

/// Tool name, used by the command-line interface
pub const TOOL_NAME: &str = "lockstep";
