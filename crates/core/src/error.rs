use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while validating versions and resolving scripts
#[derive(Debug, Error)]
pub enum LockstepError {
    #[error("{value:?} is not a valid version. Valid versions have 14 digits and represent a UTC date in the form YYYYMMDDHHmmss.")]
    InvalidVersionFormat { value: String },

    #[error("{target:?} is not a valid database revision stamp. Valid stamps have 14 digits and represent a UTC date in the form YYYYMMDDHHmmss.")]
    InvalidTargetVersion { target: String },

    #[error("Scripts {first} and {second} share version {version}; their order is undefined")]
    DuplicateScriptVersion {
        version: String,
        first: String,
        second: String,
    },

    #[error("{0:?} does not name a revision; expected [directory/]description")]
    InvalidDescription(String),

    #[error("Directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LockstepError {
    pub fn invalid_version(value: impl Into<String>) -> Self {
        Self::InvalidVersionFormat {
            value: value.into(),
        }
    }

    pub fn invalid_target(target: impl Into<String>) -> Self {
        Self::InvalidTargetVersion {
            target: target.into(),
        }
    }
}

pub type LockstepResult<T> = Result<T, LockstepError>;
