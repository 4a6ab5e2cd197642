//! Creates empty up/down script pairs for a new revision.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::{LockstepError, LockstepResult};
use crate::script::{match_file_name, Direction, SCRIPT_EXTENSION};
use crate::version::Version;

/// The two files written for one revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionFiles {
    pub version: Version,
    pub up: PathBuf,
    pub down: PathBuf,
}

/// Create `<stamp>.up.<description>.psql` and its down counterpart.
///
/// `spec` is `[directory/]description`; the directory defaults to `.` and
/// must already exist. The stamp is taken from `at`, moved forward a second
/// at a time past any stamp already used by a script in the directory.
pub fn create_revision(spec: impl AsRef<Path>, at: DateTime<Utc>) -> LockstepResult<RevisionFiles> {
    let spec = spec.as_ref();
    let description = spec
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty() && !name.contains('\n'))
        .ok_or_else(|| LockstepError::InvalidDescription(spec.display().to_string()))?;

    let directory = match spec.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    if !directory.is_dir() {
        return Err(LockstepError::MissingDirectory(directory));
    }

    let version = next_free_version(&directory, at)?;
    let path_for = |direction: Direction| {
        directory.join(format!("{}.{}.{}{}", version, direction, description, SCRIPT_EXTENSION))
    };

    let up = path_for(Direction::Up);
    let down = path_for(Direction::Down);
    create_empty(&up)?;
    create_empty(&down)?;

    tracing::debug!("Scaffolded revision {} in {}", version, directory.display());

    Ok(RevisionFiles { version, up, down })
}

/// First stamp at or after `at` that no script in `directory` uses.
fn next_free_version(directory: &Path, at: DateTime<Utc>) -> LockstepResult<Version> {
    let mut used = BTreeSet::new();
    for entry in fs::read_dir(directory)? {
        let name = entry?.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(version) =
            match_file_name(name, Direction::Up).or_else(|| match_file_name(name, Direction::Down))
        {
            used.insert(version);
        }
    }

    let mut at = at;
    let mut version = Version::from_datetime(at);
    while used.contains(&version) {
        at += Duration::seconds(1);
        version = Version::from_datetime(at);
    }
    Ok(version)
}

/// Create an empty file, refusing to overwrite one that exists.
fn create_empty(path: &Path) -> LockstepResult<()> {
    OpenOptions::new().write(true).create_new(true).open(path)?;
    Ok(())
}
