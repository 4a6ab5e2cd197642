//! Script Resolver - turns a path specification into an ordered script list
//!
//! The path is either a directory (run everything in it) or
//! `<directory>/<version>`, which bounds the run at that version.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LockstepError, LockstepResult};
use crate::script::{Direction, Script};
use crate::version::Version;

/// Where to look for scripts and how far to go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// Every script in the directory.
    Unbounded { directory: PathBuf },
    /// Scripts in the directory, cut off at `version`.
    Bounded { directory: PathBuf, version: Version },
}

impl TargetSpec {
    /// Interpret a path argument.
    ///
    /// An existing directory is unbounded. Anything else must end in a valid
    /// version; the remaining prefix (or `.`) is the directory to scan.
    pub fn parse(path: impl AsRef<Path>) -> LockstepResult<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            return Ok(Self::Unbounded {
                directory: path.to_path_buf(),
            });
        }

        let segment = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| LockstepError::invalid_target(path.display().to_string()))?;

        let version = Version::parse(segment).map_err(|_| LockstepError::invalid_target(segment))?;

        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Self::Bounded { directory, version })
    }

    pub fn directory(&self) -> &Path {
        match self {
            Self::Unbounded { directory } | Self::Bounded { directory, .. } => directory,
        }
    }

    pub fn boundary(&self) -> Option<&Version> {
        match self {
            Self::Unbounded { .. } => None,
            Self::Bounded { version, .. } => Some(version),
        }
    }
}

/// Discovers and orders scripts for one direction.
#[derive(Debug, Clone)]
pub struct ScriptResolver {
    direction: Direction,
}

impl ScriptResolver {
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }

    /// Parse `path` and resolve it. See [`ScriptResolver::resolve_target`].
    pub fn resolve(&self, path: impl AsRef<Path>) -> LockstepResult<Vec<Script>> {
        let target = TargetSpec::parse(path)?;
        self.resolve_target(&target)
    }

    /// List the target directory and return the runnable scripts in execution
    /// order.
    ///
    /// Files not named like a script for this direction are skipped. Two
    /// scripts of this direction with the same version are an error, since
    /// their relative order would be arbitrary.
    pub fn resolve_target(&self, target: &TargetSpec) -> LockstepResult<Vec<Script>> {
        let directory = target.directory();
        if !directory.is_dir() {
            return Err(LockstepError::MissingDirectory(directory.to_path_buf()));
        }

        let boundary = target.boundary();
        let mut scripts = Vec::new();

        for entry in fs::read_dir(directory)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }

            match Script::from_path(&path, self.direction) {
                Some(script) if script.is_runnable_with_target(boundary) => scripts.push(script),
                Some(script) => {
                    tracing::debug!("{} is beyond the target, not runnable", script.file_name);
                }
                None => {
                    tracing::trace!("Ignoring {}", path.display());
                }
            }
        }

        let order = self.direction.execution_order();
        scripts.sort_by(|a, b| order(&a.version, &b.version).then_with(|| a.file_name.cmp(&b.file_name)));

        if let Some(pair) = scripts.windows(2).find(|pair| pair[0].version == pair[1].version) {
            return Err(LockstepError::DuplicateScriptVersion {
                version: pair[0].version.to_string(),
                first: pair[0].file_name.clone(),
                second: pair[1].file_name.clone(),
            });
        }

        tracing::debug!(
            "Resolved {} {} script(s) in {}",
            scripts.len(),
            self.direction,
            directory.display()
        );

        Ok(scripts)
    }
}
