//! Migration scripts and the file naming grammar
//!
//! A script file is named `<version>.<direction>[.<description>].psql`, where
//! `<direction>` is `up` or `down`. Files that don't follow the grammar are not
//! scripts and are ignored by the resolver.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::LockstepResult;
use crate::version::{is_version, Version, VERSION_LEN};

/// File extension shared by every script.
pub const SCRIPT_EXTENSION: &str = ".psql";

/// Which way a script moves the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// The direction token used in file names.
    pub fn token(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    /// Natural execution order for this direction: ascending for up,
    /// descending for down.
    pub fn execution_order(self) -> fn(&Version, &Version) -> Ordering {
        match self {
            Direction::Up => ascending,
            Direction::Down => descending,
        }
    }

    /// Whether a script at `version` may run when the target is `boundary`.
    ///
    /// Up is inclusive (`version <= boundary`); down is exclusive
    /// (`version > boundary`) so that rolling down to `T` leaves `T` applied.
    pub fn within_boundary(self, version: &Version, boundary: Option<&Version>) -> bool {
        match (self, boundary) {
            (_, None) => true,
            (Direction::Up, Some(target)) => version <= target,
            (Direction::Down, Some(target)) => version > target,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

fn ascending(a: &Version, b: &Version) -> Ordering {
    a.cmp(b)
}

fn descending(a: &Version, b: &Version) -> Ordering {
    b.cmp(a)
}

/// Check a bare file name against the grammar for `direction`.
///
/// Returns the version prefix on a match. Equivalent to
/// `^\d{14}\.<direction>(\..*)?\.psql$` where `.` excludes newlines.
pub fn match_file_name(file_name: &str, direction: Direction) -> Option<Version> {
    let stamp = file_name.get(..VERSION_LEN)?;
    if !is_version(stamp) {
        return None;
    }

    let rest = file_name[VERSION_LEN..]
        .strip_prefix('.')?
        .strip_prefix(direction.token())?;

    if rest.contains('\n') {
        return None;
    }

    let matches = rest == SCRIPT_EXTENSION
        || (rest.len() > SCRIPT_EXTENSION.len()
            && rest.starts_with('.')
            && rest.ends_with(SCRIPT_EXTENSION));

    if matches {
        Version::parse(stamp).ok()
    } else {
        None
    }
}

/// One migration file for one direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Script {
    pub version: Version,
    pub direction: Direction,
    pub file_path: PathBuf,
    pub file_name: String,
}

impl Script {
    /// Build a script from a path, or `None` when its name isn't a
    /// `direction` script.
    pub fn from_path(path: &Path, direction: Direction) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?;
        let version = match_file_name(file_name, direction)?;

        Some(Self {
            version,
            direction,
            file_path: path.to_path_buf(),
            file_name: file_name.to_string(),
        })
    }

    /// Read the SQL text of the script.
    pub fn read(&self) -> LockstepResult<String> {
        Ok(fs::read_to_string(&self.file_path)?)
    }

    /// See [`Direction::within_boundary`].
    pub fn is_runnable_with_target(&self, boundary: Option<&Version>) -> bool {
        self.direction.within_boundary(&self.version, boundary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_up_names() {
        assert_eq!(match_file_name("20240101000000.up.psql", Direction::Up), Some(v("20240101000000")));
        assert_eq!(
            match_file_name("20240101000000.up.create_users.psql", Direction::Up),
            Some(v("20240101000000"))
        );
        assert_eq!(
            match_file_name("20240101000000.up.a.b.c.psql", Direction::Up),
            Some(v("20240101000000"))
        );
        assert!(match_file_name("20240101000000.up..psql", Direction::Up).is_some());
    }

    #[test]
    fn test_down_names() {
        assert!(match_file_name("20240101000000.down.psql", Direction::Down).is_some());
        assert!(match_file_name("20240101000000.down.drop_users.psql", Direction::Down).is_some());
        assert!(match_file_name("20240101000000.down.psql", Direction::Up).is_none());
        assert!(match_file_name("20240101000000.up.psql", Direction::Down).is_none());
    }

    #[test]
    fn test_malformed_names_are_rejected() {
        let names = [
            "2024010100000.up.psql",
            "202401010000000.up.psql",
            "20240101000000.up.sql",
            "20240101000000.up",
            "20240101000000.sideways.psql",
            "20240101000000.upx.psql",
            "20240101000000.up.psqlx",
            "20240101000000_up.psql",
            "x20240101000000.up.psql",
            "20240101000000.up.bad\nname.psql",
            "README.md",
            "",
        ];

        for name in names {
            assert!(match_file_name(name, Direction::Up).is_none(), "{:?} should not match", name);
            assert!(match_file_name(name, Direction::Down).is_none(), "{:?} should not match", name);
        }
    }

    #[test]
    fn test_multibyte_names_do_not_panic() {
        assert!(match_file_name("é2024010100000.up.psql", Direction::Up).is_none());
        assert!(match_file_name("ééééééé", Direction::Up).is_none());
    }

    #[test]
    fn test_boundary_rules() {
        let target = v("20240102000000");
        let before = v("20240101000000");
        let after = v("20240103000000");

        assert!(Direction::Up.within_boundary(&before, Some(&target)));
        assert!(Direction::Up.within_boundary(&target, Some(&target)));
        assert!(!Direction::Up.within_boundary(&after, Some(&target)));

        assert!(!Direction::Down.within_boundary(&before, Some(&target)));
        assert!(!Direction::Down.within_boundary(&target, Some(&target)));
        assert!(Direction::Down.within_boundary(&after, Some(&target)));

        assert!(Direction::Up.within_boundary(&after, None));
        assert!(Direction::Down.within_boundary(&before, None));
    }

    #[test]
    fn test_execution_order_per_direction() {
        let a = v("20240101000000");
        let b = v("20240102000000");
        assert_eq!((Direction::Up.execution_order())(&a, &b), Ordering::Less);
        assert_eq!((Direction::Down.execution_order())(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_from_path() {
        let script = Script::from_path(Path::new("db/20240101000000.up.init.psql"), Direction::Up).unwrap();
        assert_eq!(script.file_name, "20240101000000.up.init.psql");
        assert_eq!(script.version, v("20240101000000"));
        assert_eq!(script.file_path, PathBuf::from("db/20240101000000.up.init.psql"));
        assert!(Script::from_path(Path::new("db/notes.txt"), Direction::Up).is_none());
    }
}
