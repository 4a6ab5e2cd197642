//! Revision stamps
//!
//! A [`Version`] is a 14 digit `YYYYMMDDHHmmss` UTC stamp. Because the format
//! is fixed width and zero padded, comparing two stamps as strings gives the
//! same answer as comparing the instants they name.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{LockstepError, LockstepResult};

/// Number of digits in a stamp.
pub const VERSION_LEN: usize = 14;

const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Returns true when `s` is exactly 14 ASCII digits.
pub fn is_version(s: &str) -> bool {
    s.len() == VERSION_LEN && s.bytes().all(|b| b.is_ascii_digit())
}

/// A validated revision stamp.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version(String);

impl Version {
    /// Parse a stamp, failing with `InvalidVersionFormat` unless it is 14 digits.
    pub fn parse(s: &str) -> LockstepResult<Self> {
        if is_version(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(LockstepError::invalid_version(s))
        }
    }

    /// Stamp for the given instant, truncated to whole seconds.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.format(STAMP_FORMAT).to_string())
    }

    /// Interpret the stamp as an instant.
    ///
    /// Stamps are only checked for shape, so this is `None` for digit strings
    /// that are not real dates (e.g. month 13).
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.0, STAMP_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Version {
    type Err = LockstepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = LockstepError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_version(&value) {
            Ok(Self(value))
        } else {
            Err(LockstepError::InvalidVersionFormat { value })
        }
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.0
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cmp::Ordering;

    #[test]
    fn test_parse_accepts_fourteen_digits() {
        let version = Version::parse("20240131235959").unwrap();
        assert_eq!(version.as_str(), "20240131235959");
        assert_eq!(version.to_string(), "20240131235959");
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        for bad in ["", "2024013123595", "202401312359590", "2024013123595a", " 20240131235959", "２０２４０１３１２３５９５９"] {
            match Version::parse(bad) {
                Err(LockstepError::InvalidVersionFormat { value }) => assert_eq!(value, bad),
                other => panic!("expected InvalidVersionFormat for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_ordering_matches_chronology() {
        let instants = [
            Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap(),
            Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 1).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 9, 8, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap(),
        ];

        for a in &instants {
            for b in &instants {
                let va = Version::from_datetime(*a);
                let vb = Version::from_datetime(*b);
                assert_eq!(va.cmp(&vb), a.cmp(b), "{} vs {}", va, vb);
            }
        }
    }

    #[test]
    fn test_compare_is_lexicographic() {
        let a = Version::parse("20240101000000").unwrap();
        let b = Version::parse("20240101000001").unwrap();
        assert_eq!(a.cmp(&b), Ordering::Less);
        assert_eq!(b.cmp(&a), Ordering::Greater);
        assert_eq!(a.cmp(&a.clone()), Ordering::Equal);
    }

    #[test]
    fn test_datetime_round_trip() {
        let at = Utc.with_ymd_and_hms(2023, 7, 4, 12, 30, 5).unwrap();
        let version = Version::from_datetime(at);
        assert_eq!(version.as_str(), "20230704123005");
        assert_eq!(version.to_datetime(), Some(at));
    }

    #[test]
    fn test_to_datetime_is_none_for_impossible_dates() {
        let version = Version::parse("20241399000000").unwrap();
        assert!(version.to_datetime().is_none());
    }

    #[test]
    fn test_serde_validates() {
        let version: Version = serde_json::from_str("\"20240101000000\"").unwrap();
        assert_eq!(version.as_str(), "20240101000000");
        assert!(serde_json::from_str::<Version>("\"2024\"").is_err());
        assert_eq!(serde_json::to_string(&version).unwrap(), "\"20240101000000\"");
    }
}
