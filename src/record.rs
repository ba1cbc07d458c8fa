//! Migration record types
//!
//! A migration is a named, versioned unit of change with a direction and an
//! in-memory body. Records are produced by registered factories and handed to
//! [`MigrationSequence`](crate::sequence::MigrationSequence) for ordering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;
use thiserror::Error;

/// Ordering key for a migration. Versions are sparse: gaps are legal and a
/// producer need not emit every integer.
pub type Version = u64;

/// Which way a migration moves the schema.
///
/// A single version may carry zero, one, or two records — at most one per
/// direction. An up without a matching down is legal and common for
/// irreversible migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Zero-allocation string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Direction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Direction {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s: String = serde::Deserialize::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            _ => Err(ParseDirectionError(s.to_string())),
        }
    }
}

/// Error returned when a string cannot be parsed into a [`Direction`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown migration direction: '{0}'")]
pub struct ParseDirectionError(pub String);

/// Error returned when a script name does not follow the
/// `{version}_{identifier}.{direction}.{extension}` convention.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid migration script name: '{0}'")]
pub struct ParseNameError(pub String);

/// One named migration step. The body is always an in-memory string supplied
/// by the producing callback, never a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Ordering key. Need not be contiguous with other records.
    pub version: Version,

    /// Whether this record migrates forward or backward.
    pub direction: Direction,

    /// Human-readable name for logging and error messages.
    pub identifier: String,

    /// The migration body.
    pub raw: String,
}

impl MigrationRecord {
    /// Create a record with an explicit direction.
    pub fn new(
        version: Version,
        direction: Direction,
        identifier: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        Self {
            version,
            direction,
            identifier: identifier.into(),
            raw: raw.into(),
        }
    }

    /// Create a forward migration record.
    pub fn up(version: Version, identifier: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::new(version, Direction::Up, identifier, raw)
    }

    /// Create a rollback migration record.
    pub fn down(version: Version, identifier: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::new(version, Direction::Down, identifier, raw)
    }

    /// Build a record from a script name following the
    /// `{version}_{identifier}.{direction}.{extension}` convention, e.g.
    /// `1_init.up.sql` or `42_add_email.down.sql`.
    ///
    /// The version is the decimal digit run before the first `_`; the
    /// direction is the last `.up.` / `.down.` marker in the name, so an
    /// identifier may itself contain an earlier marker. Any extension is
    /// accepted and the identifier may be empty.
    pub fn from_script_name(name: &str, raw: impl Into<String>) -> Result<Self, ParseNameError> {
        let err = || ParseNameError(name.to_string());

        let (version_str, rest) = name.split_once('_').ok_or_else(err)?;
        if version_str.is_empty() || !version_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let version: Version = version_str.parse().map_err(|_| err())?;

        let (marker_pos, direction) = match (rest.rfind(".up."), rest.rfind(".down.")) {
            (Some(u), Some(d)) if d > u => (d, Direction::Down),
            (Some(u), _) => (u, Direction::Up),
            (None, Some(d)) => (d, Direction::Down),
            (None, None) => return Err(err()),
        };

        Ok(Self::new(version, direction, &rest[..marker_pos], raw))
    }
}
