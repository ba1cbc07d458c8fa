//! Code-backed migration source
//!
//! The consumer-facing adapter: translates an open request into a registry
//! lookup, runs the producer, builds the ordered sequence, and re-exposes
//! its navigation under the contract a migration engine drives.

use std::fmt;
use std::io::{Cursor, Read};

use thiserror::Error;

use crate::record::{MigrationRecord, Version};
use crate::registry::{FactoryNotFound, FactoryRegistry, ProducerError};
use crate::sequence::{DuplicateMigration, MigrationSequence};

/// URL scheme addressing code-backed sources, as in `code://billing`.
pub const SCHEME: &str = "code";

/// An in-memory reader over a migration body, plus its identifier.
pub type Script = (Box<dyn Read + Send>, String);

/// Navigation operation behind a [`SourceError::NotFound`] outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOp {
    First,
    Prev(Version),
    Next(Version),
    ReadUp(Version),
    ReadDown(Version),
}

impl fmt::Display for NavOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            NavOp::First => f.write_str("first"),
            NavOp::Prev(v) => write!(f, "prev from version {v}"),
            NavOp::Next(v) => write!(f, "next from version {v}"),
            NavOp::ReadUp(v) => write!(f, "read up version {v}"),
            NavOp::ReadDown(v) => write!(f, "read down version {v}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    /// The open URL does not address a `code:` factory.
    #[error("invalid code source url: '{url}'")]
    InvalidUrl { url: String },

    /// The open request named a factory nobody registered.
    #[error(transparent)]
    FactoryNotFound(#[from] FactoryNotFound),

    /// The registered producer failed while generating its batch.
    #[error("migration factory '{key}' failed: {source}")]
    Producer {
        key: String,
        #[source]
        source: ProducerError,
    },

    /// Two produced records collided on the same (version, direction) pair.
    #[error(transparent)]
    Duplicate(#[from] DuplicateMigration),

    /// No qualifying migration for a navigation call. This is the expected
    /// signal that the engine stepped past either end of the sequence, or
    /// asked for a direction the version does not carry.
    #[error("{op}: no migration in source '{key}'")]
    NotFound { op: NavOp, key: String },
}

impl SourceError {
    /// True for the normal end-of-sequence / missing-direction outcome; the
    /// other variants are fatal to the open attempt.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound { .. })
    }
}

/// Contract a migration engine drives while stepping through a run.
///
/// Navigation and read calls may interleave freely; implementations present
/// one consistent ordering for the lifetime of the source.
pub trait MigrationSource {
    /// Version of the smallest migration.
    fn first(&self) -> Result<Version, SourceError>;

    /// Version immediately before `version` in the source's order.
    fn prev(&self, version: Version) -> Result<Version, SourceError>;

    /// Version immediately after `version` in the source's order.
    fn next(&self, version: Version) -> Result<Version, SourceError>;

    /// Up-migration body and identifier for `version`.
    fn read_up(&self, version: Version) -> Result<Script, SourceError>;

    /// Down-migration body and identifier for `version`.
    fn read_down(&self, version: Version) -> Result<Script, SourceError>;

    /// Release held resources. In-memory sources hold none.
    fn close(&mut self) -> Result<(), SourceError>;
}

/// Migration source whose contents come from a registered code factory.
///
/// Built by [`open`](CodeSource::open) and immutable afterwards; the
/// sequence it navigates belongs to this instance alone.
#[derive(Debug)]
pub struct CodeSource {
    key: String,
    sequence: MigrationSequence,
}

impl CodeSource {
    /// Open the source addressed by `url`.
    ///
    /// Accepted forms: `code://billing`, `code:billing`, or a bare factory
    /// key. Factory resolution, production, and sequence construction all
    /// happen here; any failure is returned as-is and nothing partially
    /// built escapes.
    pub fn open(registry: &FactoryRegistry, url: &str) -> Result<Self, SourceError> {
        let key = factory_key(url)?;
        let producer = registry.resolve(key)?;
        let records = producer().map_err(|source| SourceError::Producer {
            key: key.to_string(),
            source,
        })?;
        let sequence = MigrationSequence::build(records)?;
        log::debug!(
            "opened code source '{key}' with {} migration version(s)",
            sequence.len()
        );

        Ok(Self {
            key: key.to_string(),
            sequence,
        })
    }

    /// The factory key this source was opened with.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The ordered sequence backing this source.
    pub fn sequence(&self) -> &MigrationSequence {
        &self.sequence
    }

    fn not_found(&self, op: NavOp) -> SourceError {
        SourceError::NotFound {
            op,
            key: self.key.clone(),
        }
    }
}

impl MigrationSource for CodeSource {
    fn first(&self) -> Result<Version, SourceError> {
        self.sequence
            .first()
            .ok_or_else(|| self.not_found(NavOp::First))
    }

    fn prev(&self, version: Version) -> Result<Version, SourceError> {
        self.sequence
            .prev(version)
            .ok_or_else(|| self.not_found(NavOp::Prev(version)))
    }

    fn next(&self, version: Version) -> Result<Version, SourceError> {
        self.sequence
            .next(version)
            .ok_or_else(|| self.not_found(NavOp::Next(version)))
    }

    fn read_up(&self, version: Version) -> Result<Script, SourceError> {
        self.sequence
            .up(version)
            .map(script)
            .ok_or_else(|| self.not_found(NavOp::ReadUp(version)))
    }

    fn read_down(&self, version: Version) -> Result<Script, SourceError> {
        self.sequence
            .down(version)
            .map(script)
            .ok_or_else(|| self.not_found(NavOp::ReadDown(version)))
    }

    fn close(&mut self) -> Result<(), SourceError> {
        Ok(())
    }
}

/// Wrap a record's body in an owned in-memory reader.
fn script(record: &MigrationRecord) -> Script {
    (
        Box::new(Cursor::new(record.raw.clone().into_bytes())),
        record.identifier.clone(),
    )
}

/// Extract the factory key from an open URL.
///
/// `code://billing` and `code:billing` both address the factory registered
/// under `billing`; a string without a scheme is taken as a bare key. Any
/// other scheme is rejected.
fn factory_key(url: &str) -> Result<&str, SourceError> {
    let invalid = || SourceError::InvalidUrl {
        url: url.to_string(),
    };

    let key = match url.split_once(':') {
        Some((scheme, rest)) if scheme == SCHEME => rest.strip_prefix("//").unwrap_or(rest),
        Some(_) => return Err(invalid()),
        None => url,
    };

    if key.is_empty() {
        return Err(invalid());
    }
    Ok(key)
}
