//! Named factory registry
//!
//! Maps a string key to a producer callback that materializes a batch of
//! migration records on demand. Independent modules register their factories
//! during process initialization without the consuming engine knowing about
//! them at compile time; the source adapter resolves a factory at open time.
//!
//! The registry is an explicitly constructed object injected where it is
//! needed, so tests run against their own instances. The intended lifecycle
//! is register-everything-then-resolve; the map sits behind a mutex, so a
//! late registration racing a lookup is still safe, merely unordered.
//! Entries are never removed.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::record::MigrationRecord;

/// Failure reason reported by a producer. Passed through to the caller
/// verbatim; the registry does not inspect it.
pub type ProducerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A registered zero-argument callback yielding one batch of records.
///
/// The registry does not validate the batch — ordering and duplicate
/// detection belong to the sequence builder.
pub type Producer = Arc<dyn Fn() -> Result<Vec<MigrationRecord>, ProducerError> + Send + Sync>;

/// Error returned when a key has no registered producer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("no migration factory registered under key '{0}'")]
pub struct FactoryNotFound(pub String);

/// Key → producer table.
#[derive(Default)]
pub struct FactoryRegistry {
    factories: Mutex<HashMap<String, Producer>>,
}

impl FactoryRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `producer` under `key`, replacing any existing entry.
    ///
    /// Registration is caller-trusted: the last writer wins and no
    /// duplicate-key error is raised.
    pub fn register<F>(&self, key: impl Into<String>, producer: F)
    where
        F: Fn() -> Result<Vec<MigrationRecord>, ProducerError> + Send + Sync + 'static,
    {
        let key = key.into();
        log::debug!("registering migration factory '{key}'");
        self.factories.lock().insert(key, Arc::new(producer));
    }

    /// Look up the producer registered under `key`.
    pub fn resolve(&self, key: &str) -> Result<Producer, FactoryNotFound> {
        self.factories
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| FactoryNotFound(key.to_string()))
    }

    /// Whether `key` has a registered producer.
    pub fn contains(&self, key: &str) -> bool {
        self.factories.lock().contains_key(key)
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self.factories.lock().keys().cloned().collect();
        f.debug_struct("FactoryRegistry").field("keys", &keys).finish()
    }
}
