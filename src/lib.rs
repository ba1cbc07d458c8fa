//! code-migrations: migration sources produced by registered code callbacks
//!
//! This library supplies schema-migration scripts that are generated
//! in-memory by caller-registered factory functions rather than read from
//! files. A host migration engine opens a named source against a
//! [`FactoryRegistry`] and receives a [`CodeSource`] exposing ordered,
//! bidirectional navigation over the produced records.
//!
//! ```
//! use code_migrations::{CodeSource, FactoryRegistry, MigrationRecord, MigrationSource};
//!
//! let registry = FactoryRegistry::new();
//! registry.register("billing", || {
//!     Ok(vec![
//!         MigrationRecord::up(1, "init", "CREATE TABLE invoices (id bigint)"),
//!         MigrationRecord::up(2, "add_total", "ALTER TABLE invoices ADD total numeric"),
//!         MigrationRecord::down(2, "add_total", "ALTER TABLE invoices DROP total"),
//!     ])
//! });
//!
//! let source = CodeSource::open(&registry, "code://billing")?;
//! assert_eq!(source.first()?, 1);
//! assert_eq!(source.next(1)?, 2);
//! # Ok::<(), code_migrations::SourceError>(())
//! ```

pub mod record;
pub mod registry;
pub mod sequence;
pub mod source;

// Re-export commonly used types
pub use record::{Direction, MigrationRecord, ParseNameError, Version};
pub use registry::{FactoryNotFound, FactoryRegistry, Producer, ProducerError};
pub use sequence::{DuplicateMigration, MigrationSequence};
pub use source::{CodeSource, MigrationSource, NavOp, Script, SourceError};
