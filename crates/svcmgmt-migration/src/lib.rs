//! Service Management DOM migration
//!
//! Links service configuration versions to services:
//! - Configuration versions lose their `previousVersion` reference and gain
//!   a `createdAt` timestamp
//! - Services gain a `configurationVersions` list holding the current
//!   configuration version and its immediate predecessor
//!
//! The run is a fixed sequence of [`MigrationStep`]s over a paged store.
//! The [`VersionPrecedenceMap`] built while walking configuration versions is
//! the only data passed to the service walk.
//!
//! # Example
//!
//! ```rust,ignore
//! use svcmgmt_migration::{FileJournal, MigrationConfig, MigrationRunner};
//!
//! let report = MigrationRunner::new(&store, MigrationConfig::new())
//!     .with_journal(FileJournal::new("migration.checkpoint.json"))
//!     .run()?;
//! assert_eq!(report.steps_executed.len(), 5);
//! ```

#![allow(missing_docs)]

pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod flatten;
pub mod journal;
pub mod precedence;
pub mod rewrite;
pub mod runner;
pub mod schema;
pub mod steps;

pub use catalog::MigrationTargets;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{BehaviorLinkMode, MigrationConfig, DEFAULT_PAGE_SIZE};
pub use error::MigrationError;
pub use flatten::{ChainFlattener, FlattenOutcome};
pub use journal::{Checkpoint, FileJournal, LogJournal, MemoryJournal, StepJournal};
pub use precedence::{Precedence, VersionPrecedenceMap};
pub use rewrite::{configuration_versions, Resolution, RewriteOutcome, ServiceRewriter};
pub use runner::{run_migration, MigrationReport, MigrationRunner};
pub use schema::{SchemaEditor, ServiceSchemaChange};
pub use steps::MigrationStep;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
