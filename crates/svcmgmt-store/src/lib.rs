//! Service Management DOM store
//!
//! Store interfaces the migration runs against:
//! - [`DomInstanceStore`]: bounded pages of instances filtered by DOM
//!   definition, and per-instance updates
//! - [`DefinitionStore`]: section, DOM and behavior definitions
//! - [`PageCursor`]: walks a filtered collection one page at a time
//!
//! [`InMemoryStore`] implements both interfaces and backs the runner binary
//! through JSON [`StoreSnapshot`]s.

pub mod api;
pub mod error;
pub mod memory;
pub mod paging;
pub mod snapshot;

pub use api::{DefinitionStore, DomInstanceFilter, DomInstanceStore, Page, PageToken};
pub use error::{ObjectKind, StoreError};
pub use memory::{InMemoryStore, StoreStats};
pub use paging::{prepare_paging, PageCursor};
pub use snapshot::StoreSnapshot;
