//! In-memory system catalog kept live by server events.
//!
//! The catalog is loaded in full from the REST API and then reconciled
//! against `SYSTEM_CREATED`, `SYSTEM_REMOVED` and `SYSTEM_UPDATED` events.
//! Duplicate or out-of-order events are absorbed rather than reported.

pub mod reconciler;

pub use reconciler::{CatalogChange, SystemCatalog, CATALOG_SUBSCRIBER};
