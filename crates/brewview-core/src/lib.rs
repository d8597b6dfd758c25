//! brewview-core - client core for a Beer Garden style orchestration console.
//!
//! The crate keeps a console session in sync with the server: who is logged
//! in and what they may do, which systems exist, and the live event stream
//! that keeps the system catalog current.
//!
//! [`console::Console`] wires the pieces together and is the entry point for
//! front ends.

pub mod api;
pub mod auth;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod console;
pub mod events;
pub mod models;
pub mod navigation;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, Session, SessionPhase, TokenStore};
pub use catalog::{CatalogChange, SystemCatalog};
pub use config::Config;
pub use console::{is_user, CachedCatalog, Console, ConsoleApi, ConsoleState};
pub use events::{Event, EventDispatcher, EventSocket, ReconnectPolicy};
pub use navigation::{has_permission, Access, NavigationGate, Route, View};
