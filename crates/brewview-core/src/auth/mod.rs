//! Authentication and authorization for console sessions.
//!
//! This module provides:
//! - `Session`: the login/logout state machine and its derived flags
//! - `coalesce_permissions`: role hierarchy to effective permission set
//! - `TokenStore`: persisted access and refresh tokens (OS keychain by default)

pub mod error;
pub mod permissions;
pub mod session;
pub mod token_store;

pub use error::AuthError;
pub use permissions::{coalesce_permissions, WILDCARD_PERMISSION};
pub use session::{Session, SessionAction, SessionPhase};
pub use token_store::{KeyringBackend, MemoryBackend, TokenBackend, TokenStore};
