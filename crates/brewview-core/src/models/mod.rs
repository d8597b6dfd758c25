//! Data models for console entities.
//!
//! This module contains the data structures exchanged with the server:
//!
//! - `User`, `Role`, `Preferences`, `LoginPayload`: account and session data
//! - `System`, `Instance`, `Command`: the system catalog
//! - `ServerConfig`, `Namespaces`: server-side console configuration

pub mod config;
pub mod system;
pub mod user;

pub use config::{Namespaces, ServerConfig};
pub use system::{Command, Instance, System};
pub use user::{LoginPayload, Preferences, Role, TokenPair, User, ANONYMOUS_USERNAME, ADMIN_USERNAME};
