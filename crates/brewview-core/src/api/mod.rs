//! REST API client module for the console backend.
//!
//! This module provides the `ApiClient` for fetching the server
//! configuration, loading users, issuing tokens and listing systems.
//!
//! Authenticated calls carry the access token as a bearer header; without a
//! token the server answers as the `anonymous` user.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
