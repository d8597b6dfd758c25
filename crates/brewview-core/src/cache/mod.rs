//! Local caching module for offline data access.
//!
//! This module provides the `CacheManager` for storing and retrieving
//! console data locally. Data is cached in JSON format and considered
//! stale after 60 minutes.
//!
//! Cached data types include:
//! - The system catalog
//! - The server configuration

pub mod manager;

pub use manager::{CacheManager, CachedData};
