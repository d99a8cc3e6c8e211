//! Local caching for the city directory.
//!
//! This module provides the `DirectoryCache` that fronts the remote store:
//! fetch once per process, deduplicate by id, persist the snapshot, and
//! serve it without re-fetching for 24 hours.

pub mod directory;

pub use directory::{CacheSnapshot, CitySource, DirectoryCache};
