//! Remote document-store client module.
//!
//! This module provides the `FirestoreClient` for reading the city
//! directory, searching registry entries, and submitting new entries
//! through the Firestore REST API.

pub mod client;
pub mod error;

pub use client::FirestoreClient;
pub use error::ApiError;
