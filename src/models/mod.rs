//! Data models for registry entities.
//!
//! - `City`: the reference directory of locations, grouped by province
//! - `Entry`, `EntryDraft`: registry entries read from and submitted to
//!   the remote store

pub mod city;
pub mod entry;

pub use city::City;
pub use entry::{Entry, EntryDraft};
