//! In-memory caching for the expensive network reads.
//!
//! This module provides `TtlCache`, a small bounded cache keyed by the
//! request arguments of each read. Entries live for one hour; beyond
//! capacity the least-recently-inserted entry is evicted. Nothing is ever
//! persisted to disk.

pub mod ttl;

pub use ttl::TtlCache;
