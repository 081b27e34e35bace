//! SQLite-backed cache stores for captured responses.
//!
//! This module provides persistent, named key→response stores using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Request keys derived from method + normalized URL (SHA-256)
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Whole-store deletion, the only eviction mechanism

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod snapshot;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use snapshot::ResponseSnapshot;
pub use stores::{CacheEntry, CacheStore, StoreSummary};
