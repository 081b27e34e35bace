//! Core types and shared functionality for larder.
//!
//! This crate provides:
//! - Named, versioned cache stores with a SQLite backend
//! - Response snapshots captured from the network
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheEntry, CacheStore, ResponseSnapshot};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
