//! Read-only cache inspection tools.

pub mod entries;
pub mod lookup;
pub mod stores;

pub use entries::{CacheEntriesParams, entries_impl};
pub use lookup::{CacheMatchParams, match_impl};
pub use stores::stores_impl;
