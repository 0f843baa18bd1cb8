//! SQLite-backed storage for versioned response caches.
//!
//! Storage holds any number of named cache stores; each store maps a request
//! identity (method + URL) to a stored response. Access is async via
//! tokio-rusqlite. It supports:
//!
//! - Hashed request identities using SHA-256
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - All-or-nothing population of a store
//! - Deleting a whole store together with its entries

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheStorage;
pub use entries::{CacheStore, RequestKey, ResponseRecord};
