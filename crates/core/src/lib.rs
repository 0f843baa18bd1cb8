//! Core types and shared functionality for wxcache.
//!
//! This crate provides:
//! - Versioned cache storage with a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheStorage, CacheStore, RequestKey, ResponseRecord};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
