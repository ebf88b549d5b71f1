//! Quarry Store - SQLite persistence and the query façade
//!
//! Provides:
//! - Connection lifecycle (`Database`) with configuration and migrations
//! - Translation of filter trees and projections into SQL
//! - The `Facade`: find, aggregate, group_by, create, update, upsert,
//!   delete and atomic batches
//! - YAML seed import

pub mod db;
pub mod errors;
pub mod facade;
pub mod migrations;
pub mod seed;
mod sql;

// Re-export key types
pub use db::{Database, JournalMode, StoreConfig};
pub use errors::Result;
pub use facade::Facade;
