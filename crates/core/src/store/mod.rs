//! SQLite-backed durable store for versioned cache generations.
//!
//! This module provides the persistent generation store using SQLite with
//! async access via tokio-rusqlite. It supports:
//!
//! - Descriptor-keyed response snapshots using SHA-256 keys
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Whole-generation deletion (activation and quota eviction)

pub mod connection;
pub mod entries;
pub mod generations;
pub mod key;
pub mod migrations;

pub use crate::Error;

pub use connection::GenerationStore;
pub use entries::StoredResponse;
