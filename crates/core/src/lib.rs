//! Core types and shared functionality for outpost.
//!
//! This crate provides:
//! - The durable generation store with SQLite backend
//! - Request descriptors and response snapshots
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod request;
pub mod store;

pub use config::AppConfig;
pub use error::Error;
pub use request::{Destination, Request, RequestMode};
pub use store::{GenerationStore, StoredResponse};
