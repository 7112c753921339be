//! Network client for outpost.
//!
//! This crate provides the HTTP fetch seam the caching strategies reach
//! the network through, plus URL canonicalization shared with the request
//! classifier.

pub mod net;

pub use net::{Fetch, NetClient, NetConfig, NetResponse, canonicalize, is_fetchable};
