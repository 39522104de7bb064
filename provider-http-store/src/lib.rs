//! # HTTP Object Store Provider
//!
//! Implements [`bridge_traits::store::ObjectStore`] over a JSON-speaking
//! object storage HTTP API.
//!
//! ## Features
//!
//! - One-shot object writes with metadata headers
//! - Chunked resumable upload sessions with progress events
//! - Download URL resolution through object metadata
//! - Object deletion
//!
//! Every HTTP request executes at most once; retries, deadlines and
//! fallback belong to `core-upload`.

pub mod error;
pub mod store;
pub mod types;

pub use error::HttpStoreError;
pub use store::HttpObjectStore;
