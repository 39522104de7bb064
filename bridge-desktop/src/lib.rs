//! # Desktop Bridge Implementations
//!
//! Desktop-ready implementations of the `bridge-traits` abstractions.
//! Currently this is the reqwest-backed HTTP client; credential backends are
//! deployment-specific and provided by the host.

pub mod http;

pub use http::ReqwestHttpClient;
