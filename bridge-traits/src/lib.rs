//! # Host Bridge Traits
//!
//! Abstraction traits for the external collaborators of the upload core.
//!
//! ## Overview
//!
//! The upload engine never talks to the network or to a credential backend
//! directly. Instead it is programmed against the traits in this crate:
//!
//! - [`http::HttpClient`] - async HTTP transport
//! - [`store::ObjectStore`] - remote object storage (put, resolve, delete)
//! - [`identity::IdentityService`] - credential acquisition and invalidation
//!
//! Hosts provide concrete implementations (see `bridge-desktop` for the
//! reqwest-backed HTTP client and `provider-http-store` for the object store
//! connector). Tests provide mocks.

pub mod error;
pub mod http;
pub mod identity;
pub mod store;

pub use error::{BridgeError, Result};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use identity::{IdentityService, IdentityToken};
pub use store::{ObjectRef, ObjectStore, PutProgress, PutRequest, StoreError, StoreResult};
