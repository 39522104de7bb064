//! # Authentication Module
//!
//! Best-effort identity acquisition for the upload pipeline.
//!
//! ## Overview
//!
//! The remote object store may or may not require credentials, and the
//! identity provider may or may not be reachable. This module owns the
//! process-wide cached [`bridge_traits::IdentityToken`] and guarantees that
//! credential trouble never blocks an upload outright: acquisition is
//! bounded, failures downgrade to "best-effort unavailable", and the
//! pipeline proceeds either way.
//!
//! ## Features
//!
//! - Cached token reuse across upload sessions
//! - Single shared in-flight acquisition (no duplicate identity requests)
//! - Bounded anonymous acquisition with per-attempt timeout
//! - Forced re-authentication after authentication-class transfer failures

pub mod gate;
pub mod types;

pub use gate::AuthGate;
pub use types::{AuthPolicy, IdentityAvailability};
