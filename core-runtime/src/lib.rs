//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the upload core:
//! - Logging and tracing infrastructure
//! - Upload policy configuration
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the other crates depend on. It
//! establishes the logging conventions and holds every tunable the upload
//! engine consults, behind a fail-fast builder.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{UploadConfig, UploadConfigBuilder};
pub use error::{Error, Result};
