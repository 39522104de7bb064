//! # Upload Orchestration Module
//!
//! Moves a binary image asset from this process to durable remote object
//! storage over an unreliable network.
//!
//! ## Overview
//!
//! The store this engine was built against misbehaves in specific ways:
//! transfers stall at a fixed completion ratio, authentication state is
//! ambiguous, and requests hit hard timeouts. The engine therefore runs
//! every upload through:
//!
//! 1. Pre-flight validation (`validate`) - nothing touches the network for
//!    an unsuitable asset
//! 2. Deterministic destination naming (`sanitize`) - one collision-proof
//!    path per upload session, shared by every strategy
//! 3. Best-effort identity (`core-auth`) - credentials never block a
//!    transfer outright
//! 4. An ordered fallback chain of transfer strategies (`strategy`,
//!    `chain`), each wrapped in exactly one bounded retry layer (`retry`),
//!    each attempt supervised by a two-timer deadline clock (`deadline`)
//!    inside a transfer session (`session`) that emits ordered progress
//!    snapshots (`progress`)
//!
//! ## Components
//!
//! - **Validator** (`validate`): size bounds, MIME allow-list, magic sniff
//! - **Name Sanitizer** (`sanitize`): collision-resistant destination paths
//! - **Deadline Clock** (`deadline`): stall and total timers per attempt
//! - **Transfer Session** (`session`): one attempt, progress, URL resolution
//! - **Retry Policy** (`retry`): bounded retries, backoff, re-authentication
//! - **Strategy Chain** (`chain`): sequential fallback across strategies
//! - **Asset Uploader** (`uploader`): the public entry point

pub mod chain;
pub mod deadline;
pub mod error;
pub mod progress;
pub mod request;
mod retry;
pub mod sanitize;
mod session;
pub mod strategy;
pub mod uploader;
pub mod validate;

pub use chain::{AttemptOutcome, StrategyAttempt};
pub use error::{ChainExhaustedError, TransferError, UploadError, ValidationError};
pub use progress::{ProgressSnapshot, TransferPhase};
pub use request::{PreparedUpload, UploadRequest};
pub use strategy::StrategyId;
pub use uploader::{AssetUploader, UploadOptions, UploadReport};
