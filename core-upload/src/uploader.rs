//! # Asset Uploader
//!
//! The public entry point of the engine. One [`AssetUploader`] is built per
//! store/identity pair and shared freely; every call to [`AssetUploader::upload`]
//! is an independent pipeline run with its own destination path, progress
//! channel and cancellation token.
//!
//! ## Usage
//!
//! ```no_run
//! use core_upload::{AssetUploader, UploadOptions, UploadRequest};
//! # async fn example(
//! #     store: std::sync::Arc<dyn bridge_traits::store::ObjectStore>,
//! #     auth: std::sync::Arc<core_auth::AuthGate>,
//! # ) -> core_upload::error::Result<()> {
//! let uploader = AssetUploader::new(store, auth, Default::default());
//!
//! let request = UploadRequest::new(
//!     bytes::Bytes::from(std::fs::read("cover.png").unwrap()),
//!     "image/png",
//!     "covers",
//!     "Album Cover",
//! );
//!
//! let url = uploader.upload(request, UploadOptions::default()).await?;
//! println!("stored at {url}");
//! # Ok(())
//! # }
//! ```

use crate::chain::{StrategyAttempt, StrategyChain};
use crate::error::Result;
use crate::progress::ProgressSnapshot;
use crate::request::{PreparedUpload, UploadRequest};
use crate::retry::RetryPolicy;
use crate::sanitize::ObjectName;
use crate::session::TransferSession;
use crate::validate::validate;
use bridge_traits::store::ObjectStore;
use chrono::Utc;
use core_auth::AuthGate;
use core_runtime::config::UploadConfig;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Per-call options.
///
/// The default runs without progress reporting and with a token nobody
/// cancels.
#[derive(Default)]
pub struct UploadOptions {
    /// Receives ordered progress snapshots; dropped observers are harmless
    pub progress: Option<mpsc::Sender<ProgressSnapshot>>,
    /// Cancels the whole pipeline when triggered
    pub cancellation: CancellationToken,
}

/// A successful upload plus its attempt history.
#[derive(Debug)]
pub struct UploadReport {
    /// Publicly resolvable URL of the stored object
    pub url: String,
    /// One entry per strategy that ran, in order
    pub attempts: Vec<StrategyAttempt>,
}

/// Upload pipeline over one store and one identity gate.
pub struct AssetUploader {
    store: Arc<dyn ObjectStore>,
    auth: Arc<AuthGate>,
    config: UploadConfig,
    chain: StrategyChain,
}

impl AssetUploader {
    pub fn new(store: Arc<dyn ObjectStore>, auth: Arc<AuthGate>, config: UploadConfig) -> Self {
        Self {
            store,
            auth,
            config,
            chain: StrategyChain::standard(),
        }
    }

    /// Upload one asset and return its resolved URL.
    pub async fn upload(&self, request: UploadRequest, options: UploadOptions) -> Result<String> {
        self.upload_with_report(request, options)
            .await
            .map(|report| report.url)
    }

    /// Upload one asset and return the URL together with the per-strategy
    /// attempt history.
    #[instrument(
        skip_all,
        fields(
            size_bytes = request.size_bytes(),
            content_type = %request.content_type(),
            folder = %request.destination_folder(),
        )
    )]
    pub async fn upload_with_report(
        &self,
        request: UploadRequest,
        options: UploadOptions,
    ) -> Result<UploadReport> {
        // Nothing touches the network for an unsuitable asset.
        validate(&request, &self.config)?;

        let name = ObjectName::derive(request.display_name(), request.content_type(), Utc::now());
        let path = name.path(request.destination_folder());
        debug!(path = %path, "Destination path fixed for this upload");

        let prepared = PreparedUpload { request, path };

        let session = TransferSession::new(
            self.store.as_ref(),
            &self.config,
            options.progress.as_ref(),
            &options.cancellation,
        );
        let retry = RetryPolicy::new(&self.config, self.auth.as_ref(), &options.cancellation);

        let (url, attempts) = self.chain.run(&session, &retry, &prepared).await?;
        Ok(UploadReport { url, attempts })
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }
}
