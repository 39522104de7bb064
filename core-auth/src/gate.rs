//! # Auth Gate
//!
//! Owns the process-wide identity token and every mutation of it.
//!
//! ## Overview
//!
//! One `AuthGate` instance is injected into the upload pipeline (explicit
//! state, not an ambient singleton). Reads are cheap and concurrent; the
//! token cache is mutated only while the acquisition lock is held, so no two
//! acquisitions or re-acquisitions ever run at the same time. Callers that
//! arrive while an acquisition is in flight wait on the same lock and then
//! reuse its result instead of issuing a duplicate identity request.
//!
//! [`AuthGate::ensure_identity`] never fails: persistent acquisition trouble
//! marks identity as best-effort unavailable and the pipeline proceeds,
//! because the remote store's policy may permit unauthenticated writes.

use crate::types::{AuthPolicy, IdentityAvailability};
use bridge_traits::identity::{IdentityService, IdentityToken};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};

/// Best-effort identity acquisition and renewal.
pub struct AuthGate {
    /// Credential backend
    identity: Arc<dyn IdentityService>,
    /// Acquisition bounds
    policy: AuthPolicy,
    /// Process-wide token cache; replaced wholesale, never mutated in place
    cached: RwLock<Option<IdentityToken>>,
    /// Serializes acquisition and re-acquisition
    acquisition: Mutex<()>,
    /// Set when acquisition has failed persistently
    unavailable: AtomicBool,
    /// Set once any acquisition has been attempted
    tried: AtomicBool,
}

impl AuthGate {
    pub fn new(identity: Arc<dyn IdentityService>, policy: AuthPolicy) -> Self {
        Self {
            identity,
            policy,
            cached: RwLock::new(None),
            acquisition: Mutex::new(()),
            unavailable: AtomicBool::new(false),
            tried: AtomicBool::new(false),
        }
    }

    /// Make a best effort at having a token cached. Never fails.
    ///
    /// Reuses the cached token if present, adopts whatever the backend
    /// already holds, and otherwise attempts bounded anonymous acquisition.
    /// On persistent failure the gate marks identity unavailable and returns
    /// normally.
    #[instrument(skip(self))]
    pub async fn ensure_identity(&self) {
        if self.cached.read().await.is_some() {
            debug!("Cached identity token reused");
            return;
        }

        if let Some(token) = self.identity.current().await {
            debug!("Adopted existing token from identity backend");
            self.install(Some(token)).await;
            return;
        }

        let _guard = self.acquisition.lock().await;

        // An acquisition that was in flight while we waited may have
        // populated the cache.
        if self.cached.read().await.is_some() {
            return;
        }

        self.acquire_locked().await;
    }

    /// Invalidate the cached token and re-acquire.
    ///
    /// Invoked after an authentication-class transfer failure: the token the
    /// store rejected is useless regardless of what the identity backend
    /// thinks of it. Waits briefly for backend state to settle before
    /// re-acquiring.
    #[instrument(skip(self))]
    pub async fn force_reauthenticate(&self) {
        info!("Re-authenticating after authentication-class failure");

        let _guard = self.acquisition.lock().await;

        *self.cached.write().await = None;
        self.identity.invalidate().await;

        sleep(self.policy.settle_delay).await;

        self.acquire_locked().await;
    }

    /// The currently cached token, if any.
    pub async fn current_token(&self) -> Option<IdentityToken> {
        self.cached.read().await.clone()
    }

    /// What the gate currently knows about identity.
    pub async fn availability(&self) -> IdentityAvailability {
        if self.cached.read().await.is_some() {
            IdentityAvailability::Available
        } else if self.unavailable.load(Ordering::Relaxed) {
            IdentityAvailability::BestEffortUnavailable
        } else {
            IdentityAvailability::Unknown
        }
    }

    /// Bounded anonymous acquisition. Caller must hold the acquisition lock.
    async fn acquire_locked(&self) {
        self.tried.store(true, Ordering::Relaxed);

        for attempt in 1..=self.policy.acquire_attempts {
            match timeout(
                self.policy.acquire_timeout,
                self.identity.acquire_anonymous(),
            )
            .await
            {
                Ok(Ok(token)) => {
                    info!(attempt, "Anonymous identity acquired");
                    self.install(Some(token)).await;
                    return;
                }
                Ok(Err(e)) => {
                    warn!(attempt, error = %e, "Anonymous identity acquisition failed");
                }
                Err(_) => {
                    warn!(
                        attempt,
                        timeout_secs = self.policy.acquire_timeout.as_secs(),
                        "Anonymous identity acquisition timed out"
                    );
                }
            }
        }

        self.unavailable.store(true, Ordering::Relaxed);
        warn!("Identity unavailable, uploads will proceed unauthenticated");
    }

    async fn install(&self, token: Option<IdentityToken>) {
        let available = token.is_some();
        *self.cached.write().await = token;
        if available {
            self.unavailable.store(false, Ordering::Relaxed);
        }
    }
}
