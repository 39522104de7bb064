//! One supervised transfer attempt.
//!
//! The session wires a strategy's raw store call to everything the engine
//! guarantees around it: a fresh deadline clock, monotonic progress
//! forwarding, heartbeats, cancellation, the post-transfer size check and
//! URL resolution. Each call to [`TransferSession::run`] is one attempt;
//! the clock it arms is dropped on every exit path, so no timer survives
//! the attempt that created it.

use crate::deadline::{DeadlineClock, DeadlineExpiry};
use crate::error::TransferError;
use crate::progress::{ProgressSnapshot, ProgressTracker, TransferPhase};
use crate::request::PreparedUpload;
use crate::strategy::TransferStrategy;
use bridge_traits::identity::IdentityToken;
use bridge_traits::store::{ObjectRef, ObjectStore, PutProgress};
use core_runtime::config::UploadConfig;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Per-attempt channel depth for raw store progress events.
const PROGRESS_CHANNEL_DEPTH: usize = 64;

/// Shared context for running supervised attempts.
pub(crate) struct TransferSession<'a> {
    store: &'a dyn ObjectStore,
    config: &'a UploadConfig,
    progress_out: Option<&'a mpsc::Sender<ProgressSnapshot>>,
    cancel: &'a CancellationToken,
}

impl<'a> TransferSession<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        config: &'a UploadConfig,
        progress_out: Option<&'a mpsc::Sender<ProgressSnapshot>>,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            store,
            config,
            progress_out,
            cancel,
        }
    }

    /// Drive one attempt of `strategy` to a terminal outcome.
    ///
    /// Emits a zero snapshot first, so observers see progress reset whenever
    /// a new attempt takes over, then forwards clamped snapshots as bytes
    /// advance. Completion is only reported after the stored size matches
    /// the payload and the destination URL resolves; both still run under
    /// this attempt's deadlines and cancellation.
    #[instrument(skip_all, fields(strategy = %strategy.id(), path = %prepared.path))]
    pub async fn run(
        &self,
        strategy: &dyn TransferStrategy,
        prepared: &PreparedUpload,
        token: Option<IdentityToken>,
    ) -> Result<String, TransferError> {
        let total = prepared.request.size_bytes();
        let mut tracker = ProgressTracker::new(total);
        let mut clock = DeadlineClock::start(
            self.config.stall_window,
            strategy.total_ceiling(self.config),
        );
        let (tx, mut rx) = mpsc::channel::<PutProgress>(PROGRESS_CHANNEL_DEPTH);

        self.emit(ProgressSnapshot {
            bytes_transferred: 0,
            total_bytes: total,
            ratio: 0.0,
            bytes_per_second: 0.0,
            since_last_progress: Duration::ZERO,
        })
        .await;

        debug!(phase = ?TransferPhase::Running, total_bytes = total, "Attempt started");

        let mut transfer =
            strategy.transfer(self.store, self.config, prepared, token.as_ref(), tx);
        let mut heartbeat = interval_at(
            Instant::now() + self.config.heartbeat_interval,
            self.config.heartbeat_interval,
        );
        let mut events_open = true;

        // Raw progress events are drained ahead of the transfer result, so
        // every snapshot is delivered before the terminal outcome.
        let reference: ObjectRef = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(phase = ?TransferPhase::Cancelled, "Attempt cancelled by caller");
                    return Err(TransferError::Cancelled);
                }
                expiry = clock.expired() => {
                    return Err(self.expiry_error(expiry, &clock, &tracker));
                }
                event = rx.recv(), if events_open => {
                    match event {
                        Some(PutProgress { bytes_transferred, .. }) => {
                            if let Some(snapshot) = tracker.record(bytes_transferred) {
                                clock.record_progress();
                                self.emit(snapshot).await;
                            }
                            self.check_stuck_band(&mut tracker);
                        }
                        None => events_open = false,
                    }
                }
                _ = heartbeat.tick() => {
                    let snapshot = tracker.heartbeat();
                    self.check_stuck_band(&mut tracker);
                    self.emit(snapshot).await;
                }
                result = &mut transfer => {
                    match result {
                        Ok(reference) => break reference,
                        Err(e) => {
                            let error = TransferError::from(e);
                            debug!(phase = ?TransferPhase::Failed, error = %error, "Attempt failed");
                            return Err(error);
                        }
                    }
                }
            }
        };

        if let Some(snapshot) = tracker.record(total) {
            self.emit(snapshot).await;
        }

        if reference.size != total {
            warn!(
                expected = total,
                actual = reference.size,
                "Stored object size does not match the payload"
            );
            return Err(TransferError::SizeMismatch {
                expected: total,
                actual: reference.size,
            });
        }

        // URL materialization can lag object visibility; keep the attempt's
        // deadlines and cancellation in force while it settles.
        let url = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(phase = ?TransferPhase::Cancelled, "Cancelled during URL resolution");
                return Err(TransferError::Cancelled);
            }
            expiry = clock.expired() => {
                return Err(self.expiry_error(expiry, &clock, &tracker));
            }
            resolved = self.resolve_with_retry(&reference) => resolved?,
        };

        info!(phase = ?TransferPhase::Succeeded, url = %url, "Attempt succeeded");
        Ok(url)
    }

    fn expiry_error(
        &self,
        expiry: DeadlineExpiry,
        clock: &DeadlineClock,
        tracker: &ProgressTracker,
    ) -> TransferError {
        warn!(
            ?expiry,
            bytes_transferred = tracker.bytes(),
            "Deadline fired, abandoning the attempt"
        );
        match expiry {
            DeadlineExpiry::Stalled => TransferError::Stalled(clock.stall_window()),
            DeadlineExpiry::TimedOut => TransferError::TimedOut(clock.total_ceiling()),
        }
    }

    /// Bounded resolution of the destination URL after a successful put.
    async fn resolve_with_retry(&self, reference: &ObjectRef) -> Result<String, TransferError> {
        let attempts = self.config.url_resolve_attempts;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.store.resolve_url(reference).await {
                Ok(url) => return Ok(url),
                Err(e) => {
                    last_error = e.to_string();
                    if attempt < attempts {
                        debug!(attempt, error = %last_error, "Destination URL not resolvable yet");
                        sleep(self.config.url_resolve_spacing).await;
                    }
                }
            }
        }

        warn!(attempts, error = %last_error, "Destination URL never resolved");
        Err(TransferError::NotFound(format!(
            "url unresolved after {} attempts: {}",
            attempts, last_error
        )))
    }

    fn check_stuck_band(&self, tracker: &mut ProgressTracker) {
        if tracker.entered_stuck_band() {
            // Diagnostic only; retry and fallback decisions never read this.
            warn!(
                ratio = tracker.ratio(),
                "Transfer is quiet inside the store's habitual stuck band"
            );
        }
    }

    /// Forward a snapshot to the caller's channel, if any.
    ///
    /// A saturated or abandoned observer must not wedge the transfer, so
    /// delivery is non-blocking; ordering is preserved either way.
    async fn emit(&self, snapshot: ProgressSnapshot) {
        if let Some(sender) = self.progress_out {
            let _ = sender.try_send(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::UploadRequest;
    use crate::strategy::ResumableStrategy;
    use async_trait::async_trait;
    use bridge_traits::store::{PutRequest, StoreError, StoreResult};
    use bytes::Bytes;
    use std::sync::atomic::{AtomicU32, Ordering};

    const TOTAL: u64 = 100_000;

    /// How the scripted store behaves for `put_resumable`.
    enum Script {
        /// Emit progress in steps of (delay, absolute bytes), then succeed
        Steps(Vec<(Duration, u64)>),
        /// Emit one progress event, then never return
        HangAt(u64),
        /// Emit tiny progress forever, defeating the stall timer
        Drip,
    }

    struct ScriptedStore {
        script: Script,
        /// Leading `resolve_url` failures before success
        resolve_failures: u32,
        resolved: AtomicU32,
        reported_size: u64,
    }

    impl ScriptedStore {
        fn new(script: Script) -> Self {
            Self {
                script,
                resolve_failures: 0,
                resolved: AtomicU32::new(0),
                reported_size: TOTAL,
            }
        }
    }

    #[async_trait]
    impl ObjectStore for ScriptedStore {
        async fn put(
            &self,
            _request: PutRequest,
            _token: Option<&IdentityToken>,
        ) -> StoreResult<ObjectRef> {
            unreachable!("session tests drive the resumable path")
        }

        async fn put_resumable(
            &self,
            request: PutRequest,
            _token: Option<&IdentityToken>,
            progress: mpsc::Sender<PutProgress>,
        ) -> StoreResult<ObjectRef> {
            let total = request.bytes.len() as u64;
            match &self.script {
                Script::Steps(steps) => {
                    for (delay, bytes) in steps {
                        sleep(*delay).await;
                        let _ = progress
                            .send(PutProgress {
                                bytes_transferred: *bytes,
                                total_bytes: total,
                            })
                            .await;
                    }
                    Ok(ObjectRef {
                        path: request.path,
                        size: self.reported_size,
                        generation: None,
                    })
                }
                Script::HangAt(bytes) => {
                    let _ = progress
                        .send(PutProgress {
                            bytes_transferred: *bytes,
                            total_bytes: total,
                        })
                        .await;
                    std::future::pending::<()>().await;
                    unreachable!()
                }
                Script::Drip => {
                    let mut sent = 0u64;
                    loop {
                        sleep(Duration::from_secs(30)).await;
                        sent += 16;
                        let _ = progress
                            .send(PutProgress {
                                bytes_transferred: sent,
                                total_bytes: total,
                            })
                            .await;
                    }
                }
            }
        }

        async fn resolve_url(&self, reference: &ObjectRef) -> StoreResult<String> {
            let n = self.resolved.fetch_add(1, Ordering::Relaxed) + 1;
            if n <= self.resolve_failures {
                Err(StoreError::NotFound("object not visible yet".to_string()))
            } else {
                Ok(format!("https://store.example/{}", reference.path))
            }
        }

        async fn delete(&self, _path: &str, _token: Option<&IdentityToken>) -> StoreResult<()> {
            Ok(())
        }
    }

    fn prepared() -> PreparedUpload {
        PreparedUpload {
            request: UploadRequest::new(
                Bytes::from(vec![0u8; TOTAL as usize]),
                "image/png",
                "covers",
                "test",
            ),
            path: "covers/test-1700000000-abc123.png".to_string(),
        }
    }

    async fn run_session(
        store: &ScriptedStore,
        config: &UploadConfig,
        progress: Option<&mpsc::Sender<ProgressSnapshot>>,
        cancel: &CancellationToken,
    ) -> Result<String, TransferError> {
        TransferSession::new(store, config, progress, cancel)
            .run(&ResumableStrategy, &prepared(), None)
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_attempt_resolves_url() {
        let store = ScriptedStore::new(Script::Steps(vec![
            (Duration::from_secs(2), 30_000),
            (Duration::from_secs(2), 70_000),
            (Duration::from_secs(2), TOTAL),
        ]));
        let config = UploadConfig::default();
        let cancel = CancellationToken::new();

        let url = run_session(&store, &config, None, &cancel).await.unwrap();
        assert_eq!(
            url,
            "https://store.example/covers/test-1700000000-abc123.png"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshots_are_ordered_and_reset_to_zero() {
        let store = ScriptedStore::new(Script::Steps(vec![
            (Duration::from_secs(1), 30_000),
            (Duration::from_secs(1), 70_000),
            (Duration::from_secs(1), TOTAL),
        ]));
        let config = UploadConfig::default();
        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel(64);

        run_session(&store, &config, Some(&tx), &cancel)
            .await
            .unwrap();
        drop(tx);

        let mut seen = Vec::new();
        while let Some(snapshot) = rx.recv().await {
            seen.push(snapshot.bytes_transferred);
        }

        assert_eq!(seen.first(), Some(&0));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last(), Some(&TOTAL));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_transfer_fails_stalled() {
        let store = ScriptedStore::new(Script::HangAt(20_000));
        let config = UploadConfig::default();
        let cancel = CancellationToken::new();

        let started = Instant::now();
        let result = run_session(&store, &config, None, &cancel).await;

        assert!(matches!(result, Err(TransferError::Stalled(_))));
        // One stall window after the last byte movement.
        assert!(started.elapsed() >= config.stall_window);
        assert!(started.elapsed() < config.resumable_ceiling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dripping_transfer_hits_total_ceiling() {
        let store = ScriptedStore::new(Script::Drip);
        let config = UploadConfig::default();
        let cancel = CancellationToken::new();

        let started = Instant::now();
        let result = run_session(&store, &config, None, &cancel).await;

        // Progress every 30s defeats the 60s stall timer; only the fixed
        // ceiling can end this attempt.
        assert!(matches!(result, Err(TransferError::TimedOut(_))));
        assert_eq!(started.elapsed(), config.resumable_ceiling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_wins_immediately() {
        let store = ScriptedStore::new(Script::HangAt(10_000));
        let config = UploadConfig::default();
        let cancel = CancellationToken::new();

        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(3)).await;
            cancel_clone.cancel();
        });

        let started = Instant::now();
        let result = run_session(&store, &config, None, &cancel).await;

        assert!(matches!(result, Err(TransferError::Cancelled)));
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_url_resolution_retries_then_succeeds() {
        let mut store = ScriptedStore::new(Script::Steps(vec![(Duration::from_secs(1), TOTAL)]));
        store.resolve_failures = 2;
        let config = UploadConfig::default();
        let cancel = CancellationToken::new();

        let url = run_session(&store, &config, None, &cancel).await.unwrap();
        assert!(url.ends_with(".png"));
        assert_eq!(store.resolved.load(Ordering::Relaxed), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_url_resolution_exhaustion_fails_the_attempt() {
        let mut store = ScriptedStore::new(Script::Steps(vec![(Duration::from_secs(1), TOTAL)]));
        store.resolve_failures = 10;
        let config = UploadConfig::default();
        let cancel = CancellationToken::new();

        let result = run_session(&store, &config, None, &cancel).await;
        assert!(matches!(result, Err(TransferError::NotFound(_))));
        assert_eq!(
            store.resolved.load(Ordering::Relaxed),
            config.url_resolve_attempts
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_size_mismatch_fails_after_transfer() {
        let mut store = ScriptedStore::new(Script::Steps(vec![(Duration::from_secs(1), TOTAL)]));
        store.reported_size = TOTAL - 1;
        let config = UploadConfig::default();
        let cancel = CancellationToken::new();

        let result = run_session(&store, &config, None, &cancel).await;
        assert!(matches!(
            result,
            Err(TransferError::SizeMismatch {
                expected: TOTAL,
                actual,
            }) if actual == TOTAL - 1
        ));
    }
}
