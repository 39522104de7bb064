//! Bounded retries for a single strategy.
//!
//! This is the only retry layer in the engine. Strategies never retry
//! themselves and the chain never loops; every repeated attempt flows
//! through here, so the worst-case attempt count is the sum of the
//! per-strategy budgets and nothing multiplies.

use crate::error::TransferError;
use crate::request::PreparedUpload;
use crate::session::TransferSession;
use crate::strategy::TransferStrategy;
use core_auth::AuthGate;
use core_runtime::config::UploadConfig;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// How one attempt's failure shapes the next move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureClass {
    /// Worth another attempt of the same strategy, as budget allows
    Retryable,
    /// Retryable, but only after credentials are replaced
    AuthRetryable,
    /// This strategy is done; let the chain fall back
    Terminal,
    /// The whole upload is done; no fallback either
    Fatal,
}

fn classify(error: &TransferError) -> FailureClass {
    use TransferError::*;
    match error {
        Cancelled => FailureClass::Fatal,
        Unauthorized(_) | Unauthenticated(_) => FailureClass::AuthRetryable,
        Network(_) | Unavailable(_) | Stalled(_) | TimedOut(_) => FailureClass::Retryable,
        QuotaExceeded(_) | InvalidArgument(_) | NotFound(_) | SizeMismatch { .. } | Unknown(_) => {
            FailureClass::Terminal
        }
    }
}

/// Runs one strategy against its retry budget.
pub(crate) struct RetryPolicy<'a> {
    config: &'a UploadConfig,
    auth: &'a AuthGate,
    cancel: &'a CancellationToken,
}

impl<'a> RetryPolicy<'a> {
    pub fn new(
        config: &'a UploadConfig,
        auth: &'a AuthGate,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            config,
            auth,
            cancel,
        }
    }

    /// Drive `strategy` to success or exhaustion.
    ///
    /// Never falls back to a different strategy; that decision belongs to
    /// the chain. Returns the last attempt's error once the budget is spent
    /// or the failure is not worth repeating.
    #[instrument(skip_all, fields(strategy = %strategy.id()))]
    pub async fn run(
        &self,
        strategy: &dyn TransferStrategy,
        session: &TransferSession<'_>,
        prepared: &PreparedUpload,
    ) -> Result<String, TransferError> {
        let max_attempts = strategy.max_attempts(self.config).max(1);
        let mut delay = self.config.backoff_base;

        for attempt in 1..=max_attempts {
            let token = if strategy.wants_identity() {
                self.auth.ensure_identity().await;
                self.auth.current_token().await
            } else {
                None
            };

            let error = match session.run(strategy, prepared, token).await {
                Ok(url) => {
                    if attempt > 1 {
                        info!(attempt, "Strategy succeeded on retry");
                    }
                    return Ok(url);
                }
                Err(error) => error,
            };

            match classify(&error) {
                FailureClass::Fatal | FailureClass::Terminal => {
                    debug!(error = %error, "Failure is not retryable within this strategy");
                    return Err(error);
                }
                class @ (FailureClass::Retryable | FailureClass::AuthRetryable) => {
                    if attempt == max_attempts {
                        warn!(error = %error, attempts = max_attempts, "Retry budget exhausted");
                        return Err(error);
                    }

                    if class == FailureClass::AuthRetryable {
                        // The store rejected the token; replace it before
                        // spending another attempt.
                        self.auth.force_reauthenticate().await;
                    }

                    warn!(error = %error, attempt, delay_ms = delay.as_millis() as u64, "Backing off before retry");
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Err(TransferError::Cancelled),
                        _ = sleep(delay) => {}
                    }
                    delay = next_delay(delay, self.config.backoff_cap);
                }
            }
        }

        unreachable!("attempt budgets are validated to be at least 1")
    }
}

fn next_delay(current: Duration, cap: Duration) -> Duration {
    (current * 2).min(cap)
}
