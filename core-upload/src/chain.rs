//! Sequential strategy fallback.
//!
//! The chain tries strategies strictly in order and stops at the first
//! success. Strategies never run concurrently, a later strategy never runs
//! once an earlier one has succeeded, and cancellation ends the whole chain
//! rather than falling through to the next entry. When every budget is
//! spent the caller gets the full ordered attempt history.

use crate::error::{ChainExhaustedError, TransferError, UploadError};
use crate::request::PreparedUpload;
use crate::retry::RetryPolicy;
use crate::session::TransferSession;
use crate::strategy::{
    DirectStrategy, PublicStrategy, ResumableStrategy, StrategyId, TransferStrategy,
};
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

/// What one strategy's turn in the chain amounted to.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    Succeeded,
    Failed(TransferError),
}

/// Record of one strategy's turn, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct StrategyAttempt {
    pub strategy_id: StrategyId,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub outcome: AttemptOutcome,
}

/// Ordered fallback chain.
pub(crate) struct StrategyChain {
    strategies: Vec<Box<dyn TransferStrategy>>,
}

impl StrategyChain {
    /// The production order: resumable first for its progress reporting,
    /// then the authenticated one-shot, then the anonymous last resort.
    pub fn standard() -> Self {
        Self {
            strategies: vec![
                Box::new(ResumableStrategy),
                Box::new(DirectStrategy),
                Box::new(PublicStrategy),
            ],
        }
    }

    /// Run the chain to the first success or to exhaustion.
    #[instrument(skip_all)]
    pub async fn run(
        &self,
        session: &TransferSession<'_>,
        retry: &RetryPolicy<'_>,
        prepared: &PreparedUpload,
    ) -> Result<(String, Vec<StrategyAttempt>), UploadError> {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            let strategy_id = strategy.id();
            let started_at = Utc::now();
            info!(strategy = %strategy_id, position = attempts.len() + 1, "Strategy taking over");

            let outcome = retry.run(strategy.as_ref(), session, prepared).await;
            let ended_at = Utc::now();

            match outcome {
                Ok(url) => {
                    attempts.push(StrategyAttempt {
                        strategy_id,
                        started_at,
                        ended_at,
                        outcome: AttemptOutcome::Succeeded,
                    });
                    info!(strategy = %strategy_id, "Upload complete, later strategies skipped");
                    return Ok((url, attempts));
                }
                Err(TransferError::Cancelled) => {
                    // Caller-initiated; no fallback and no further history.
                    info!(strategy = %strategy_id, "Upload cancelled mid-chain");
                    return Err(UploadError::Cancelled);
                }
                Err(error) => {
                    warn!(strategy = %strategy_id, error = %error, "Strategy exhausted, falling back");
                    attempts.push(StrategyAttempt {
                        strategy_id,
                        started_at,
                        ended_at,
                        outcome: AttemptOutcome::Failed(error),
                    });
                }
            }
        }

        warn!(
            strategies = attempts.len(),
            "Every strategy exhausted, reporting failure"
        );
        Err(UploadError::ChainExhausted(ChainExhaustedError {
            attempts,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_order() {
        let chain = StrategyChain::standard();
        let ids: Vec<StrategyId> = chain.strategies.iter().map(|s| s.id()).collect();
        assert_eq!(
            ids,
            vec![StrategyId::Resumable, StrategyId::Direct, StrategyId::Public]
        );
    }
}
