use crate::config::FetchConfig;
use crate::fetcher::source::{AttemptError, JsonSource, Payload};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Terminal outcome of a failed attempt sequence
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last_error: AttemptError,
    },

    #[error("Unusable response on attempt {attempt}: {source}")]
    Malformed { attempt: u32, source: AttemptError },

    #[error("Fetch cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl FetchError {
    /// Number of attempts that were made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            FetchError::RetriesExhausted { attempts, .. } => *attempts,
            FetchError::Malformed { attempt, .. } => *attempt,
            FetchError::Cancelled { attempts } => *attempts,
        }
    }
}

/// Retry budget and fixed backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts allowed after the first
    pub max_retries: u32,

    /// Wait between two attempts; never grows
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// The first attempt plus every retry
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay)
    }
}

/// A payload together with the number of attempts it took
#[derive(Debug, Clone)]
pub struct Fetched {
    pub payload: Payload,
    pub attempts: u32,
}

/// Runs one bounded attempt sequence against `source`
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | 2xx with JSON body | Return immediately |
/// | Transport error / non-2xx | Wait `delay`, retry while budget remains |
/// | 2xx with non-JSON body | Stop → `Malformed` |
/// | Budget spent | Stop → `RetriesExhausted` with the last error |
/// | Token cancelled during a wait | Stop → `Cancelled` |
///
/// # Arguments
///
/// * `source` - Where the payload comes from
/// * `policy` - Retry budget and delay
/// * `cancel` - Aborts a pending wait early
pub async fn fetch_with_retry(
    source: &dyn JsonSource,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<Fetched, FetchError> {
    let budget = policy.total_attempts();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        tracing::debug!("Attempt {}/{} for {}", attempt, budget, source.location());

        let error = match source.fetch().await {
            Ok(payload) => {
                tracing::info!(
                    "Attempt {}/{} succeeded for {}",
                    attempt,
                    budget,
                    source.location()
                );
                return Ok(Fetched {
                    payload,
                    attempts: attempt,
                });
            }
            Err(e) => e,
        };

        if !error.is_retryable() {
            tracing::error!("Attempt {}/{} returned an unusable body: {}", attempt, budget, error);
            return Err(FetchError::Malformed {
                attempt,
                source: error,
            });
        }

        tracing::warn!("Attempt {}/{} failed: {}", attempt, budget, error);

        if attempt >= budget {
            return Err(FetchError::RetriesExhausted {
                attempts: attempt,
                last_error: error,
            });
        }

        tracing::info!("Retrying in {}s", policy.delay.as_secs_f64());
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Retry wait cancelled after {} attempts", attempt);
                return Err(FetchError::Cancelled { attempts: attempt });
            }
            _ = tokio::time::sleep(policy.delay) => {}
        }
    }
}
