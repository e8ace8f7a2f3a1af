//! Provider call retry logic
//!
//! Implements exponential backoff for transient provider failures (network
//! errors, 429, 5xx) plus a failure-threshold circuit breaker shared by all
//! calls to one provider. Permanent errors fail immediately.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tunesmith_common::{Error, Result};

/// Backoff parameters for one provider call site
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

/// Retry `operation` with exponential backoff while it fails transiently.
///
/// Permanent errors return immediately; transient errors retry until
/// `max_attempts`, doubling the delay each time up to `max_delay`.
pub async fn with_backoff<F, Fut, T>(
    operation_name: &str,
    policy: &BackoffPolicy,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut delay = policy.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        "Provider call succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if !err.is_transient() {
                    return Err(err);
                }
                if attempt >= policy.max_attempts {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Provider call failed, retries exhausted"
                    );
                    return Err(err);
                }

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = delay.as_millis() as u64,
                    error = %err,
                    "Provider call failed, will retry after backoff"
                );

                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(policy.max_delay);
            }
        }
    }
}

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u32,
    open_until: Option<Instant>,
}

/// Failure-threshold circuit breaker
///
/// After `threshold` consecutive transient failures the circuit opens and
/// calls are rejected for `cooldown` without touching the provider. The
/// first call after the cooldown acts as the probe.
pub struct CircuitBreaker {
    name: String,
    threshold: u32,
    cooldown: Duration,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, threshold: u32, cooldown: Duration) -> Self {
        Self {
            name: name.into(),
            threshold,
            cooldown,
            state: Mutex::new(BreakerState::default()),
        }
    }

    /// Default breaker for a provider: 5 consecutive failures, 30s cooldown
    pub fn for_provider(name: impl Into<String>) -> Self {
        Self::new(name, 5, Duration::from_secs(30))
    }

    /// Run `operation` through the breaker.
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        {
            let mut state = self.state.lock().await;
            if let Some(until) = state.open_until {
                if Instant::now() < until {
                    return Err(Error::ProviderUnavailable(format!(
                        "{} is unavailable (circuit open)",
                        self.name
                    )));
                }
                // Cooldown elapsed; let this call probe the provider.
                state.open_until = None;
            }
        }

        match operation().await {
            Ok(result) => {
                let mut state = self.state.lock().await;
                state.consecutive_failures = 0;
                Ok(result)
            }
            Err(err) => {
                if err.is_transient() {
                    let mut state = self.state.lock().await;
                    state.consecutive_failures += 1;
                    if state.consecutive_failures >= self.threshold {
                        state.open_until = Some(Instant::now() + self.cooldown);
                        tracing::warn!(
                            provider = %self.name,
                            failures = state.consecutive_failures,
                            cooldown_ms = self.cooldown.as_millis() as u64,
                            "Circuit opened after consecutive provider failures"
                        );
                    }
                }
                Err(err)
            }
        }
    }
}
