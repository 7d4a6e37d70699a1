use std::sync::Arc;
use std::time::Duration;

use katalyst_config::{well_known, ConfigProvider};

use crate::error::BlockError;

/// Isolation level passed to the driver on begin; `Default` means
/// driver-provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
    #[default]
    Default,
}

/// Retry delay shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Exponential,
    Linear,
    Immediate,
}

/// Whether a failed attempt should be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Retryable,
    NonRetryable,
}

/// Classifies a user error as retryable or not. `Deadlock` and the two
/// built-in [`BlockError`] driver-failure variants are always retryable
/// regardless of this predicate ("Deadlock is always retryable;
/// I/O timeouts and connection errors are retryable by default").
pub type RetryClassifier<E> = Arc<dyn Fn(&E) -> Classification + Send + Sync>;

/// Retry policy: max attempts, backoff strategy, and the classifier that
/// decides whether an [`crate::error::BlockError::Application`] error is
/// worth retrying.
#[derive(Clone)]
pub struct RetryPolicy<E> {
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_fraction: f64,
    pub classify: RetryClassifier<E>,
}

impl<E> RetryPolicy<E> {
    /// Defaults: 3 attempts, exponential, 100ms base / 30s cap,
    /// ±20% jitter. No user error is retryable by default — callers opt in
    /// by naming their retryable errors via `classify`, since the built-in
    /// `Deadlock`/`IoTimeout`/`ConnectionError` variants already cover the
    /// two examples the runtime calls out.
    pub fn defaults() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Exponential,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            jitter_fraction: 0.2,
            classify: Arc::new(|_: &E| Classification::NonRetryable),
        }
    }

    /// Whether `error` should trigger a retry, given this policy and the
    /// attempt count already spent (1-indexed; retry is only considered
    /// while `attempt < max_attempts`).
    pub(crate) fn should_retry(&self, error: &BlockError<E>, attempt: u32) -> bool {
        if attempt >= self.max_attempts {
            return false;
        }
        match error {
            BlockError::Deadlock => true,
            BlockError::IoTimeout => true,
            BlockError::ConnectionError => true,
            BlockError::Application(inner) => matches!((self.classify)(inner), Classification::Retryable),
        }
    }

    /// Delay before the next attempt:
    /// `min(base * 2^(n-1) * (1 ± jitter), maxDelay)` for exponential,
    /// `base * n` for linear, `0` for immediate. `n` is 1-indexed: the delay
    /// before the second attempt uses `n = 1`.
    ///
    /// `jitter_sample` is a caller-supplied value in `[-1.0, 1.0]` rather
    /// than an internally drawn random number, so the computed delay stays
    /// deterministic and testable; production callers pass a real random
    /// sample in that range.
    pub fn delay_for_attempt(&self, n: u32, jitter_sample: f64) -> Duration {
        match self.backoff {
            Backoff::Immediate => Duration::ZERO,
            Backoff::Linear => self.base_delay * n,
            Backoff::Exponential => {
                let exponent = n.saturating_sub(1);
                let factor = 2f64.powi(exponent as i32);
                let jittered = factor * (1.0 + self.jitter_fraction * jitter_sample.clamp(-1.0, 1.0));
                let millis = (self.base_delay.as_secs_f64() * jittered.max(0.0) * 1000.0).round();
                Duration::from_millis(millis as u64).min(self.max_delay)
            }
        }
    }
}

/// Immutable transaction settings Defaults: 30s timeout, the
/// [`RetryPolicy::defaults`] retry policy, `IsolationLevel::Default`.
#[derive(Clone)]
pub struct TransactionConfig<E> {
    pub timeout: Duration,
    pub retry: RetryPolicy<E>,
    pub isolation: IsolationLevel,
}

impl<E> TransactionConfig<E> {
    pub fn defaults() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::defaults(),
            isolation: IsolationLevel::Default,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy<E>) -> Self {
        self.retry = retry;
        self
    }

    /// Builds defaults, then overlays whichever of `katalyst.tx.timeout.ms`,
    /// `katalyst.tx.retry.maxAttempts` and `katalyst.tx.retry.backoff` the
    /// provider has set, per the runtime's recognized-options table. A key the
    /// provider doesn't have, or a `backoff` value that isn't one of
    /// `exponential`/`linear`/`immediate`, leaves the corresponding default
    /// untouched rather than erroring — the core's own config layer has no
    /// schema validation pass, only the typed-access contract.
    pub fn from_provider(provider: &dyn ConfigProvider) -> Self {
        let mut cfg = Self::defaults();
        if let Some(ms) = provider.get_long(well_known::TX_TIMEOUT_MS) {
            if ms > 0 {
                cfg.timeout = Duration::from_millis(ms as u64);
            }
        }
        if let Some(max_attempts) = provider.get_int(well_known::TX_RETRY_MAX_ATTEMPTS) {
            if max_attempts > 0 {
                cfg.retry.max_attempts = max_attempts as u32;
            }
        }
        if let Some(backoff) = provider.get_string(well_known::TX_RETRY_BACKOFF) {
            cfg.retry.backoff = match backoff.as_str() {
                "exponential" => Backoff::Exponential,
                "linear" => Backoff::Linear,
                "immediate" => Backoff::Immediate,
                other => {
                    tracing::warn!(value = other, "unrecognized katalyst.tx.retry.backoff, keeping default");
                    cfg.retry.backoff
                }
            };
        }
        cfg
    }
}
