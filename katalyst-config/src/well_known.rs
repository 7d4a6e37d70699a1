//! Recognized core-level configuration keys
//!
//! These constants exist so call sites don't hand-type the dotted key
//! strings; `katalyst-config` itself never reads them — `katalyst-tx` and
//! `katalyst-scheduler` consult the relevant ones when building their
//! default configs from a [`crate::ConfigProvider`].

/// Profile name; additive overlay applied on top of the base configuration.
pub const PROFILE: &str = "katalyst.profile";
/// Verbose `FatalValidation` reports when truthy.
pub const DI_VERBOSE: &str = "katalyst.di.verbose";
/// Default transaction timeout, in milliseconds.
pub const TX_TIMEOUT_MS: &str = "katalyst.tx.timeout.ms";
/// Default maximum retry attempts for a transaction.
pub const TX_RETRY_MAX_ATTEMPTS: &str = "katalyst.tx.retry.maxAttempts";
/// Retry backoff strategy: `exponential` | `linear` | `immediate`.
pub const TX_RETRY_BACKOFF: &str = "katalyst.tx.retry.backoff";
/// Scheduler cooperative-cancellation grace period, in milliseconds.
pub const SCHEDULER_GRACE_PERIOD_MS: &str = "katalyst.scheduler.gracePeriodMs";
