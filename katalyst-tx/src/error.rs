use std::fmt;

/// The failure a user transaction block reports.4's retry
/// taxonomy. `Deadlock`, `IoTimeout` and `ConnectionError` are recognized
/// directly so the retry policy can apply the the runtime's built-in
/// always/by-default-retryable rules without needing the caller to
/// register a classifier for them; anything else is `Application` and goes
/// through [`crate::config::RetryPolicy::classify`].
#[derive(Debug)]
pub enum BlockError<E> {
    Deadlock,
    IoTimeout,
    ConnectionError,
    Application(E),
}

impl<E: fmt::Display> fmt::Display for BlockError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockError::Deadlock => write!(f, "deadlock detected"),
            BlockError::IoTimeout => write!(f, "I/O timeout"),
            BlockError::ConnectionError => write!(f, "connection error"),
            BlockError::Application(inner) => write!(f, "{inner}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for BlockError<E> {}

/// The outcome [`crate::manager::TransactionManager::execute`] can return,
///.4's error taxonomy.
#[derive(Debug)]
pub enum TxError<E> {
    /// The block did not complete within `cfg.timeout`.
    Timeout,
    /// The retry policy's `max_attempts` was exhausted.
    RetriesExhausted { attempts: u32, cause: BlockError<E> },
    /// The user called `context.mark_rollback_only()`; the block otherwise
    /// completed, but the transaction was rolled back on its request.
    RollbackInitiated,
    /// A pre-commit hook raised an error, aborting the transaction.
    HookFailed { hook_id: String, cause: String },
    /// The adapter itself failed a begin/commit/rollback/on_phase call.
    AdapterFailed { operation: &'static str, cause: String },
    /// The block failed with a non-retryable error on its only/last attempt
    /// and retries were not applicable (e.g. `max_attempts == 1`).
    Block(BlockError<E>),
}

impl<E: fmt::Display + fmt::Debug> fmt::Display for TxError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxError::Timeout => write!(f, "transaction timed out"),
            TxError::RetriesExhausted { attempts, cause } => {
                write!(f, "retries exhausted after {attempts} attempt(s): {cause}")
            }
            TxError::RollbackInitiated => write!(f, "transaction marked rollback-only"),
            TxError::HookFailed { hook_id, cause } => write!(f, "hook `{hook_id}` failed: {cause}"),
            TxError::AdapterFailed { operation, cause } => write!(f, "adapter `{operation}` failed: {cause}"),
            TxError::Block(err) => write!(f, "{err}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for TxError<E> {}
