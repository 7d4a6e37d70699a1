//! Transactional execution engine for the Katalyst runtime.
//!
//! [`TransactionManager::execute`] drives a six-phase hook lifecycle around
//! a user-supplied block and an [`Adapter`], with timeout, retry/backoff,
//! and nested-transaction participation. [`TxAwareBus`] decorates a
//! [`katalyst_events::EventBus`] so that events published inside a
//! transaction are queued on its [`TransactionContext`] and only dispatched
//! once the transaction actually commits.

mod adapter;
mod config;
mod context;
mod error;
mod hook;
mod manager;
mod tx_bus;

pub use adapter::{Adapter, AdapterError, CompositeAdapter, DynAdapter};
pub use config::{Backoff, Classification, IsolationLevel, RetryClassifier, RetryPolicy, TransactionConfig};
pub use context::{PendingEvent, TransactionContext, TransactionId};
pub use error::{BlockError, TxError};
pub use hook::{Hook, HookError, HookRegistry, Phase};
pub use manager::{current, TransactionManager};
pub use tx_bus::TxAwareBus;
