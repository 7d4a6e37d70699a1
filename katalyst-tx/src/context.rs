use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

/// A transaction's identity. Wraps `uuid::Uuid::now_v7()` — a time-ordered,
/// lexically sortable 128-bit id (see DESIGN.md for why this is used in
/// place of a ULID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A queued, type-erased event: closes over the concrete event and the bus
/// it will eventually be published to, so the queue itself never needs to
/// know the event's concrete type (the context only promises
/// FIFO order and duplicate preservation, not type introspection).
pub type PendingEvent = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

struct Inner {
    id: TransactionId,
    depth: u32,
    pending: VecDeque<PendingEvent>,
    rollback_only: bool,
    error: Option<String>,
    metadata: HashMap<String, Box<dyn Any + Send + Sync>>,
}

/// Per-transaction scratch state.
///
/// Created on outermost transaction entry, destroyed on its exit. Nested
/// calls on the same worker reuse the outer context (see
/// [`crate::manager::current`]), incrementing/decrementing `depth`; events
/// queued at any depth belong to the outermost context. Single-threaded by
/// contract — the runtime requires handing a context to another worker to fail
/// a debug assertion; `Clone` here only hands out another reference to the
/// same shared state within one cooperative task, never across a `spawn`.
#[derive(Clone)]
pub struct TransactionContext {
    inner: Arc<Mutex<Inner>>,
}

impl TransactionContext {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                id: TransactionId::new(),
                depth: 1,
                pending: VecDeque::new(),
                rollback_only: false,
                error: None,
                metadata: HashMap::new(),
            })),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.inner.lock().unwrap().id
    }

    pub fn depth(&self) -> u32 {
        self.inner.lock().unwrap().depth
    }

    pub(crate) fn enter_nested(&self) {
        self.inner.lock().unwrap().depth += 1;
    }

    /// Returns the depth after decrement; `0` means this was the outermost
    /// scope and the context should now be discarded.
    pub(crate) fn exit(&self) -> u32 {
        let mut inner = self.inner.lock().unwrap();
        inner.depth = inner.depth.saturating_sub(1);
        inner.depth
    }

    pub fn queue(&self, event: PendingEvent) {
        self.inner.lock().unwrap().pending.push_back(event);
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    /// Drains every pending event in FIFO order, clearing the queue.
    pub fn drain_pending(&self) -> Vec<PendingEvent> {
        self.inner.lock().unwrap().pending.drain(..).collect()
    }

    /// Discards every pending event without dispatching them — called on
    /// rollback.
    pub fn clear_pending(&self) {
        self.inner.lock().unwrap().pending.clear();
    }

    /// Marks the context rollback-only (the runtime's `RollbackInitiated`):
    /// the block may otherwise complete normally, but the transaction still
    /// rolls back, and if this is a nested context, the eventual outer
    /// commit becomes a rollback too.
    pub fn mark_rollback_only(&self) {
        self.inner.lock().unwrap().rollback_only = true;
    }

    pub fn is_rollback_only(&self) -> bool {
        self.inner.lock().unwrap().rollback_only
    }

    pub fn set_error(&self, message: impl Into<String>) {
        self.inner.lock().unwrap().error = Some(message.into());
    }

    pub fn error(&self) -> Option<String> {
        self.inner.lock().unwrap().error.clone()
    }

    pub fn set_metadata<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.inner.lock().unwrap().metadata.insert(key.into(), Box::new(value));
    }

    /// Reads phase-local metadata under `key`, cloning it out via `f` while
    /// the lock is held (avoids returning a reference tied to the mutex
    /// guard's lifetime).
    pub fn metadata<T: Any + Send + Sync + Clone>(&self, key: &str) -> Option<T> {
        self.inner
            .lock()
            .unwrap()
            .metadata
            .get(key)
            .and_then(|boxed| boxed.downcast_ref::<T>())
            .cloned()
    }
}

impl Default for TransactionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nesting_increments_and_decrements_depth() {
        let ctx = TransactionContext::new();
        assert_eq!(ctx.depth(), 1);
        ctx.enter_nested();
        assert_eq!(ctx.depth(), 2);
        assert_eq!(ctx.exit(), 1);
        assert_eq!(ctx.exit(), 0);
    }

    #[test]
    fn metadata_round_trips_by_type() {
        let ctx = TransactionContext::new();
        ctx.set_metadata("attempt", 3u32);
        assert_eq!(ctx.metadata::<u32>("attempt"), Some(3));
        assert_eq!(ctx.metadata::<u32>("missing"), None);
    }

    #[test]
    fn rollback_only_flag_is_sticky_until_cleared_context() {
        let ctx = TransactionContext::new();
        assert!(!ctx.is_rollback_only());
        ctx.mark_rollback_only();
        assert!(ctx.is_rollback_only());
    }

    #[test]
    fn clear_pending_discards_without_draining() {
        let ctx = TransactionContext::new();
        ctx.queue(Box::new(|| Box::pin(async {})));
        ctx.queue(Box::new(|| Box::pin(async {})));
        assert_eq!(ctx.pending_count(), 2);
        ctx.clear_pending();
        assert_eq!(ctx.pending_count(), 0);
    }

    #[test]
    fn drain_pending_returns_fifo_order_and_empties_queue() {
        let ctx = TransactionContext::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            ctx.queue(Box::new(move || {
                Box::pin(async move {
                    order.lock().unwrap().push(i);
                })
            }));
        }
        assert_eq!(ctx.pending_count(), 3);
        let drained = ctx.drain_pending();
        assert_eq!(ctx.pending_count(), 0);
        assert_eq!(drained.len(), 3);
    }
}
