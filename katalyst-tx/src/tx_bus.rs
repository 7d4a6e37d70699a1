use std::future::Future;
use std::sync::Arc;

use katalyst_events::{EventBus, HandlerError};

use crate::manager::current;

/// Decorates any [`EventBus`] so publishes made inside a transaction queue
/// into that transaction's context instead of dispatching immediately, per
/// the runtime. Outside a transaction it is transparent: `publish` forwards
/// straight to the wrapped bus.
///
/// Subscriptions always go straight to the wrapped bus — only publishing is
/// transaction-aware.
#[derive(Clone)]
pub struct TxAwareBus<B> {
    inner: Arc<B>,
}

impl<B: EventBus + 'static> TxAwareBus<B> {
    pub fn new(inner: B) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

impl<B: EventBus + 'static> EventBus for TxAwareBus<B> {
    fn subscribe<E, F, Fut>(&self, handler: F) -> impl Future<Output = ()> + Send
    where
        E: Send + Sync + 'static,
        F: Fn(Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let inner = self.inner.clone();
        async move { inner.subscribe(handler).await }
    }

    fn publish<E: Send + Sync + 'static>(&self, event: E) -> impl Future<Output = ()> + Send {
        let inner = self.inner.clone();
        async move {
            match current() {
                Some(ctx) => {
                    ctx.queue(Box::new(move || {
                        Box::pin(async move { inner.publish(event).await })
                    }));
                }
                None => inner.publish(event).await,
            }
        }
    }
}
