use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{RwLock, Semaphore};

/// Error a handler may return; collected and forwarded to the bus's
/// [`ErrorSink`] rather than propagated to the publisher ("errors
/// are collected and reported via a configured error sink").
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Receives handler failures the bus does not propagate to the caller.
pub trait ErrorSink: Send + Sync {
    fn report(&self, event_type: &'static str, error: HandlerError);
}

/// Default [`ErrorSink`]: logs via `tracing`.
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, event_type: &'static str, error: HandlerError) {
        tracing::error!(event_type, %error, "event handler failed");
    }
}

/// How `publish` dispatches to handlers: "synchronous by
/// default (same worker) unless the bus is configured with a worker-pool
/// dispatcher". A worker-pool dispatcher is bounded by a semaphore so an
/// unbounded flood of publishes cannot spawn unbounded concurrent handler
/// tasks.
pub enum Dispatcher {
    /// Handlers run sequentially on the publishing worker, in registration
    /// order. The default — required for the ordering guarantee in the runtime
    /// ("handlers for one event type dispatch in registration order").
    Inline,
    /// Handlers are spawned onto the Tokio runtime, at most `max_concurrent`
    /// running at once across all event types.
    WorkerPool { max_concurrent: usize },
}

type Handler =
    Arc<dyn Fn(Arc<dyn Any + Send + Sync>) -> Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send>> + Send + Sync>;

/// Routes a published event to every handler registered for its concrete
/// type
///
/// A trait (rather than a single concrete struct) so that [`katalyst_tx`]'s
/// transactional decorator can wrap any `EventBus` implementation, including
/// another decorator.
pub trait EventBus: Send + Sync {
    fn subscribe<E, F, Fut>(&self, handler: F) -> impl Future<Output = ()> + Send
    where
        E: Send + Sync + 'static,
        F: Fn(Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static;

    /// Publishes `event` to every handler of its concrete type. Outside any
    /// transaction this dispatches immediately; inside one, a transactional
    /// decorator instead queues it.
    fn publish<E: Send + Sync + 'static>(&self, event: E) -> impl Future<Output = ()> + Send;
}

/// In-process, `TypeId`-keyed event bus.
///
/// Supports the two [`Dispatcher`] modes below, with handler errors
/// collected into an [`ErrorSink`] instead of panicking the spawned task.
#[derive(Clone)]
pub struct LocalEventBus {
    handlers: Arc<RwLock<HashMap<TypeId, Vec<Handler>>>>,
    dispatcher: Arc<Dispatcher>,
    error_sink: Arc<dyn ErrorSink>,
}

impl LocalEventBus {
    pub fn new() -> Self {
        Self::with(Dispatcher::Inline, Arc::new(TracingErrorSink))
    }

    pub fn with(dispatcher: Dispatcher, error_sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            dispatcher: Arc::new(dispatcher),
            error_sink,
        }
    }

    pub fn worker_pool(max_concurrent: usize, error_sink: Arc<dyn ErrorSink>) -> Self {
        Self::with(Dispatcher::WorkerPool { max_concurrent }, error_sink)
    }

    async fn dispatch_to(&self, type_id: TypeId, event: Arc<dyn Any + Send + Sync>, event_type: &'static str) {
        let handlers = self.handlers.read().await;
        let Some(subs) = handlers.get(&type_id) else {
            return;
        };
        let subs = subs.clone();
        drop(handlers);

        match self.dispatcher.as_ref() {
            Dispatcher::Inline => {
                for handler in &subs {
                    if let Err(error) = handler(event.clone()).await {
                        self.error_sink.report(event_type, error);
                    }
                }
            }
            Dispatcher::WorkerPool { max_concurrent } => {
                let semaphore = Arc::new(Semaphore::new((*max_concurrent).max(1)));
                let mut tasks = Vec::with_capacity(subs.len());
                for handler in &subs {
                    let permit = semaphore.clone().acquire_owned().await.expect("semaphore closed");
                    let handler = handler.clone();
                    let event = event.clone();
                    tasks.push(tokio::spawn(async move {
                        let result = handler(event).await;
                        drop(permit);
                        result
                    }));
                }
                for task in tasks {
                    if let Ok(Err(error)) = task.await {
                        self.error_sink.report(event_type, error);
                    }
                }
            }
        }
    }
}

impl Default for LocalEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus for LocalEventBus {
    fn subscribe<E, F, Fut>(&self, handler: F) -> impl Future<Output = ()> + Send
    where
        E: Send + Sync + 'static,
        F: Fn(Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let handlers = self.handlers.clone();
        async move {
            let type_id = TypeId::of::<E>();
            let wrapped: Handler = Arc::new(move |any| {
                let event = any.downcast::<E>().expect("event type mismatch");
                Box::pin(handler(event))
            });
            let mut map = handlers.write().await;
            map.entry(type_id).or_default().push(wrapped);
        }
    }

    fn publish<E: Send + Sync + 'static>(&self, event: E) -> impl Future<Output = ()> + Send {
        let bus = self.clone();
        async move {
            let type_id = TypeId::of::<E>();
            let event: Arc<dyn Any + Send + Sync> = Arc::new(event);
            bus.dispatch_to(type_id, event, std::any::type_name::<E>()).await;
        }
    }
}
