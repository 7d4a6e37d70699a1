use std::future::Future;
use std::pin::Pin;

use crate::config::IsolationLevel;
use crate::context::TransactionContext;
use crate::hook::Phase;

pub type AdapterError = Box<dyn std::error::Error + Send + Sync>;

/// The resource driver a [`crate::manager::TransactionManager`] speaks to,
/// An in-memory store, a SQL connection pool and a message
/// queue producer each implement this the same way a bean implements a
/// capability in the registry: the manager drives the phases, the adapter
/// supplies the resource-specific begin/commit/rollback.
pub trait Adapter: Send + Sync {
    fn begin(&self, isolation: IsolationLevel) -> impl Future<Output = Result<(), AdapterError>> + Send;

    fn commit(&self) -> impl Future<Output = Result<(), AdapterError>> + Send;

    fn rollback(&self) -> impl Future<Output = Result<(), AdapterError>> + Send;

    /// Notified for every phase the manager passes through, after the
    /// manager's own hook registry has run the same phase. Adapters that
    /// have nothing to do on a given phase can return `Ok(())` immediately.
    fn on_phase(&self, phase: Phase, ctx: &TransactionContext) -> impl Future<Output = Result<(), AdapterError>> + Send;
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe mirror of [`Adapter`] with boxed-future signatures, so a
/// dynamic number of adapters discovered at bootstrap ("multiple
/// adapters may be registered") can be stored as `Box<dyn DynAdapter>` —
/// `Adapter` itself isn't dyn-compatible because its methods return `impl
/// Future`.
pub trait DynAdapter: Send + Sync {
    fn begin<'a>(&'a self, isolation: IsolationLevel) -> BoxFuture<'a, Result<(), AdapterError>>;
    fn commit<'a>(&'a self) -> BoxFuture<'a, Result<(), AdapterError>>;
    fn rollback<'a>(&'a self) -> BoxFuture<'a, Result<(), AdapterError>>;
    fn on_phase<'a>(&'a self, phase: Phase, ctx: &'a TransactionContext) -> BoxFuture<'a, Result<(), AdapterError>>;
}

impl<A: Adapter> DynAdapter for A {
    fn begin<'a>(&'a self, isolation: IsolationLevel) -> BoxFuture<'a, Result<(), AdapterError>> {
        Box::pin(Adapter::begin(self, isolation))
    }

    fn commit<'a>(&'a self) -> BoxFuture<'a, Result<(), AdapterError>> {
        Box::pin(Adapter::commit(self))
    }

    fn rollback<'a>(&'a self) -> BoxFuture<'a, Result<(), AdapterError>> {
        Box::pin(Adapter::rollback(self))
    }

    fn on_phase<'a>(&'a self, phase: Phase, ctx: &'a TransactionContext) -> BoxFuture<'a, Result<(), AdapterError>> {
        Box::pin(Adapter::on_phase(self, phase, ctx))
    }
}

/// Fans a single [`Adapter`] call out to every registered `Box<dyn
/// DynAdapter>`, in registration order: "all participate in
/// every phase in registration order; any adapter failure in pre-commit
/// triggers rollback across all." The manager only ever talks to one
/// `Adapter`; bootstrap P5 builds one `CompositeAdapter` from however many
/// `Adapter`-capability components the registry discovered and hands that
/// to the [`crate::manager::TransactionManager`].
pub struct CompositeAdapter {
    adapters: Vec<Box<dyn DynAdapter>>,
}

impl CompositeAdapter {
    pub fn new(adapters: Vec<Box<dyn DynAdapter>>) -> Self {
        Self { adapters }
    }
}

impl Adapter for CompositeAdapter {
    async fn begin(&self, isolation: IsolationLevel) -> Result<(), AdapterError> {
        for adapter in &self.adapters {
            adapter.begin(isolation).await?;
        }
        Ok(())
    }

    async fn commit(&self) -> Result<(), AdapterError> {
        for adapter in &self.adapters {
            adapter.commit().await?;
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<(), AdapterError> {
        // Every adapter gets a chance to roll back even if an earlier one
        // fails — rollback is already the failure path, so swallowing and
        // reporting the first error (rather than aborting the loop) avoids
        // leaving later adapters in a half-rolled-back state.
        let mut first_err = None;
        for adapter in &self.adapters {
            if let Err(err) = adapter.rollback().await {
                tracing::error!(%err, "adapter rollback failed, continuing to roll back remaining adapters");
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn on_phase(&self, phase: Phase, ctx: &TransactionContext) -> Result<(), AdapterError> {
        for adapter in &self.adapters {
            adapter.on_phase(phase, ctx).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingAdapter {
        pub events: Mutex<Vec<String>>,
        pub fail_on_commit: bool,
    }

    impl Adapter for RecordingAdapter {
        async fn begin(&self, isolation: IsolationLevel) -> Result<(), AdapterError> {
            self.events.lock().unwrap().push(format!("begin:{isolation:?}"));
            Ok(())
        }

        async fn commit(&self) -> Result<(), AdapterError> {
            if self.fail_on_commit {
                return Err("commit failed".into());
            }
            self.events.lock().unwrap().push("commit".to_string());
            Ok(())
        }

        async fn rollback(&self) -> Result<(), AdapterError> {
            self.events.lock().unwrap().push("rollback".to_string());
            Ok(())
        }

        async fn on_phase(&self, phase: Phase, _ctx: &TransactionContext) -> Result<(), AdapterError> {
            self.events.lock().unwrap().push(format!("phase:{phase:?}"));
            Ok(())
        }
    }
}
