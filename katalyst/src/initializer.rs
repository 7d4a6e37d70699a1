use std::future::Future;
use std::pin::Pin;

pub type InitializerError = Box<dyn std::error::Error + Send + Sync>;
type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// P5's "run every Initializer component in declared order" — anything the
/// embedder wants run once, after adapters are registered, before the
/// application is considered started.
///
/// Dyn-compatible by construction (boxed future, no generic method), the
/// same trick `katalyst_tx::DynAdapter` uses to let the orchestrator hold a
/// `Vec<Box<dyn Initializer>>` of heterogeneous concrete types.
pub trait Initializer: Send + Sync {
    fn name(&self) -> &'static str;

    fn initialize<'a>(&'a self) -> BoxFuture<'a, Result<(), InitializerError>>;
}
