use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::container::{Constructor, Container};
use crate::discovery::TypeRecord;
use crate::error::InstantiationFailure;

/// Implemented by whatever `#[derive(Component)]`/`#[capability(...)]` in
/// `katalyst-macros` generate code for: [`Component::type_record`] describes
/// the type for the discovery manifest ([`crate::discovery::discover`] turns
/// it into a [`crate::ComponentDescriptor`]); [`Component::build`] constructs
/// it from dependencies already resolved out of the [`Container`].
pub trait Component: Sized + Send + Sync + 'static {
    fn type_record() -> TypeRecord;

    fn build(container: &Container) -> impl Future<Output = Result<Self, InstantiationFailure>> + Send;
}

/// Adapts [`Component::build`] into the type-erased [`Constructor`] shape a
/// [`crate::container::ContainerBuilder`] registers against — the one piece
/// of boilerplate a derive macro can't generate itself, since `Constructor`
/// erases `T` behind `Arc<dyn Any>` and the macro output is written in terms
/// of the concrete `T`.
pub fn constructor_for<T: Component>() -> Constructor {
    Arc::new(|container: Container| {
        let fut: Pin<Box<dyn Future<Output = Result<Arc<dyn Any + Send + Sync>, InstantiationFailure>> + Send>> =
            Box::pin(async move {
                let built = T::build(&container).await?;
                Ok(Arc::new(built) as Arc<dyn Any + Send + Sync>)
            });
        fut
    })
}
