use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::capability::Capability;
use crate::error::{ContainerError, InstantiationFailure};
use crate::registry::ComponentRegistry;

type AnyArc = Arc<dyn Any + Send + Sync>;
type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A component's asynchronous constructor, erased to operate over the
/// container rather than a concrete dependency type.
///
/// Generalized from "build this one concrete type" to "build whatever
/// descriptor this constructor was registered under", since the container
/// does not know concrete component types at the call site — only at
/// registration, where the closure captures them.
pub type Constructor = Arc<dyn Fn(Container) -> BoxFuture<'static, Result<AnyArc, InstantiationFailure>> + Send + Sync>;

struct Entry {
    descriptor_name: String,
    constructor: Constructor,
    cell: OnceCell<AnyArc>,
}

/// The runtime container: a frozen [`ComponentRegistry`] plus one lazily
/// initialized singleton slot per descriptor.
///
/// Construction is exactly-once per descriptor under concurrent resolution
/// — `tokio::sync::OnceCell::get_or_try_init` is used instead of
/// `std::sync::OnceLock` because component constructors are `async fn`s
/// that may themselves resolve further dependencies or await I/O.
#[derive(Clone)]
pub struct Container {
    registry: Arc<ComponentRegistry>,
    entries: Arc<HashMap<String, Arc<Entry>>>,
}

impl Container {
    pub fn builder(registry: Arc<ComponentRegistry>) -> ContainerBuilder {
        ContainerBuilder {
            registry,
            entries: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Resolves the primary (or sole) binding for `contract`, downcast to
    /// `T`. Fails with [`ContainerError::Unregistered`] if no binding
    /// exists, or [`ContainerError::TypeMismatch`] if the registered
    /// binding's concrete type does not match `T`.
    pub async fn resolve<T: Send + Sync + 'static>(&self, contract: &Capability) -> Result<Arc<T>, ContainerError> {
        let binding = self
            .registry
            .primary_binding_for(contract)
            .ok_or_else(|| ContainerError::Unregistered(contract.clone()))?;
        self.resolve_named(&binding.descriptor_name).await
    }

    /// Resolves every binding of a multi-binding contract, in the
    /// registry's priority order.
    pub async fn resolve_all<T: Send + Sync + 'static>(&self, contract: &Capability) -> Result<Vec<Arc<T>>, ContainerError> {
        let names: Vec<String> = self
            .registry
            .bindings_for(contract)
            .into_iter()
            .map(|b| b.descriptor_name.clone())
            .collect();

        let mut resolved = Vec::with_capacity(names.len());
        for name in names {
            resolved.push(self.resolve_named(&name).await?);
        }
        Ok(resolved)
    }

    async fn resolve_named<T: Send + Sync + 'static>(&self, descriptor_name: &str) -> Result<Arc<T>, ContainerError> {
        let any = self.resolve_any(descriptor_name).await?;
        any.downcast::<T>().map_err(|_| ContainerError::TypeMismatch {
            contract: Capability::new(descriptor_name.to_string()),
            expected: std::any::type_name::<T>(),
        })
    }

    async fn resolve_any(&self, descriptor_name: &str) -> Result<AnyArc, ContainerError> {
        let entry = self
            .entries
            .get(descriptor_name)
            .ok_or_else(|| ContainerError::Unregistered(Capability::new(descriptor_name.to_string())))?
            .clone();

        let container = self.clone();
        let constructor = entry.constructor.clone();
        let built = entry
            .cell
            .get_or_try_init(move || constructor(container))
            .await
            .map_err(|failure| ContainerError::Instantiation(InstantiationFailure {
                descriptor: entry.descriptor_name.clone(),
                cause: failure.cause.clone(),
            }))?;
        Ok(built.clone())
    }

    /// Eagerly constructs every registered descriptor, in `order` (the
    /// resolver's topological construction order). Used at bootstrap P4 to
    /// surface a single `InstantiationFailure` before the application is
    /// considered ready, rather than deferring failures to first use.
    pub async fn eager_init_all(&self, order: &[String]) -> Result<(), InstantiationFailure> {
        for name in order {
            self.resolve_any(name).await.map_err(|err| match err {
                ContainerError::Instantiation(failure) => failure,
                other => InstantiationFailure {
                    descriptor: name.clone(),
                    cause: other.to_string(),
                },
            })?;
        }
        Ok(())
    }
}

pub struct ContainerBuilder {
    registry: Arc<ComponentRegistry>,
    entries: HashMap<String, Arc<Entry>>,
}

impl ContainerBuilder {
    pub fn constructor(mut self, descriptor_name: impl Into<String>, constructor: Constructor) -> Self {
        let descriptor_name = descriptor_name.into();
        self.entries.insert(
            descriptor_name.clone(),
            Arc::new(Entry {
                descriptor_name,
                constructor,
                cell: OnceCell::new(),
            }),
        );
        self
    }

    pub fn build(self) -> Container {
        Container {
            registry: self.registry,
            entries: Arc::new(self.entries),
        }
    }
}
