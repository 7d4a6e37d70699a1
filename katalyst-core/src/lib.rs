//! Component registry, dependency resolver and lazy async container.
//!
//! Given a manifest of discovered types (produced by `katalyst-macros` or
//! registered by hand), builds a dependency graph, validates it
//! exhaustively, and constructs singletons lazily and exactly once under
//! concurrent resolution.

pub mod capability;
pub mod component;
pub mod container;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod generics;
pub mod registry;
pub mod resolver;

pub use capability::Capability;
pub use component::{constructor_for, Component};
pub use container::{Constructor, Container, ContainerBuilder};
pub use descriptor::{ComponentDescriptor, ComponentDescriptorBuilder, ConstructorParam, GenericBindings, TypeHandle};
pub use discovery::{discover, Predicate, TypeRecord};
pub use error::{ContainerError, FatalValidation, InstantiationFailure, RegistryError, ValidationError};
pub use registry::{ComponentRegistry, OverridePolicy};
pub use resolver::DependencyResolver;
