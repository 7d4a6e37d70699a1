//! `use katalyst::prelude::*;` pulls in the pieces most embedders touch:
//! the orchestrator, its extension traits, and the cross-crate types their
//! signatures reference.

pub use katalyst_core::{
    discover, Capability, ComponentDescriptor, ComponentDescriptorBuilder, ComponentRegistry,
    Constructor, Container, ContainerBuilder, DependencyResolver, FatalValidation,
    InstantiationFailure, OverridePolicy, Predicate, RegistryError, TypeHandle, TypeRecord,
};
pub use katalyst_config::{well_known as config_keys, ConfigProvider, MapConfigProvider};
pub use katalyst_events::{EventBus, LocalEventBus};
pub use katalyst_scheduler::{ScheduleConfig, Scheduler};
pub use katalyst_tx::{Adapter, CompositeAdapter, Hook, Phase as TxPhase, TransactionConfig, TransactionManager};

pub use katalyst_macros::{producer, Component};

pub use crate::feature::{Feature, FeatureError};
pub use crate::initializer::{Initializer, InitializerError};
pub use crate::orchestrator::{BootstrapError, BootstrapOrchestrator, LifecycleError, Phase, RunningApp};
pub use crate::schema::{SchemaError, SchemaInstaller, TableDescriptor};
