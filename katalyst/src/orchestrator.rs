use std::fmt;
use std::sync::Arc;

use katalyst_config::ConfigProvider;
use katalyst_core::{
    discover, Capability, ComponentRegistry, Constructor, Container, DependencyResolver,
    FatalValidation, InstantiationFailure, OverridePolicy, Predicate, RegistryError, TypeRecord,
};
use katalyst_scheduler::Scheduler;
use katalyst_tx::{Adapter, CompositeAdapter, DynAdapter, Hook, TransactionManager};

use crate::feature::{Feature, FeatureError};
use crate::initializer::{Initializer, InitializerError};
use crate::schema::{SchemaError, SchemaInstaller, TableDescriptor};

/// The five linear stages bootstrap runs through, in order, never revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// P1 — load core and declared feature modules; register their bindings.
    ModuleLoad,
    /// P2 — call each feature's `on_ready` hook, in registration order.
    HookReadiness,
    /// P3 — walk the discovery manifest, register the components it
    /// produces, freeze the registry, and validate the whole graph.
    Discovery,
    /// P4 — eagerly construct singletons (if requested) and hand any
    /// `Table` descriptors to the configured schema installer.
    SchemaBootstrap,
    /// P5 — build the composite transaction adapter and run every
    /// registered `Initializer`, in declared order.
    AdapterAndInitializers,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::ModuleLoad => "P1 module load",
            Phase::HookReadiness => "P2 hook readiness",
            Phase::Discovery => "P3 component discovery & validation",
            Phase::SchemaBootstrap => "P4 persistence schema bootstrap",
            Phase::AdapterAndInitializers => "P5 adapter & initializer registration",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// What went wrong inside a given [`Phase`].
#[derive(Debug)]
pub enum LifecycleError {
    ModuleLoad { feature: String, cause: String },
    HookReadiness { feature: String, cause: String },
    /// The `bool` is the `katalyst.di.verbose` setting at the time P3 ran:
    /// `true` renders every accumulated error, `false` renders the top-N
    /// summary (see [`crate::orchestrator::BootstrapOrchestrator::with_config`]).
    Discovery(FatalValidation, bool),
    Registration(RegistryError),
    Instantiation(InstantiationFailure),
    SchemaBootstrap { cause: String },
    Initializer { name: String, cause: String },
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::ModuleLoad { feature, cause } => {
                write!(f, "feature `{feature}` failed to register: {cause}")
            }
            LifecycleError::HookReadiness { feature, cause } => {
                write!(f, "feature `{feature}` failed on_ready: {cause}")
            }
            LifecycleError::Discovery(report, verbose) => {
                if *verbose {
                    write!(f, "{}", report.verbose())
                } else {
                    write!(f, "{report}")
                }
            }
            LifecycleError::Registration(err) => write!(f, "{err}"),
            LifecycleError::Instantiation(failure) => write!(f, "{failure}"),
            LifecycleError::SchemaBootstrap { cause } => write!(f, "schema bootstrap failed: {cause}"),
            LifecycleError::Initializer { name, cause } => {
                write!(f, "initializer `{name}` failed: {cause}")
            }
        }
    }
}

impl std::error::Error for LifecycleError {}

/// A fatal bootstrap failure: which phase it happened in, plus the cause.
///
/// `Display` renders a banner report for [`LifecycleError::Discovery`] (the
/// aggregate [`FatalValidation`] report) and a one-line message for every
/// other phase — "fatal bootstrap failures produce a structured report on
/// the configured error sink".
#[derive(Debug)]
pub struct BootstrapError {
    pub phase: Phase,
    pub error: LifecycleError,
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            LifecycleError::Discovery(..) => write!(f, "{}", self.error),
            _ => write!(f, "bootstrap failed at {}: {}", self.phase.label(), self.error),
        }
    }
}

impl std::error::Error for BootstrapError {}

fn all_records(_record: &TypeRecord) -> bool {
    true
}

/// A fully bootstrapped application: the frozen registry, the container
/// built over it, the transaction manager, and the scheduler, handed back
/// once P1 through P5 complete without a fatal error.
pub struct RunningApp {
    pub registry: Arc<ComponentRegistry>,
    pub container: Container,
    pub construction_order: Vec<String>,
    pub transactions: Arc<TransactionManager<CompositeAdapter>>,
    pub scheduler: Scheduler,
}

impl RunningApp {
    /// Best-effort teardown: stop the scheduler's fire-and-sleep loops.
    /// The container has nothing to release beyond dropping its `Arc`s.
    pub fn stop(&self) {
        self.scheduler.shutdown();
    }
}

/// Drives the five-phase bootstrap sequence described in the runtime's
/// component design: module load, hook readiness, discovery & validation,
/// schema bootstrap, adapter & initializer registration.
///
/// A runtime state machine rather than a compile-time type-list: Rust has
/// no classpath to reflect over at startup, so every unit this orchestrator
/// wires in — features, constructors, adapters, initializers — is handed
/// to it explicitly by the embedder instead of discovered by annotation
/// scanning.
pub struct BootstrapOrchestrator<'a> {
    manifest: &'a [TypeRecord],
    predicate: Box<dyn Predicate>,
    override_policy: OverridePolicy,
    features: Vec<Box<dyn Feature>>,
    constructors: Vec<(String, Constructor)>,
    eager_init: bool,
    verbose_validation: bool,
    schema_installer: Option<Box<dyn SchemaInstaller>>,
    adapters: Vec<Box<dyn DynAdapter>>,
    hooks: Vec<Hook>,
    initializers: Vec<Box<dyn Initializer>>,
    scheduler: Option<Scheduler>,
}

impl<'a> BootstrapOrchestrator<'a> {
    pub fn new(manifest: &'a [TypeRecord]) -> Self {
        Self {
            manifest,
            predicate: Box::new(all_records as fn(&TypeRecord) -> bool),
            override_policy: OverridePolicy::Reject,
            features: Vec::new(),
            constructors: Vec::new(),
            eager_init: false,
            verbose_validation: false,
            schema_installer: None,
            adapters: Vec::new(),
            hooks: Vec::new(),
            initializers: Vec::new(),
            scheduler: None,
        }
    }

    /// Reads `katalyst.di.verbose` (and anything else a future flag needs)
    /// from a provider and configures the orchestrator accordingly. Per
    /// spec §6 this toggles the verbose/summary mode of the P3
    /// `FatalValidation` report only — it has no bearing on eager
    /// construction, which is opted into separately via [`Self::eager_init`].
    pub fn with_config(mut self, provider: &dyn ConfigProvider) -> Self {
        self.verbose_validation = provider
            .get_bool(katalyst_config::well_known::DI_VERBOSE)
            .unwrap_or(self.verbose_validation);
        self
    }

    pub fn with_predicate(mut self, predicate: impl Predicate + 'static) -> Self {
        self.predicate = Box::new(predicate);
        self
    }

    pub fn with_override_policy(mut self, policy: OverridePolicy) -> Self {
        self.override_policy = policy;
        self
    }

    pub fn with_feature(mut self, feature: impl Feature + 'static) -> Self {
        self.features.push(Box::new(feature));
        self
    }

    pub fn with_constructor(mut self, descriptor_name: impl Into<String>, constructor: Constructor) -> Self {
        self.constructors.push((descriptor_name.into(), constructor));
        self
    }

    /// Eagerly construct every singleton in topological order at P4 instead
    /// of leaving them lazy. Off by default — singletons are lazy unless
    /// an embedder opts into surfacing construction failures at bootstrap.
    pub fn eager_init(mut self, eager: bool) -> Self {
        self.eager_init = eager;
        self
    }

    pub fn with_schema_installer(mut self, installer: impl SchemaInstaller + 'static) -> Self {
        self.schema_installer = Some(Box::new(installer));
        self
    }

    pub fn with_adapter(mut self, adapter: impl Adapter + 'static) -> Self {
        self.adapters.push(Box::new(adapter));
        self
    }

    pub fn with_hook(mut self, hook: Hook) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn with_initializer(mut self, initializer: impl Initializer + 'static) -> Self {
        self.initializers.push(Box::new(initializer));
        self
    }

    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Runs P1 through P5 in order, aborting at the first fatal phase.
    pub async fn run(self) -> Result<RunningApp, BootstrapError> {
        let mut registry = ComponentRegistry::new(self.override_policy);

        // P1 — module load: register every feature's own bindings.
        for feature in &self.features {
            feature.register(&mut registry).map_err(|err: RegistryError| BootstrapError {
                phase: Phase::ModuleLoad,
                error: LifecycleError::ModuleLoad {
                    feature: feature.name().to_string(),
                    cause: err.to_string(),
                },
            })?;
        }

        // P2 — hook readiness: every feature's on_ready, in registration order.
        for feature in &self.features {
            feature.on_ready().map_err(|err: FeatureError| BootstrapError {
                phase: Phase::HookReadiness,
                error: LifecycleError::HookReadiness {
                    feature: feature.name().to_string(),
                    cause: err.to_string(),
                },
            })?;
        }

        // P3 — discovery & validation.
        for descriptor in discover(self.manifest, self.predicate.as_ref()) {
            registry.register(descriptor).map_err(|err| BootstrapError {
                phase: Phase::Discovery,
                error: LifecycleError::Registration(err),
            })?;
        }
        registry.freeze();

        let table_descriptors: Vec<TableDescriptor> = registry
            .descriptors_for(&Capability::new(katalyst_core::capability::well_known::TABLE))
            .into_iter()
            .map(TableDescriptor::from_component)
            .collect();

        let verbose_validation = self.verbose_validation;
        let order = DependencyResolver::new(&registry).validate_all().map_err(|report| BootstrapError {
            phase: Phase::Discovery,
            error: LifecycleError::Discovery(report, verbose_validation),
        })?;

        let registry = Arc::new(registry);

        // P4 — schema bootstrap (+ optional eager construction).
        let mut builder = Container::builder(registry.clone());
        for (name, constructor) in self.constructors {
            builder = builder.constructor(name, constructor);
        }
        let container = builder.build();

        if self.eager_init {
            container.eager_init_all(&order).await.map_err(|failure| BootstrapError {
                phase: Phase::SchemaBootstrap,
                error: LifecycleError::Instantiation(failure),
            })?;
        }

        if table_descriptors.is_empty() {
            tracing::debug!("no Table descriptors discovered, skipping schema bootstrap");
        } else if let Some(installer) = &self.schema_installer {
            installer.install(&table_descriptors).map_err(|err: SchemaError| BootstrapError {
                phase: Phase::SchemaBootstrap,
                error: LifecycleError::SchemaBootstrap { cause: err.to_string() },
            })?;
        } else {
            tracing::warn!(
                count = table_descriptors.len(),
                "Table descriptors discovered but no SchemaInstaller registered, skipping schema bootstrap"
            );
        }

        // P5 — adapter & initializer registration.
        let composite = CompositeAdapter::new(self.adapters);
        let mut manager = TransactionManager::new(composite);
        for hook in self.hooks {
            manager.register_hook(hook);
        }
        let transactions = Arc::new(manager);

        for initializer in &self.initializers {
            initializer.initialize().await.map_err(|err: InitializerError| BootstrapError {
                phase: Phase::AdapterAndInitializers,
                error: LifecycleError::Initializer {
                    name: initializer.name().to_string(),
                    cause: err.to_string(),
                },
            })?;
        }

        let scheduler = self.scheduler.unwrap_or_default();

        Ok(RunningApp {
            registry,
            container,
            construction_order: order,
            transactions,
            scheduler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use katalyst_core::{ComponentDescriptorBuilder, ConstructorParam, TypeHandle};
    use katalyst_tx::{AdapterError, IsolationLevel, TransactionContext};

    struct NoopAdapter;
    impl Adapter for NoopAdapter {
        async fn begin(&self, _isolation: IsolationLevel) -> Result<(), AdapterError> {
            Ok(())
        }
        async fn commit(&self) -> Result<(), AdapterError> {
            Ok(())
        }
        async fn rollback(&self) -> Result<(), AdapterError> {
            Ok(())
        }
        async fn on_phase(&self, _phase: katalyst_tx::Phase, _ctx: &TransactionContext) -> Result<(), AdapterError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn empty_orchestrator_boots_and_stops_cleanly() {
        let app = BootstrapOrchestrator::new(&[])
            .with_adapter(NoopAdapter)
            .run()
            .await
            .expect("empty bootstrap should succeed");
        assert!(app.construction_order.is_empty());
        app.stop();
    }

    #[tokio::test]
    async fn p1_and_p2_run_features_in_registration_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        struct TrackingFeature {
            name: &'static str,
            order: Arc<std::sync::Mutex<Vec<&'static str>>>,
        }
        impl Feature for TrackingFeature {
            fn name(&self) -> &'static str {
                self.name
            }
            fn on_ready(&self) -> Result<(), FeatureError> {
                self.order.lock().unwrap().push(self.name);
                Ok(())
            }
        }

        let app = BootstrapOrchestrator::new(&[])
            .with_feature(TrackingFeature { name: "first", order: order.clone() })
            .with_feature(TrackingFeature { name: "second", order: order.clone() })
            .with_adapter(NoopAdapter)
            .run()
            .await
            .unwrap();
        app.stop();

        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn missing_dependency_aborts_at_discovery_phase() {
        fn service_build(b: ComponentDescriptorBuilder) -> ComponentDescriptorBuilder {
            b.constructor_param(ConstructorParam::required("repo", "UserRepository"))
        }
        let manifest = vec![TypeRecord {
            handle: TypeHandle::new("app::UserService", "app"),
            capabilities: vec!["Service"],
            annotations: vec![],
            priority: 0,
            build: service_build,
        }];

        let err = BootstrapOrchestrator::new(&manifest)
            .with_adapter(NoopAdapter)
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.phase, Phase::Discovery);
        assert!(matches!(err.error, LifecycleError::Discovery(..)));
        assert!(err.to_string().contains("MissingDependency"));
    }

    #[tokio::test]
    async fn di_verbose_config_expands_the_validation_report_without_enabling_eager_init() {
        fn service_build(b: ComponentDescriptorBuilder) -> ComponentDescriptorBuilder {
            b.constructor_param(ConstructorParam::required("repo", "UserRepository"))
        }
        let manifest: Vec<TypeRecord> = (0..15)
            .map(|i| TypeRecord {
                handle: TypeHandle::new(Box::leak(format!("app::Service{i}").into_boxed_str()), "app"),
                capabilities: vec!["Service"],
                annotations: vec![],
                priority: 0,
                build: service_build,
            })
            .collect();

        let mut provider = katalyst_config::MapConfigProvider::new();
        provider.set(katalyst_config::well_known::DI_VERBOSE, "true");

        let err = BootstrapOrchestrator::new(&manifest)
            .with_config(&provider)
            .with_adapter(NoopAdapter)
            .run()
            .await
            .unwrap_err();

        // Verbose mode must render every one of the 15 accumulated errors,
        // not just the default top-10 summary.
        assert!(err.to_string().contains("15. missing dependency"));
        assert!(!err.to_string().contains("more (enable verbose mode"));

        // `katalyst.di.verbose` must not also switch on eager construction:
        // a non-verbose orchestrator over the same manifest must fail at the
        // same phase with the same (summarized) error kind, not diverge into
        // an eager-instantiation failure at P4.
        let plain_err = BootstrapOrchestrator::new(&manifest)
            .with_adapter(NoopAdapter)
            .run()
            .await
            .unwrap_err();
        assert_eq!(plain_err.phase, Phase::Discovery);
        assert!(plain_err.to_string().contains("more (enable verbose mode"));
    }

    #[tokio::test]
    async fn eager_init_surfaces_instantiation_failure_at_schema_bootstrap_phase() {
        fn identity(b: ComponentDescriptorBuilder) -> ComponentDescriptorBuilder {
            b
        }
        let manifest = vec![TypeRecord {
            handle: TypeHandle::new("app::Broken", "app"),
            capabilities: vec!["Service"],
            annotations: vec![],
            priority: 0,
            build: identity,
        }];

        let failing_constructor: Constructor = Arc::new(|_container: Container| {
            Box::pin(async move {
                Err(InstantiationFailure {
                    descriptor: "app::Broken".into(),
                    cause: "boom".into(),
                })
            })
        });

        let err = BootstrapOrchestrator::new(&manifest)
            .with_constructor("app::Broken", failing_constructor)
            .eager_init(true)
            .with_adapter(NoopAdapter)
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.phase, Phase::SchemaBootstrap);
        assert!(matches!(err.error, LifecycleError::Instantiation(_)));
    }

    #[tokio::test]
    async fn table_descriptors_are_forwarded_to_the_schema_installer() {
        fn identity(b: ComponentDescriptorBuilder) -> ComponentDescriptorBuilder {
            b
        }
        let manifest = vec![TypeRecord {
            handle: TypeHandle::new("app::UsersTable", "app"),
            capabilities: vec!["Table"],
            annotations: vec![],
            priority: 0,
            build: identity,
        }];

        struct RecordingInstaller(Arc<std::sync::Mutex<Vec<String>>>);
        impl SchemaInstaller for RecordingInstaller {
            fn install(&self, tables: &[TableDescriptor]) -> Result<(), SchemaError> {
                self.0.lock().unwrap().extend(tables.iter().map(|t| t.qualified_name.clone()));
                Ok(())
            }
        }

        let installed = Arc::new(std::sync::Mutex::new(Vec::new()));
        let app = BootstrapOrchestrator::new(&manifest)
            .with_schema_installer(RecordingInstaller(installed.clone()))
            .with_adapter(NoopAdapter)
            .run()
            .await
            .unwrap();
        app.stop();

        assert_eq!(*installed.lock().unwrap(), vec!["app::UsersTable".to_string()]);
    }

    #[tokio::test]
    async fn schema_bootstrap_is_skipped_when_no_table_descriptors_exist() {
        struct PanickingInstaller;
        impl SchemaInstaller for PanickingInstaller {
            fn install(&self, _tables: &[TableDescriptor]) -> Result<(), SchemaError> {
                panic!("should never be called when no Table descriptors exist");
            }
        }

        let app = BootstrapOrchestrator::new(&[])
            .with_schema_installer(PanickingInstaller)
            .with_adapter(NoopAdapter)
            .run()
            .await
            .unwrap();
        app.stop();
    }

    #[tokio::test]
    async fn initializer_failure_aborts_at_adapter_and_initializer_phase() {
        struct FailingInitializer;
        impl Initializer for FailingInitializer {
            fn name(&self) -> &'static str {
                "boom-init"
            }
            fn initialize<'a>(
                &'a self,
            ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), InitializerError>> + Send + 'a>> {
                Box::pin(async move { Err("setup failed".into()) })
            }
        }

        let err = BootstrapOrchestrator::new(&[])
            .with_adapter(NoopAdapter)
            .with_initializer(FailingInitializer)
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.phase, Phase::AdapterAndInitializers);
        assert!(matches!(err.error, LifecycleError::Initializer { .. }));
    }

    #[tokio::test]
    async fn initializers_run_in_declared_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        struct TrackingInitializer {
            name: &'static str,
            order: Arc<std::sync::Mutex<Vec<&'static str>>>,
        }
        impl Initializer for TrackingInitializer {
            fn name(&self) -> &'static str {
                self.name
            }
            fn initialize<'a>(
                &'a self,
            ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), InitializerError>> + Send + 'a>> {
                Box::pin(async move {
                    self.order.lock().unwrap().push(self.name);
                    Ok(())
                })
            }
        }

        let app = BootstrapOrchestrator::new(&[])
            .with_adapter(NoopAdapter)
            .with_initializer(TrackingInitializer { name: "first", order: order.clone() })
            .with_initializer(TrackingInitializer { name: "second", order: order.clone() })
            .run()
            .await
            .unwrap();
        app.stop();

        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }
}
