use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use katalyst::feature::{Feature, FeatureError};
use katalyst::initializer::{Initializer, InitializerError};
use katalyst::orchestrator::BootstrapOrchestrator;
use katalyst::schema::{SchemaError, SchemaInstaller, TableDescriptor};
use katalyst_core::{
    ComponentDescriptorBuilder, ComponentRegistry, ConstructorParam, Container, InstantiationFailure,
    RegistryError, TypeHandle, TypeRecord,
};
use katalyst_tx::{Adapter, AdapterError, IsolationLevel, Phase as TxPhase, TransactionContext};

struct UserRepository;
struct UserService {
    #[allow(dead_code)]
    repo: Arc<UserRepository>,
}

fn manifest() -> Vec<TypeRecord> {
    fn service_build(b: ComponentDescriptorBuilder) -> ComponentDescriptorBuilder {
        b.constructor_param(ConstructorParam::required("repo", "UserRepository"))
    }
    fn identity(b: ComponentDescriptorBuilder) -> ComponentDescriptorBuilder {
        b
    }

    vec![
        TypeRecord {
            handle: TypeHandle::new("app::service::UserService", "app::service"),
            capabilities: vec!["Service"],
            annotations: vec!["Singleton"],
            priority: 0,
            build: service_build,
        },
        TypeRecord {
            handle: TypeHandle::new("app::repo::PgUserRepository", "app::repo"),
            capabilities: vec!["UserRepository"],
            annotations: vec!["Singleton"],
            priority: 0,
            build: identity,
        },
        TypeRecord {
            handle: TypeHandle::new("app::repo::UsersTable", "app::repo"),
            capabilities: vec!["Table"],
            annotations: vec!["Versioned"],
            priority: 0,
            build: identity,
        },
    ]
}

struct LoggingAdapter(Arc<AtomicUsize>);

impl Adapter for LoggingAdapter {
    async fn begin(&self, _isolation: IsolationLevel) -> Result<(), AdapterError> {
        Ok(())
    }
    async fn commit(&self) -> Result<(), AdapterError> {
        Ok(())
    }
    async fn rollback(&self) -> Result<(), AdapterError> {
        Ok(())
    }
    async fn on_phase(&self, _phase: TxPhase, _ctx: &TransactionContext) -> Result<(), AdapterError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct RecordingInstaller(Arc<std::sync::Mutex<Vec<String>>>);

impl SchemaInstaller for RecordingInstaller {
    fn install(&self, tables: &[TableDescriptor]) -> Result<(), SchemaError> {
        self.0.lock().unwrap().extend(tables.iter().map(|t| t.qualified_name.clone()));
        Ok(())
    }
}

struct LoggingFeature {
    registered: Arc<AtomicBool>,
    ready: Arc<AtomicBool>,
}

impl Feature for LoggingFeature {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn register(&self, _registry: &mut ComponentRegistry) -> Result<(), RegistryError> {
        self.registered.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn on_ready(&self) -> Result<(), FeatureError> {
        assert!(self.registered.load(Ordering::SeqCst), "on_ready must observe P1 having already run");
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct SeedInitializer(Arc<AtomicBool>);

impl Initializer for SeedInitializer {
    fn name(&self) -> &'static str {
        "seed-data"
    }

    fn initialize<'a>(
        &'a self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), InitializerError>> + Send + 'a>> {
        Box::pin(async move {
            self.0.store(true, Ordering::SeqCst);
            Ok(())
        })
    }
}

#[tokio::test]
async fn full_bootstrap_wires_discovery_persistence_transactions_and_initializers() {
    let manifest = manifest();

    let registered = Arc::new(AtomicBool::new(false));
    let ready = Arc::new(AtomicBool::new(false));
    let installed = Arc::new(std::sync::Mutex::new(Vec::new()));
    let phases_seen = Arc::new(AtomicUsize::new(0));
    let seeded = Arc::new(AtomicBool::new(false));

    let app = BootstrapOrchestrator::new(&manifest)
        .with_feature(LoggingFeature { registered: registered.clone(), ready: ready.clone() })
        .with_constructor(
            "app::repo::PgUserRepository",
            Arc::new(|_container: Container| {
                Box::pin(async move {
                    let repo: Arc<dyn std::any::Any + Send + Sync> = Arc::new(UserRepository);
                    Ok(repo)
                })
            }),
        )
        .with_constructor(
            "app::service::UserService",
            Arc::new(|container: Container| {
                Box::pin(async move {
                    let repo = container
                        .resolve::<UserRepository>(&"UserRepository".into())
                        .await
                        .map_err(|e| InstantiationFailure {
                            descriptor: "app::service::UserService".into(),
                            cause: e.to_string(),
                        })?;
                    let service: Arc<dyn std::any::Any + Send + Sync> = Arc::new(UserService { repo });
                    Ok(service)
                })
            }),
        )
        .eager_init(true)
        .with_schema_installer(RecordingInstaller(installed.clone()))
        .with_adapter(LoggingAdapter(phases_seen.clone()))
        .with_initializer(SeedInitializer(seeded.clone()))
        .run()
        .await
        .expect("a fully wired manifest should boot cleanly");

    assert!(registered.load(Ordering::SeqCst));
    assert!(ready.load(Ordering::SeqCst));
    assert_eq!(*installed.lock().unwrap(), vec!["app::repo::UsersTable".to_string()]);
    assert!(seeded.load(Ordering::SeqCst));

    let repo_pos = app.construction_order.iter().position(|n| n == "app::repo::PgUserRepository").unwrap();
    let service_pos = app.construction_order.iter().position(|n| n == "app::service::UserService").unwrap();
    assert!(repo_pos < service_pos);

    let service = app.container.resolve::<UserService>(&"Service".into()).await.unwrap();
    assert!(Arc::strong_count(&service) >= 1);

    app.transactions
        .execute(&katalyst_tx::TransactionConfig::defaults(), |_ctx| async {
            Ok::<_, katalyst_tx::BlockError<String>>(())
        })
        .await
        .unwrap();
    assert!(phases_seen.load(Ordering::SeqCst) > 0, "adapter should observe at least one transaction phase");

    app.stop();
}

#[tokio::test]
async fn feature_registration_failure_aborts_before_discovery_runs() {
    struct DuplicateFeature;
    impl Feature for DuplicateFeature {
        fn name(&self) -> &'static str {
            "duplicate"
        }
        fn register(&self, registry: &mut ComponentRegistry) -> Result<(), RegistryError> {
            registry.register(
                katalyst_core::ComponentDescriptor::builder(TypeHandle::new("app::X", "app"))
                    .capability("Service")
                    .build(),
            )?;
            registry.register(
                katalyst_core::ComponentDescriptor::builder(TypeHandle::new("app::X", "app"))
                    .capability("Service")
                    .build(),
            )
        }
    }

    let err = BootstrapOrchestrator::new(&[])
        .with_feature(DuplicateFeature)
        .with_adapter(NoopAdapterForThisFile)
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.phase, katalyst::orchestrator::Phase::ModuleLoad);
}

struct NoopAdapterForThisFile;
impl Adapter for NoopAdapterForThisFile {
    async fn begin(&self, _isolation: IsolationLevel) -> Result<(), AdapterError> {
        Ok(())
    }
    async fn commit(&self) -> Result<(), AdapterError> {
        Ok(())
    }
    async fn rollback(&self) -> Result<(), AdapterError> {
        Ok(())
    }
    async fn on_phase(&self, _phase: TxPhase, _ctx: &TransactionContext) -> Result<(), AdapterError> {
        Ok(())
    }
}
