use std::sync::Arc;

use katalyst_core::{
    discover, ComponentDescriptor, ComponentDescriptorBuilder, ComponentRegistry, Container,
    ConstructorParam, DependencyResolver, OverridePolicy, TypeHandle, TypeRecord,
};

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
    ]
}

fn always_true(_: &TypeRecord) -> bool {
    true
}

#[tokio::test]
async fn discovers_registers_validates_and_constructs() {
    let manifest = manifest();
    let descriptors: Vec<ComponentDescriptor> = discover(&manifest, &always_true);
    assert_eq!(descriptors.len(), 2);

    let mut registry = ComponentRegistry::new(OverridePolicy::Reject);
    for descriptor in descriptors {
        registry.register(descriptor).unwrap();
    }
    registry.freeze();

    let order = DependencyResolver::new(&registry).validate_all().expect("graph should validate");
    let repo_pos = order.iter().position(|n| n == "app::repo::PgUserRepository").unwrap();
    let service_pos = order.iter().position(|n| n == "app::service::UserService").unwrap();
    assert!(repo_pos < service_pos, "repository must be constructed before the service depending on it");

    let registry = Arc::new(registry);
    let container = Container::builder(registry.clone())
        .constructor(
            "app::repo::PgUserRepository",
            Arc::new(|_container| {
                Box::pin(async move {
                    let repo: Arc<dyn std::any::Any + Send + Sync> = Arc::new(UserRepository);
                    Ok(repo)
                })
            }),
        )
        .constructor(
            "app::service::UserService",
            Arc::new(|container| {
                Box::pin(async move {
                    let repo = container
                        .resolve::<UserRepository>(&"UserRepository".into())
                        .await
                        .map_err(|e| katalyst_core::InstantiationFailure {
                            descriptor: "app::service::UserService".into(),
                            cause: e.to_string(),
                        })?;
                    let service: Arc<dyn std::any::Any + Send + Sync> = Arc::new(UserService { repo });
                    Ok(service)
                })
            }),
        )
        .build();

    container.eager_init_all(&order).await.expect("eager init should succeed");
    let service = container.resolve::<UserService>(&"Service".into()).await.unwrap();
    assert!(Arc::strong_count(&service) >= 1);
}

#[tokio::test]
async fn validate_all_reports_missing_dependency_with_suggestion() {
    let mut registry = ComponentRegistry::new(OverridePolicy::Reject);
    registry
        .register(
            ComponentDescriptor::builder(TypeHandle::new("app::service::UserService", "app::service"))
                .capability("Service")
                .constructor_param(ConstructorParam::required("repo", "UserRepository"))
                .build(),
        )
        .unwrap();
    registry.freeze();

    let err = DependencyResolver::new(&registry).validate_all().unwrap_err();
    assert_eq!(err.errors.len(), 1);
    let rendered = err.summary(10);
    assert!(rendered.contains("MissingDependency"));
    assert!(rendered.contains("Register a component implementing"));
}
