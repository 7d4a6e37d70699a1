use regex::Regex;

use crate::capability::Capability;
use crate::descriptor::{ComponentDescriptor, ComponentDescriptorBuilder, TypeHandle};

/// One entry of the discovery manifest handed to the registry at bootstrap.
///
/// Rust has no classpath to scan at runtime, so "discovery" here means
/// walking a manifest assembled ahead of time — typically by the
/// `#[derive(Component)]`/`#[capability(...)]` macros in `katalyst-macros`,
/// which each emit one `TypeRecord` into an inventory-style registration
/// slice. [`discover`] then filters that manifest down to the records a
/// predicate selects and turns each into a [`ComponentDescriptor`].
#[derive(Debug, Clone)]
pub struct TypeRecord {
    pub handle: TypeHandle,
    pub capabilities: Vec<&'static str>,
    pub annotations: Vec<&'static str>,
    pub priority: i32,
    pub build: fn(ComponentDescriptorBuilder) -> ComponentDescriptorBuilder,
}

impl TypeRecord {
    pub fn to_descriptor(&self) -> ComponentDescriptor {
        let mut builder = ComponentDescriptor::builder(self.handle).priority(self.priority);
        for cap in &self.capabilities {
            builder = builder.capability(*cap);
        }
        for annotation in &self.annotations {
            builder = builder.annotation(*annotation);
        }
        (self.build)(builder).build()
    }
}

/// A predicate over [`TypeRecord`]s, composable with [`Predicate::and`],
/// [`Predicate::or`] and [`Predicate::negate`].
pub trait Predicate {
    fn matches(&self, record: &TypeRecord) -> bool;

    fn and<P: Predicate + 'static>(self, other: P) -> And
    where
        Self: Sized + 'static,
    {
        And(Box::new(self), Box::new(other))
    }

    fn or<P: Predicate + 'static>(self, other: P) -> Or
    where
        Self: Sized + 'static,
    {
        Or(Box::new(self), Box::new(other))
    }

    fn negate(self) -> Not
    where
        Self: Sized + 'static,
    {
        Not(Box::new(self))
    }
}

impl<F: Fn(&TypeRecord) -> bool> Predicate for F {
    fn matches(&self, record: &TypeRecord) -> bool {
        self(record)
    }
}

pub struct And(Box<dyn Predicate>, Box<dyn Predicate>);
impl Predicate for And {
    fn matches(&self, record: &TypeRecord) -> bool {
        self.0.matches(record) && self.1.matches(record)
    }
}

pub struct Or(Box<dyn Predicate>, Box<dyn Predicate>);
impl Predicate for Or {
    fn matches(&self, record: &TypeRecord) -> bool {
        self.0.matches(record) || self.1.matches(record)
    }
}

pub struct Not(Box<dyn Predicate>);
impl Predicate for Not {
    fn matches(&self, record: &TypeRecord) -> bool {
        !self.0.matches(record)
    }
}

/// Matches records declaring `capability`.
pub struct HasCapability(pub Capability);
impl Predicate for HasCapability {
    fn matches(&self, record: &TypeRecord) -> bool {
        record.capabilities.iter().any(|c| *c == self.0.as_str())
    }
}

/// Matches records whose package starts with `prefix`.
pub struct InPackage(pub &'static str);
impl Predicate for InPackage {
    fn matches(&self, record: &TypeRecord) -> bool {
        record.handle.package.starts_with(self.0)
    }
}

/// Matches records carrying `annotation` (e.g. `"Singleton"`, `"Primary"`).
pub struct HasAnnotation(pub &'static str);
impl Predicate for HasAnnotation {
    fn matches(&self, record: &TypeRecord) -> bool {
        record.annotations.iter().any(|a| *a == self.0)
    }
}

/// Matches records whose qualified name matches `pattern`.
///
/// Built on the `regex` crate rather than hand-rolled glob matching — the
/// manifest-filtering use case (selecting types by dotted-path pattern)
/// is exactly what other component-scanning code in the retrieved corpus
/// reaches for `regex` to do.
pub struct QualifiedNameMatches(Regex);

impl QualifiedNameMatches {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self(Regex::new(pattern)?))
    }
}

impl Predicate for QualifiedNameMatches {
    fn matches(&self, record: &TypeRecord) -> bool {
        self.0.is_match(record.handle.qualified_name)
    }
}

/// Convenience constructor mirroring [`QualifiedNameMatches::new`], panicking
/// on an invalid pattern — for call sites building a predicate from a
/// compile-time string literal where a bad regex is a programming error.
pub fn regex_match(pattern: &str) -> QualifiedNameMatches {
    QualifiedNameMatches::new(pattern).expect("invalid discovery regex pattern")
}

/// Selects every record in `manifest` matching `predicate` and converts it
/// into a [`ComponentDescriptor`], in manifest order.
pub fn discover(manifest: &[TypeRecord], predicate: &dyn Predicate) -> Vec<ComponentDescriptor> {
    manifest
        .iter()
        .filter(|record| predicate.matches(record))
        .map(TypeRecord::to_descriptor)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_SERVICE: TypeHandle = TypeHandle::new("app::service::UserService", "app::service");
    const USER_REPO: TypeHandle = TypeHandle::new("app::repo::PgUserRepository", "app::repo");

    fn identity(b: ComponentDescriptorBuilder) -> ComponentDescriptorBuilder {
        b
    }

    fn sample_manifest() -> Vec<TypeRecord> {
        vec![
            TypeRecord {
                handle: USER_SERVICE,
                capabilities: vec!["Service"],
                annotations: vec!["Singleton"],
                priority: 0,
                build: identity,
            },
            TypeRecord {
                handle: USER_REPO,
                capabilities: vec!["Repository"],
                annotations: vec![],
                priority: 0,
                build: identity,
            },
        ]
    }

    #[test]
    fn discover_filters_by_capability() {
        let manifest = sample_manifest();
        let found = discover(&manifest, &HasCapability("Service".into()));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].qualified_name(), "app::service::UserService");
    }

    #[test]
    fn discover_combines_predicates_with_and() {
        let manifest = sample_manifest();
        let pred = InPackage("app::").and(HasAnnotation("Singleton"));
        let found = discover(&manifest, &pred);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].qualified_name(), "app::service::UserService");
    }

    #[test]
    fn discover_with_regex_predicate() {
        let manifest = sample_manifest();
        let pred = regex_match(r"^app::repo::.*Repository$");
        let found = discover(&manifest, &pred);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].qualified_name(), "app::repo::PgUserRepository");
    }

    #[test]
    fn negate_inverts_predicate() {
        let manifest = sample_manifest();
        let pred = HasCapability("Service".into()).negate();
        let found = discover(&manifest, &pred);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].qualified_name(), "app::repo::PgUserRepository");
    }
}
