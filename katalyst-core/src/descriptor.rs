use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::capability::Capability;

/// A handle to a discovered type.
///
/// Produced by compile-time codegen or manual registration — never by
/// runtime reflection. Two handles are equal iff their qualified names are
/// equal; the package is carried for scan-root filtering and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeHandle {
    pub qualified_name: &'static str,
    pub package: &'static str,
}

impl TypeHandle {
    pub const fn new(qualified_name: &'static str, package: &'static str) -> Self {
        Self {
            qualified_name,
            package,
        }
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name)
    }
}

/// One constructor parameter of a [`ComponentDescriptor`].
#[derive(Debug, Clone)]
pub struct ConstructorParam {
    pub name: String,
    pub contract: Capability,
    pub optional: bool,
    pub has_default: bool,
    /// If the parameter's contract is itself generic (e.g. `Repository<User>`),
    /// the concrete type argument required — resolved by
    /// [`crate::generics`] at registration time, consulted by the resolver
    /// to disambiguate between several descriptors implementing the same
    /// generic contract at different specializations.
    pub generic_specialization: Option<TypeHandle>,
}

impl ConstructorParam {
    pub fn required(name: impl Into<String>, contract: impl Into<Capability>) -> Self {
        Self {
            name: name.into(),
            contract: contract.into(),
            optional: false,
            has_default: false,
            generic_specialization: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    pub fn specialized_on(mut self, handle: TypeHandle) -> Self {
        self.generic_specialization = Some(handle);
        self
    }
}

/// Resolved generic type parameter map: `contract -> (param name -> concrete type)`.
///
/// Populated once at registration, either by a derive macro walking the
/// concrete type's declared supertypes, or by hand via
/// [`ComponentDescriptorBuilder::generic_arg`].
#[derive(Debug, Clone, Default)]
pub struct GenericBindings {
    // contract -> ordered (param name, resolved type) pairs, in declared order.
    entries: BTreeMap<String, Vec<(String, TypeHandle)>>,
}

impl GenericBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, contract: &Capability, param: impl Into<String>, concrete: TypeHandle) {
        self.entries
            .entry(contract.as_str().to_string())
            .or_default()
            .push((param.into(), concrete));
    }

    /// Resolved type arguments for `contract`, in declared parameter order.
    /// Empty if `contract` has no generic bindings recorded.
    pub fn args_of(&self, contract: &Capability) -> Vec<TypeHandle> {
        self.entries
            .get(contract.as_str())
            .map(|pairs| pairs.iter().map(|(_, t)| *t).collect())
            .unwrap_or_default()
    }

    pub fn arg_named(&self, contract: &Capability, param: &str) -> Option<TypeHandle> {
        self.entries
            .get(contract.as_str())?
            .iter()
            .find(|(name, _)| name == param)
            .map(|(_, t)| *t)
    }

    pub fn map_of(&self, contract: &Capability) -> BTreeMap<String, TypeHandle> {
        self.entries
            .get(contract.as_str())
            .map(|pairs| pairs.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Renders `contract`'s resolved type arguments as `"G<A, B>"`, or bare
    /// `"G"` if `contract` has no generic bindings recorded — the
    /// GenericTypeExtractor's `describe(C, G)` operation.
    pub fn describe(&self, contract: &Capability) -> String {
        let args = self.args_of(contract);
        if args.is_empty() {
            return contract.as_str().to_string();
        }
        let joined = args.iter().map(|t| t.qualified_name).collect::<Vec<_>>().join(", ");
        format!("{contract}<{joined}>")
    }
}

/// The registry's unit of record: one discovered component.
///
/// Invariant (checked at [`crate::registry::ComponentRegistry::register`]
/// time): every declared capability must be a non-empty name, and
/// constructor parameter contracts are validated against the whole registry
/// only at `validate_all()` time — not at registration, since a dependency
/// may be registered before or after its dependents.
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    pub handle: TypeHandle,
    pub capabilities: BTreeSet<Capability>,
    pub constructor_params: Vec<ConstructorParam>,
    pub generics: GenericBindings,
    pub annotations: Vec<String>,
    /// Priority used to order multi-binding collections (higher first) and
    /// to break primary-binding ties when the registry runs in
    /// override-permitted mode.
    pub priority: i32,
}

impl ComponentDescriptor {
    pub fn builder(handle: TypeHandle) -> ComponentDescriptorBuilder {
        ComponentDescriptorBuilder {
            handle,
            capabilities: BTreeSet::new(),
            constructor_params: Vec::new(),
            generics: GenericBindings::new(),
            annotations: Vec::new(),
            priority: 0,
        }
    }

    pub fn qualified_name(&self) -> &str {
        self.handle.qualified_name
    }

    pub fn implements(&self, contract: &Capability) -> bool {
        self.capabilities.contains(contract)
    }
}

pub struct ComponentDescriptorBuilder {
    handle: TypeHandle,
    capabilities: BTreeSet<Capability>,
    constructor_params: Vec<ConstructorParam>,
    generics: GenericBindings,
    annotations: Vec<String>,
    priority: i32,
}

impl ComponentDescriptorBuilder {
    pub fn capability(mut self, contract: impl Into<Capability>) -> Self {
        self.capabilities.insert(contract.into());
        self
    }

    pub fn constructor_param(mut self, param: ConstructorParam) -> Self {
        self.constructor_params.push(param);
        self
    }

    pub fn generic_arg(mut self, contract: &Capability, param: impl Into<String>, concrete: TypeHandle) -> Self {
        self.generics.insert(contract, param, concrete);
        self
    }

    pub fn annotation(mut self, name: impl Into<String>) -> Self {
        self.annotations.push(name.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn build(self) -> ComponentDescriptor {
        ComponentDescriptor {
            handle: self.handle,
            capabilities: self.capabilities,
            constructor_params: self.constructor_params,
            generics: self.generics,
            annotations: self.annotations,
            priority: self.priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_SERVICE: TypeHandle = TypeHandle::new("app::UserService", "app");
    const USER_REPO: TypeHandle = TypeHandle::new("app::PgUserRepository", "app");

    #[test]
    fn builder_produces_expected_descriptor() {
        let desc = ComponentDescriptor::builder(USER_SERVICE)
            .capability("Service")
            .constructor_param(ConstructorParam::required("userRepo", "UserRepository"))
            .annotation("Singleton")
            .priority(5)
            .build();

        assert_eq!(desc.qualified_name(), "app::UserService");
        assert!(desc.implements(&"Service".into()));
        assert_eq!(desc.constructor_params.len(), 1);
        assert_eq!(desc.constructor_params[0].name, "userRepo");
        assert_eq!(desc.priority, 5);
    }

    #[test]
    fn generic_bindings_round_trip_in_declared_order() {
        let mut generics = GenericBindings::new();
        let repository: Capability = "Repository".into();
        generics.insert(&repository, "T", USER_REPO);
        generics.insert(&repository, "ID", TypeHandle::new("i64", "core"));

        assert_eq!(generics.args_of(&repository), vec![USER_REPO, TypeHandle::new("i64", "core")]);
        assert_eq!(generics.arg_named(&repository, "T"), Some(USER_REPO));
        assert_eq!(generics.arg_named(&repository, "missing"), None);
    }

    #[test]
    fn generic_bindings_empty_when_contract_absent() {
        let generics = GenericBindings::new();
        assert!(generics.args_of(&"Repository".into()).is_empty());
    }

    #[test]
    fn describe_renders_contract_with_resolved_type_arguments() {
        let mut generics = GenericBindings::new();
        let repository: Capability = "Repository".into();
        generics.insert(&repository, "T", USER_REPO);
        generics.insert(&repository, "ID", TypeHandle::new("i64", "core"));

        assert_eq!(generics.describe(&repository), "Repository<app::PgUserRepository, i64>");
    }

    #[test]
    fn describe_falls_back_to_bare_contract_name_without_bindings() {
        let generics = GenericBindings::new();
        assert_eq!(generics.describe(&"Repository".into()), "Repository");
    }
}
