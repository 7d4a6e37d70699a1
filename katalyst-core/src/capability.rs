use std::fmt;

/// An abstract role a component claims — e.g. `Service`, `Repository`,
/// `EventHandler`, `Validator`, `Initializer`, `Hook`.
///
/// Capabilities are looked up by name rather than by Rust trait object
/// identity: the registry is built from a discovery manifest (see
/// [`crate::discovery`]), and a manifest entry declares its capabilities as
/// plain strings so the same registry shape works whether descriptors were
/// produced by a derive macro or registered by hand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Capability(String);

impl Capability {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Capability {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Capability {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Well-known capability names recognized by the runtime core itself.
///
/// Applications are free to declare arbitrary capability names; these
/// constants only exist because [`is_multi_binding`] needs to recognize the
/// handful of contracts the core treats as multi-binding by convention.
pub mod well_known {
    pub const SERVICE: &str = "Service";
    pub const REPOSITORY: &str = "Repository";
    pub const EVENT_HANDLER: &str = "EventHandler";
    pub const VALIDATOR: &str = "Validator";
    pub const INITIALIZER: &str = "Initializer";
    pub const HOOK: &str = "Hook";
    pub const FEATURE: &str = "Feature";
    pub const TABLE: &str = "Table";
    pub const ADAPTER: &str = "Adapter";
}

/// Whether a contract permits more than one binding (an ordered collection
/// is resolved instead of a single primary).
///
/// `Initializer`, `EventHandler`, `Hook`, `Feature`, `Table` and `Adapter`
/// are multi-binding by convention; every other capability permits at most
/// one primary binding.
pub fn is_multi_binding(cap: &Capability) -> bool {
    matches!(
        cap.as_str(),
        well_known::INITIALIZER
            | well_known::EVENT_HANDLER
            | well_known::HOOK
            | well_known::FEATURE
            | well_known::TABLE
            | well_known::ADAPTER
    )
}

/// Whether a contract's bindings should be ordered by descending priority
/// rather than registration order.
///
/// `Hook` is the one multi-binding contract the runtime priority-orders
/// ("hooks within a phase dispatch ... in descending priority", §4.4/§5.1);
/// every other multi-binding contract — `EventHandler`, `Initializer`,
/// `Feature`, `Table`, `Adapter` — must preserve registration order instead
/// (§4.6 "order within a type is by registration order, which the registry
/// must preserve"; §4.8 runs `Initializer`s "in declared order"). A
/// single-binding contract has no registration-order guarantee to keep, so
/// it is still resolved by priority (to pick a sensible fallback when no
/// candidate is marked `Primary`).
pub fn is_priority_ordered(cap: &Capability) -> bool {
    !is_multi_binding(cap) || cap.as_str() == well_known::HOOK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_binding_contracts() {
        assert!(is_multi_binding(&Capability::new("Initializer")));
        assert!(is_multi_binding(&Capability::new("EventHandler")));
        assert!(is_multi_binding(&Capability::new("Hook")));
        assert!(is_multi_binding(&Capability::new("Feature")));
        assert!(is_multi_binding(&Capability::new("Table")));
        assert!(is_multi_binding(&Capability::new("Adapter")));
        assert!(!is_multi_binding(&Capability::new("Service")));
        assert!(!is_multi_binding(&Capability::new("Repository")));
    }

    #[test]
    fn display_and_conversions() {
        let c: Capability = "UserRepository".into();
        assert_eq!(c.to_string(), "UserRepository");
        assert_eq!(c.as_str(), "UserRepository");
    }
}
