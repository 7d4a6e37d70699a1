use katalyst_core::{ComponentRegistry, RegistryError};

pub type FeatureError = Box<dyn std::error::Error + Send + Sync>;

/// A module the orchestrator drives through P1/P2 before discovery runs.
///
/// Split into the two phases bootstrap actually separates: binding
/// registration happens for every feature before any feature's readiness
/// hook fires, so a feature's `on_ready` can assume every other feature's
/// bindings already exist in the registry.
pub trait Feature: Send + Sync {
    fn name(&self) -> &'static str;

    /// P1 — register this feature's own bindings into the registry.
    /// The default does nothing, for features that only need `on_ready`.
    fn register(&self, registry: &mut ComponentRegistry) -> Result<(), RegistryError> {
        let _ = registry;
        Ok(())
    }

    /// P2 — called once per feature, in registration order, after every
    /// feature's P1 registration has completed.
    fn on_ready(&self) -> Result<(), FeatureError> {
        Ok(())
    }
}
