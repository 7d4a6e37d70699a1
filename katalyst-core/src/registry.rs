use std::collections::BTreeMap;

use crate::capability::{is_multi_binding, is_priority_ordered, Capability};
use crate::descriptor::ComponentDescriptor;
use crate::error::RegistryError;

/// One registered implementation of a contract.
#[derive(Debug, Clone)]
pub struct Binding {
    pub descriptor_name: String,
    pub priority: i32,
    /// Whether this binding was explicitly marked `Primary` via annotation.
    /// Only consulted for single-binding contracts with more than one
    /// candidate.
    pub primary: bool,
}

/// Whether `register` is permitted to replace an existing primary binding
/// for a single-binding contract, or must reject the second registration
/// as ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverridePolicy {
    Reject,
    PermitHigherPriority,
}

/// Holds every discovered [`ComponentDescriptor`] and the contract ->
/// binding(s) index built as each is registered.
///
/// Register-then-freeze lifecycle: registrations accumulate through
/// bootstrap's discovery phase, the registry is frozen before dependency
/// validation runs, and no further registrations are accepted afterward.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    descriptors: BTreeMap<String, ComponentDescriptor>,
    bindings: BTreeMap<String, Vec<Binding>>, // contract name -> bindings, insertion order
    frozen: bool,
    override_policy: OverridePolicy,
}

impl Default for OverridePolicy {
    fn default() -> Self {
        OverridePolicy::Reject
    }
}

impl ComponentRegistry {
    pub fn new(override_policy: OverridePolicy) -> Self {
        Self {
            descriptors: BTreeMap::new(),
            bindings: BTreeMap::new(),
            frozen: false,
            override_policy,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn register(&mut self, descriptor: ComponentDescriptor) -> Result<(), RegistryError> {
        if self.frozen {
            return Err(RegistryError::Frozen);
        }
        let name = descriptor.qualified_name().to_string();
        if self.descriptors.contains_key(&name) {
            return Err(RegistryError::DuplicateDescriptor(name));
        }

        let primary = descriptor.annotations.iter().any(|a| a == "Primary");
        for contract in &descriptor.capabilities {
            self.bind(contract, &name, descriptor.priority, primary)?;
        }

        self.descriptors.insert(name, descriptor);
        Ok(())
    }

    fn bind(&mut self, contract: &Capability, name: &str, priority: i32, primary: bool) -> Result<(), RegistryError> {
        let entries = self.bindings.entry(contract.as_str().to_string()).or_default();

        if is_multi_binding(contract) {
            entries.push(Binding {
                descriptor_name: name.to_string(),
                priority,
                primary,
            });
            return Ok(());
        }

        match entries.iter().position(|b| b.primary) {
            Some(idx) if primary => match self.override_policy {
                OverridePolicy::Reject => {
                    return Err(RegistryError::AmbiguousBinding {
                        contract: contract.clone(),
                        existing: entries[idx].descriptor_name.clone(),
                        new: name.to_string(),
                    })
                }
                OverridePolicy::PermitHigherPriority => {
                    if priority > entries[idx].priority {
                        entries[idx] = Binding {
                            descriptor_name: name.to_string(),
                            priority,
                            primary,
                        };
                    } else {
                        return Err(RegistryError::OverrideNotPermitted {
                            contract: contract.clone(),
                            existing: entries[idx].descriptor_name.clone(),
                            new: name.to_string(),
                        });
                    }
                }
            },
            _ => {
                entries.push(Binding {
                    descriptor_name: name.to_string(),
                    priority,
                    primary,
                });
            }
        }
        Ok(())
    }

    pub fn descriptor(&self, name: &str) -> Option<&ComponentDescriptor> {
        self.descriptors.get(name)
    }

    pub fn all_descriptors(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.descriptors.values()
    }

    pub fn descriptor_names(&self) -> Vec<String> {
        self.descriptors.keys().cloned().collect()
    }

    /// All bindings for `contract`.
    ///
    /// `Hook` and single-binding contracts are ordered by descending
    /// priority (ties broken by descriptor name for determinism); every
    /// other multi-binding contract (`EventHandler`, `Initializer`,
    /// `Feature`, `Table`, `Adapter`) preserves registration order instead —
    /// see [`is_priority_ordered`].
    pub fn bindings_for(&self, contract: &Capability) -> Vec<&Binding> {
        let mut found: Vec<&Binding> = self
            .bindings
            .get(contract.as_str())
            .map(|v| v.iter().collect())
            .unwrap_or_default();
        if is_priority_ordered(contract) {
            found.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.descriptor_name.cmp(&b.descriptor_name)));
        }
        found
    }

    /// The single primary binding for a single-binding contract, if any.
    pub fn primary_binding_for(&self, contract: &Capability) -> Option<&Binding> {
        let candidates = self.bindings_for(contract);
        candidates.iter().find(|b| b.primary).copied().or_else(|| candidates.first().copied())
    }

    pub fn descriptors_for(&self, contract: &Capability) -> Vec<&ComponentDescriptor> {
        self.bindings_for(contract)
            .into_iter()
            .filter_map(|b| self.descriptors.get(&b.descriptor_name))
            .collect()
    }
}
