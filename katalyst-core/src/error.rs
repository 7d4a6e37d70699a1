use std::collections::BTreeMap;
use std::fmt;

use crate::capability::Capability;

/// One validation failure produced while building the dependency graph.
///
/// Hand-written `Display`, no `std::error::Error` source chaining beyond a
/// formatted cause string — errors accumulate across capability-tagged,
/// multi-binding descriptors rather than short-circuiting on the first one.
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// A constructor parameter's required contract has zero bindings.
    MissingDependency {
        owner: String,
        parameter: String,
        required_contract: Capability,
    },
    /// More than one primary binding exists for a single-binding contract.
    AmbiguousBinding {
        contract: Capability,
        candidates: Vec<String>,
    },
    /// A generic contract has bindings, but none at the specialization the
    /// constructor parameter requires.
    SecondaryBindingMissing {
        owner: String,
        contract: Capability,
        generic_param: String,
    },
    /// A dependency cycle, reported as the ordered path that closes it
    /// (e.g. `[A, B, A]`).
    CircularDependency { cycle: Vec<String> },
    /// A descriptor's constructor could not be satisfied at instantiation
    /// time for a reason other than a missing/ambiguous binding.
    UninstantiableType { type_name: String, reason: String },
    /// A feature module declared it would provide a type, but P1/P2 never
    /// registered it.
    MissingFeatureProvidedType { type_name: String },
    /// A well-known configuration property required by a component is absent.
    MissingWellKnownProperty { key: String, owner: String },
}

impl ValidationError {
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::MissingDependency { .. } => "MissingDependency",
            ValidationError::AmbiguousBinding { .. } => "AmbiguousBinding",
            ValidationError::SecondaryBindingMissing { .. } => "SecondaryBindingMissing",
            ValidationError::CircularDependency { .. } => "CircularDependency",
            ValidationError::UninstantiableType { .. } => "UninstantiableType",
            ValidationError::MissingFeatureProvidedType { .. } => "MissingFeatureProvidedType",
            ValidationError::MissingWellKnownProperty { .. } => "MissingWellKnownProperty",
        }
    }

    /// A human-readable fix hint, required by the runtime for every aggregated error.
    pub fn suggestion(&self) -> String {
        match self {
            ValidationError::MissingDependency {
                owner,
                parameter,
                required_contract,
            } => format!(
                "Register a component implementing `{required_contract}` for parameter \
                 `{parameter}` of `{owner}`, or mark the parameter optional."
            ),
            ValidationError::AmbiguousBinding { contract, candidates } => format!(
                "Mark exactly one of [{}] as the primary binding for `{contract}`, \
                 or run the container in override-permitted mode.",
                candidates.join(", ")
            ),
            ValidationError::SecondaryBindingMissing {
                contract,
                generic_param,
                ..
            } => format!(
                "Register a `{contract}` specialized on `{generic_param}`."
            ),
            ValidationError::CircularDependency { cycle } => format!(
                "Break the cycle {} by introducing an interface boundary or \
                 deferred/lazy injection.",
                cycle.join(" -> ")
            ),
            ValidationError::UninstantiableType { reason, .. } => {
                format!("Fix the constructor failure: {reason}")
            }
            ValidationError::MissingFeatureProvidedType { type_name } => format!(
                "A feature module must register `{type_name}` during P1/P2 before discovery runs."
            ),
            ValidationError::MissingWellKnownProperty { key, .. } => {
                format!("Set the configuration property `{key}`.")
            }
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingDependency {
                owner,
                parameter,
                required_contract,
            } => write!(
                f,
                "missing dependency: `{owner}` requires `{required_contract}` for parameter `{parameter}`"
            ),
            ValidationError::AmbiguousBinding { contract, candidates } => write!(
                f,
                "ambiguous binding for `{contract}`: candidates [{}]",
                candidates.join(", ")
            ),
            ValidationError::SecondaryBindingMissing {
                owner,
                contract,
                generic_param,
            } => write!(
                f,
                "missing secondary binding: `{owner}` requires `{contract}` specialized on `{generic_param}`"
            ),
            ValidationError::CircularDependency { cycle } => {
                write!(f, "circular dependency: {}", cycle.join(" -> "))
            }
            ValidationError::UninstantiableType { type_name, reason } => {
                write!(f, "uninstantiable type `{type_name}`: {reason}")
            }
            ValidationError::MissingFeatureProvidedType { type_name } => {
                write!(f, "missing feature-provided type `{type_name}`")
            }
            ValidationError::MissingWellKnownProperty { key, owner } => {
                write!(f, "missing well-known property `{key}` required by `{owner}`")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Aggregate thrown by `validateAll()` when one or more [`ValidationError`]s
/// were accumulated. Never constructed for a single error short-circuit —
/// validation errors are accumulated, never short-circuited.
#[derive(Debug, Clone)]
pub struct FatalValidation {
    pub errors: Vec<ValidationError>,
    /// Names of every component the registry discovered, independent of
    /// whether it validated — feeds the "discovered components" summary
    /// in the fatal-bootstrap report.
    pub discovered_components: Vec<String>,
}

impl FatalValidation {
    pub fn new(errors: Vec<ValidationError>, discovered_components: Vec<String>) -> Self {
        Self {
            errors,
            discovered_components,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Totals by error kind, for the report banner.
    pub fn totals_by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut totals = BTreeMap::new();
        for err in &self.errors {
            *totals.entry(err.kind()).or_insert(0) += 1;
        }
        totals
    }

    /// Top-N detail lines with per-error suggestion — the default
    /// non-verbose report mode.
    pub fn summary(&self, top_n: usize) -> String {
        self.render(top_n, false)
    }

    /// Full per-error detail — toggled on by the `katalyst.di.verbose`
    /// configuration flag (or, in absence of a config provider, the
    /// `KATALYST_DI_VERBOSE` environment variable).
    pub fn verbose(&self) -> String {
        self.render(self.errors.len(), true)
    }

    fn render(&self, top_n: usize, verbose: bool) -> String {
        let mut out = String::new();
        out.push_str("================ Katalyst bootstrap failed: validation ================\n");
        out.push_str(&format!("{} error(s) across {} kind(s)\n", self.errors.len(), self.totals_by_kind().len()));
        for (kind, count) in self.totals_by_kind() {
            out.push_str(&format!("  - {kind}: {count}\n"));
        }
        out.push_str("-------------------------------------------------------------------------\n");
        for (i, err) in self.errors.iter().take(top_n).enumerate() {
            out.push_str(&format!("{}. {err}\n   suggestion: {}\n", i + 1, err.suggestion()));
        }
        if !verbose && self.errors.len() > top_n {
            out.push_str(&format!("   ... {} more (enable verbose mode to see all)\n", self.errors.len() - top_n));
        }
        out.push_str("-------------------------------------------------------------------------\n");
        out.push_str(&format!(
            "discovered {} component(s): {}\n",
            self.discovered_components.len(),
            self.discovered_components.join(", ")
        ));
        out.push_str("=========================================================================\n");
        out
    }
}

impl fmt::Display for FatalValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary(10))
    }
}

impl std::error::Error for FatalValidation {}

/// A constructor failed while the container was realizing a singleton.
#[derive(Debug, Clone)]
pub struct InstantiationFailure {
    pub descriptor: String,
    pub cause: String,
}

impl fmt::Display for InstantiationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to instantiate `{}`: {}", self.descriptor, self.cause)
    }
}

impl std::error::Error for InstantiationFailure {}

/// Errors raised while registering descriptors/bindings into a
/// [`crate::registry::ComponentRegistry`].
#[derive(Debug, Clone)]
pub enum RegistryError {
    Frozen,
    DuplicateDescriptor(String),
    AmbiguousBinding {
        contract: Capability,
        existing: String,
        new: String,
    },
    OverrideNotPermitted {
        contract: Capability,
        existing: String,
        new: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Frozen => write!(f, "registry is frozen; no further registrations are permitted"),
            RegistryError::DuplicateDescriptor(name) => write!(f, "descriptor `{name}` is already registered"),
            RegistryError::AmbiguousBinding { contract, existing, new } => write!(
                f,
                "`{new}` cannot bind `{contract}` as primary: `{existing}` is already primary \
                 (register in override-permitted mode to replace it)"
            ),
            RegistryError::OverrideNotPermitted { contract, existing, new } => write!(
                f,
                "`{new}` cannot override `{existing}` as primary for `{contract}`: \
                 registry is not in override-permitted mode"
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Errors raised while resolving a component out of the [`crate::container::Container`].
#[derive(Debug, Clone)]
pub enum ContainerError {
    Unregistered(Capability),
    Instantiation(InstantiationFailure),
    TypeMismatch { contract: Capability, expected: &'static str },
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerError::Unregistered(contract) => write!(f, "no binding registered for `{contract}`"),
            ContainerError::Instantiation(err) => write!(f, "{err}"),
            ContainerError::TypeMismatch { contract, expected } => {
                write!(f, "binding for `{contract}` does not downcast to `{expected}`")
            }
        }
    }
}

impl std::error::Error for ContainerError {}

impl From<InstantiationFailure> for ContainerError {
    fn from(err: InstantiationFailure) -> Self {
        ContainerError::Instantiation(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_caps_at_top_n_and_counts_remainder() {
        let errors = (0..5)
            .map(|i| ValidationError::MissingDependency {
                owner: format!("Comp{i}"),
                parameter: "dep".into(),
                required_contract: "Thing".into(),
            })
            .collect();
        let report = FatalValidation::new(errors, vec!["Comp0".into()]);
        let summary = report.summary(2);
        assert!(summary.contains("1. missing dependency"));
        assert!(summary.contains("2. missing dependency"));
        assert!(!summary.contains("3. missing dependency"));
        assert!(summary.contains("3 more"));
    }

    #[test]
    fn verbose_includes_every_error() {
        let errors = (0..5)
            .map(|i| ValidationError::MissingDependency {
                owner: format!("Comp{i}"),
                parameter: "dep".into(),
                required_contract: "Thing".into(),
            })
            .collect();
        let report = FatalValidation::new(errors, vec![]);
        let verbose = report.verbose();
        assert!(verbose.contains("5. missing dependency"));
        assert!(!verbose.contains("more)"));
    }

    #[test]
    fn totals_group_by_kind() {
        let errors = vec![
            ValidationError::CircularDependency {
                cycle: vec!["A".into(), "B".into(), "A".into()],
            },
            ValidationError::MissingDependency {
                owner: "X".into(),
                parameter: "y".into(),
                required_contract: "Y".into(),
            },
        ];
        let report = FatalValidation::new(errors, vec![]);
        let totals = report.totals_by_kind();
        assert_eq!(totals.get("CircularDependency"), Some(&1));
        assert_eq!(totals.get("MissingDependency"), Some(&1));
    }
}
