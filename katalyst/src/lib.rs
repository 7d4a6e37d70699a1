//! Application runtime facade tying the Katalyst sub-crates together.
//!
//! [`orchestrator::BootstrapOrchestrator`] drives the five-phase startup
//! sequence — module load, hook readiness, component discovery &
//! validation, persistence schema bootstrap, and adapter/initializer
//! registration — producing a [`orchestrator::RunningApp`] that bundles the
//! container, transaction manager and scheduler an embedder needs to run
//! its application.
//!
//! Re-exports `katalyst_core` as a nested module so `#[derive(Component)]`
//! and `#[producer]` generate code against `crate::katalyst_core::...` for
//! embedders depending on this facade crate directly, the same way
//! `katalyst_macros::crate_path` resolves paths against a sub-crate
//! dependency.

pub use katalyst_core;
pub use katalyst_macros;

pub mod feature;
pub mod initializer;
pub mod orchestrator;
pub mod prelude;
pub mod schema;

pub use feature::{Feature, FeatureError};
pub use initializer::{Initializer, InitializerError};
pub use orchestrator::{BootstrapError, BootstrapOrchestrator, LifecycleError, Phase, RunningApp};
pub use schema::{SchemaError, SchemaInstaller, TableDescriptor};
