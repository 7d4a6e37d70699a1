//! Configuration provider contract and `${VAR:default}` placeholder
//! substitution for the Katalyst runtime.
//!
//! Actual YAML/`.env`/file parsing is an explicit Non-goal — this
//! crate only defines the [`ConfigProvider`] contract a caller-supplied
//! implementation must satisfy, a reference [`MapConfigProvider`], and the
//! placeholder substitutor the core uses to resolve `${VAR:default}` in
//! string-typed values.

mod error;
mod placeholder;
mod provider;
pub mod well_known;

pub use error::ConfigError;
pub use placeholder::{resolve_placeholders, EnvVarResolver, VarResolver};
pub use provider::{ConfigProvider, MapConfigProvider};
