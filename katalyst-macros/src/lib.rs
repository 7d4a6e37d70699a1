//! Procedural macros generating [`katalyst_core`]-shaped descriptors and
//! constructors from plain struct/function declarations, replacing runtime
//! annotation scanning with compile-time code generation: each macro
//! invocation emits one `TypeRecord` plus the glue
//! `katalyst_core::Component`/`Constructor` needs, instead of anything
//! reflected at startup.
//!
//! [`katalyst_core`]: https://docs.rs/katalyst-core

use proc_macro::TokenStream;

mod component_derive;
mod crate_path;
mod producer_attr;

/// Derives [`katalyst_core::Component`] for a struct.
///
/// ```ignore
/// #[derive(Component)]
/// #[capability("Service")]
/// struct UserService {
///     #[inject]
///     repo: std::sync::Arc<dyn UserRepository>,
/// }
/// ```
///
/// `#[capability("...")]` may repeat; at least one is required.
/// `#[annotation("...")]` and `#[priority(n)]` are optional and feed the
/// generated descriptor's annotation list / multi-binding priority.
/// `#[generic_arg(contract = "...", param = "...", concrete = "...", package = "...")]`
/// records a resolved generic specialization for the resolver's
/// secondary-binding disambiguation (§4.3). Fields not marked `#[inject]`
/// are filled via `Default::default()`.
#[proc_macro_derive(Component, attributes(capability, annotation, priority, generic_arg, inject))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    component_derive::expand(input)
}

/// Turns a free function into a component the registry can construct,
/// without requiring its return type to implement [`katalyst_core::Component`]
/// itself — useful for wrapping a foreign type (a connection pool, an
/// HTTP client) behind the same discovery manifest.
///
/// ```ignore
/// #[producer]
/// async fn create_pool(#[inject] config: std::sync::Arc<AppConfig>) -> SqlitePool {
///     SqlitePool::connect(&config.db_url).await.unwrap()
/// }
/// ```
///
/// An optional string literal sets the capability name explicitly
/// (`#[producer("Pool")]`); otherwise it defaults to the return type's
/// last path segment.
#[proc_macro_attribute]
pub fn producer(attr: TokenStream, input: TokenStream) -> TokenStream {
    producer_attr::expand(attr, input)
}
