//! Crate path resolution for generated code, so `#[derive(Component)]` et al.
//! work whether the embedder depends on `katalyst-core` directly or
//! re-exports it through a facade crate named `katalyst`.

use proc_macro2::TokenStream;
use proc_macro_crate::{crate_name, FoundCrate};
use quote::quote;

pub fn katalyst_core_path() -> TokenStream {
    if let Ok(found) = crate_name("katalyst") {
        return match found {
            FoundCrate::Itself => quote!(crate::katalyst_core),
            FoundCrate::Name(name) => {
                let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
                quote!(::#ident::katalyst_core)
            }
        };
    }

    match crate_name("katalyst-core") {
        Ok(FoundCrate::Itself) => quote!(crate),
        Ok(FoundCrate::Name(name)) => {
            let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
            quote!(::#ident)
        }
        Err(_) => quote!(::katalyst_core),
    }
}
