use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, FnArg, GenericArgument, ItemFn, Lit, Meta, PathArguments, ReturnType, Type};

use crate::crate_path::katalyst_core_path;

/// `#[producer]` turns a free function into a component the registry can
/// construct, without requiring the function's return type to implement
/// `Component` itself (it may be a foreign type, e.g. a connection pool from
/// another crate — see DESIGN.md). Generates the two free functions
/// (`type_record`/`constructor`) this crate's [`katalyst_core::Container`]
/// actually needs.
pub fn expand(attr: TokenStream, input: TokenStream) -> TokenStream {
    let item_fn = parse_macro_input!(input as ItemFn);
    let capability = match parse_capability_attr(attr) {
        Ok(cap) => cap,
        Err(err) => return err.to_compile_error().into(),
    };
    match generate(&item_fn, capability) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn parse_capability_attr(attr: TokenStream) -> syn::Result<Option<String>> {
    if attr.is_empty() {
        return Ok(None);
    }
    let lit = syn::parse::<syn::LitStr>(attr)?;
    Ok(Some(lit.value()))
}

struct ProducerParam<'a> {
    arg_name: syn::Ident,
    inner_ty: &'a Type,
    contract: String,
}

fn generate(item_fn: &ItemFn, capability: Option<String>) -> syn::Result<TokenStream2> {
    let fn_name = &item_fn.sig.ident;
    let krate = katalyst_core_path();

    let output_ty = match &item_fn.sig.output {
        ReturnType::Default => {
            return Err(syn::Error::new_spanned(
                fn_name,
                "#[producer] function must have a return type:\n\
                 \n  #[producer]\n  async fn create_pool() -> SqlitePool { ... }",
            ))
        }
        ReturnType::Type(_, ty) => ty.as_ref().clone(),
    };

    if item_fn.sig.inputs.iter().any(|arg| matches!(arg, FnArg::Receiver(_))) {
        return Err(syn::Error::new_spanned(
            fn_name,
            "#[producer] must be a free function (no `self` parameter)",
        ));
    }

    let struct_name = to_pascal_case(&fn_name.to_string());
    let struct_ident = syn::Ident::new(&struct_name, fn_name.span());
    let capability = capability.unwrap_or_else(|| type_name_string(&output_ty));

    let mut params = Vec::new();
    for (i, arg) in item_fn.sig.inputs.iter().enumerate() {
        let FnArg::Typed(pat_type) = arg else { unreachable!("receiver rejected above") };
        let contract_attr = pat_type.attrs.iter().find(|a| a.path().is_ident("inject"));
        let explicit = match contract_attr {
            Some(attr) => parse_optional_single_str(attr)?,
            None => None,
        };
        let inner_ty = unwrap_arc(&pat_type.ty).ok_or_else(|| {
            syn::Error::new_spanned(&pat_type.ty, "#[producer] parameters must be declared as `std::sync::Arc<Contract>`")
        })?;
        let contract = explicit.unwrap_or_else(|| type_name_string(inner_ty));
        params.push(ProducerParam {
            arg_name: syn::Ident::new(&format!("__arg_{i}"), proc_macro2::Span::call_site()),
            inner_ty,
            contract,
        });
    }

    let is_async = item_fn.sig.asyncness.is_some();
    let call = if is_async {
        let args = params.iter().map(|p| &p.arg_name);
        quote! { #fn_name(#(#args),*).await }
    } else {
        let args = params.iter().map(|p| &p.arg_name);
        quote! { #fn_name(#(#args),*) }
    };

    let resolve_stmts: Vec<TokenStream2> = params
        .iter()
        .map(|p| {
            let arg_name = &p.arg_name;
            let ty = p.inner_ty;
            let contract = &p.contract;
            let struct_name_str = struct_name.clone();
            quote! {
                let #arg_name: ::std::sync::Arc<#ty> = container.resolve(&#contract.into()).await.map_err(|err| {
                    #krate::InstantiationFailure {
                        descriptor: #struct_name_str.to_string(),
                        cause: err.to_string(),
                    }
                })?;
            }
        })
        .collect();

    let constructor_param_calls: Vec<TokenStream2> = params
        .iter()
        .map(|p| {
            let name = p.arg_name.to_string();
            let contract = &p.contract;
            quote! { .constructor_param(#krate::ConstructorParam::required(#name, #contract)) }
        })
        .collect();

    Ok(quote! {
        #item_fn

        /// Marker type the registry constructs in place of calling
        /// `#fn_name` directly; carries no state of its own.
        pub struct #struct_ident;

        impl #struct_ident {
            pub fn type_record() -> #krate::TypeRecord {
                #krate::TypeRecord {
                    handle: #krate::TypeHandle::new(
                        ::std::concat!(::std::module_path!(), "::", #capability),
                        ::std::module_path!(),
                    ),
                    capabilities: ::std::vec![#capability],
                    annotations: ::std::vec![],
                    priority: 0,
                    build: |b: #krate::ComponentDescriptorBuilder| {
                        b #(#constructor_param_calls)*
                    },
                }
            }

            pub fn constructor() -> #krate::Constructor {
                ::std::sync::Arc::new(|container: #krate::Container| {
                    ::std::boxed::Box::pin(async move {
                        #(#resolve_stmts)*
                        let produced: #output_ty = #call;
                        Ok(::std::sync::Arc::new(produced) as ::std::sync::Arc<dyn ::std::any::Any + Send + Sync>)
                    })
                })
            }
        }
    })
}

fn type_name_string(ty: &Type) -> String {
    if let Type::Path(p) = ty {
        if let Some(seg) = p.path.segments.last() {
            return seg.ident.to_string();
        }
    }
    quote!(#ty).to_string()
}

fn unwrap_arc(ty: &Type) -> Option<&Type> {
    let Type::Path(p) = ty else { return None };
    let seg = p.path.segments.last()?;
    if seg.ident != "Arc" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &seg.arguments else { return None };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(t) => Some(t),
        _ => None,
    })
}

fn parse_optional_single_str(attr: &syn::Attribute) -> syn::Result<Option<String>> {
    match &attr.meta {
        Meta::Path(_) => Ok(None),
        Meta::List(_) => {
            let lit: syn::LitStr = attr.parse_args()?;
            Ok(Some(lit.value()))
        }
        Meta::NameValue(nv) => match &nv.value {
            syn::Expr::Lit(expr_lit) => match &expr_lit.lit {
                Lit::Str(s) => Ok(Some(s.value())),
                _ => Err(syn::Error::new_spanned(attr, "expected a string literal")),
            },
            _ => Err(syn::Error::new_spanned(attr, "expected a string literal")),
        },
    }
}

fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect()
}
