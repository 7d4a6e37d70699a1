use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, GenericArgument, Lit, Meta, PathArguments, Type};

use crate::crate_path::katalyst_core_path;

pub fn expand(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate(&input) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// One field annotated `#[inject]`, resolved from the container at build
/// time. The field's declared type must be `Arc<Contract>` — the same shape
/// [`katalyst_core::Container::resolve`] returns — so the macro never has to
/// guess at an erased type.
struct InjectedField<'a> {
    ident: &'a syn::Ident,
    inner_ty: &'a Type,
    contract: String,
}

fn generate(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let name_str = name.to_string();
    let krate = katalyst_core_path();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "#[derive(Component)] only works on structs with named fields:\n\
                     \n  #[derive(Component)]\n  #[capability(\"Service\")]\n  struct MyService {\n      #[inject] dep: std::sync::Arc<OtherService>,\n  }",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "#[derive(Component)] only works on structs — enums and unions are not supported",
            ))
        }
    };

    let capabilities = struct_string_list_attr(&input.attrs, "capability")?;
    if capabilities.is_empty() {
        return Err(syn::Error::new_spanned(
            name,
            "#[derive(Component)] requires at least one #[capability(\"Name\")] attribute",
        ));
    }
    let annotations = struct_string_list_attr(&input.attrs, "annotation")?;
    let priority = struct_int_attr(&input.attrs, "priority")?.unwrap_or(0);
    let generic_args = struct_generic_arg_attrs(&input.attrs)?;

    let mut injected = Vec::new();
    let mut field_inits = Vec::new();

    for field in fields {
        let field_ident = field.ident.as_ref().expect("named field");
        let inject_attr = field.attrs.iter().find(|a| a.path().is_ident("inject"));

        match inject_attr {
            Some(attr) => {
                let explicit_contract = parse_optional_single_str(attr)?;
                let inner_ty = unwrap_arc(&field.ty).ok_or_else(|| {
                    syn::Error::new_spanned(
                        &field.ty,
                        "#[inject] fields must be declared as `std::sync::Arc<Contract>`",
                    )
                })?;
                let contract = explicit_contract.unwrap_or_else(|| type_name_string(inner_ty));
                injected.push(InjectedField { ident: field_ident, inner_ty, contract });
            }
            None => {
                field_inits.push(quote! { #field_ident: ::std::default::Default::default() });
            }
        }
    }

    let constructor_param_calls: Vec<TokenStream2> = injected
        .iter()
        .map(|f| {
            let name = f.ident.to_string();
            let contract = &f.contract;
            quote! {
                .constructor_param(#krate::ConstructorParam::required(#name, #contract))
            }
        })
        .collect();

    let generic_arg_calls: Vec<TokenStream2> = generic_args
        .iter()
        .map(|(contract, param, concrete_path, concrete_package)| {
            quote! {
                .generic_arg(
                    &#contract.into(),
                    #param,
                    #krate::TypeHandle::new(#concrete_path, #concrete_package),
                )
            }
        })
        .collect();

    let resolve_stmts: Vec<TokenStream2> = injected
        .iter()
        .map(|f| {
            let ident = f.ident;
            let ty = f.inner_ty;
            let contract = &f.contract;
            quote! {
                let #ident: ::std::sync::Arc<#ty> = container.resolve(&#contract.into()).await.map_err(|err| {
                    #krate::InstantiationFailure {
                        descriptor: #name_str.to_string(),
                        cause: err.to_string(),
                    }
                })?;
            }
        })
        .collect();

    for f in &injected {
        let ident = f.ident;
        field_inits.push(quote! { #ident });
    }

    Ok(quote! {
        impl #krate::Component for #name {
            fn type_record() -> #krate::TypeRecord {
                #krate::TypeRecord {
                    handle: #krate::TypeHandle::new(
                        ::std::concat!(::std::module_path!(), "::", #name_str),
                        ::std::module_path!(),
                    ),
                    capabilities: ::std::vec![#(#capabilities),*],
                    annotations: ::std::vec![#(#annotations),*],
                    priority: #priority,
                    build: |b: #krate::ComponentDescriptorBuilder| {
                        b #(#constructor_param_calls)* #(#generic_arg_calls)*
                    },
                }
            }

            async fn build(container: &#krate::Container) -> ::std::result::Result<Self, #krate::InstantiationFailure> {
                #(#resolve_stmts)*
                Ok(Self {
                    #(#field_inits,)*
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

/// Extracts `Contract` from a field declared as `std::sync::Arc<Contract>`
/// (or plain `Arc<Contract>` with a direct `use`).
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

/// Parses every occurrence of `#[name("literal")]` among `attrs` into an
/// ordered list of the literal strings.
fn struct_string_list_attr(attrs: &[syn::Attribute], name: &str) -> syn::Result<Vec<String>> {
    let mut values = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident(name) {
            continue;
        }
        let lit: syn::LitStr = attr.parse_args()?;
        values.push(lit.value());
    }
    Ok(values)
}

fn struct_int_attr(attrs: &[syn::Attribute], name: &str) -> syn::Result<Option<i32>> {
    for attr in attrs {
        if !attr.path().is_ident(name) {
            continue;
        }
        let lit: syn::LitInt = attr.parse_args()?;
        return Ok(Some(lit.base10_parse()?));
    }
    Ok(None)
}

/// `#[generic_arg(contract = "Repository", param = "T", concrete = "app::User", package = "app")]`
fn struct_generic_arg_attrs(attrs: &[syn::Attribute]) -> syn::Result<Vec<(String, String, String, String)>> {
    let mut out = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("generic_arg") {
            continue;
        }
        let mut contract = None;
        let mut param = None;
        let mut concrete = None;
        let mut package = None;
        attr.parse_nested_meta(|meta| {
            let value = meta.value()?;
            let lit: Lit = value.parse()?;
            let Lit::Str(s) = lit else {
                return Err(meta.error("expected a string literal"));
            };
            if meta.path.is_ident("contract") {
                contract = Some(s.value());
            } else if meta.path.is_ident("param") {
                param = Some(s.value());
            } else if meta.path.is_ident("concrete") {
                concrete = Some(s.value());
            } else if meta.path.is_ident("package") {
                package = Some(s.value());
            }
            Ok(())
        })?;

        let contract = contract.ok_or_else(|| syn::Error::new_spanned(attr, "generic_arg requires contract = \"...\""))?;
        let param = param.ok_or_else(|| syn::Error::new_spanned(attr, "generic_arg requires param = \"...\""))?;
        let concrete = concrete.ok_or_else(|| syn::Error::new_spanned(attr, "generic_arg requires concrete = \"...\""))?;
        let package = package.unwrap_or_default();
        out.push((contract, param, concrete, package));
    }
    Ok(out)
}

fn parse_optional_single_str(attr: &syn::Attribute) -> syn::Result<Option<String>> {
    match &attr.meta {
        Meta::Path(_) => Ok(None),
        Meta::List(_) => {
            let lit: syn::LitStr = attr.parse_args()?;
            Ok(Some(lit.value()))
        }
        Meta::NameValue(_) => Err(syn::Error::new_spanned(attr, "expected #[inject] or #[inject(\"Contract\")]")),
    }
}
