//! # Hessian Graph Derive Macros
//!
//! This crate provides `#[derive(WireObject)]` for `hessian-graph`. The derive builds the
//! struct's runtime type descriptor once per process and converts instances to and from
//! the dynamic `Value` model.
//!
//! Compatible with `syn 2.0`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, parse_macro_input};

/// Derives `hessian_graph::WireObject` for a struct with named fields.
///
/// Attributes:
/// - `#[hessian(name = "com.acme.Point")]` on the struct sets the wire class name
///   (default: the struct's identifier).
/// - `#[hessian(rename = "x")]` on a field sets its wire field name.
/// - `#[hessian(skip)]` on a field leaves it off the wire; it decodes as `Default::default()`.
#[proc_macro_derive(WireObject, attributes(hessian))]
pub fn derive_wire_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

struct WireField {
    ident: syn::Ident,
    ty: syn::Type,
    wire_name: String,
}

fn expand(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "WireObject cannot be derived for generic structs",
        ));
    }

    let data_struct = match input.data {
        Data::Struct(ds) => ds,
        _ => {
            return Err(syn::Error::new(
                name.span(),
                "WireObject only supports structs",
            ));
        }
    };
    let named = match data_struct.fields {
        Fields::Named(named) => named,
        _ => {
            return Err(syn::Error::new(
                name.span(),
                "WireObject only supports structs with named fields",
            ));
        }
    };

    let class_name = parse_struct_attributes(&input.attrs)?.unwrap_or_else(|| name.to_string());

    let mut wire = Vec::new();
    let mut skipped = Vec::new();
    for field in named.named {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let (rename, skip) = parse_field_attributes(&field.attrs)?;
        if skip {
            skipped.push(ident);
            continue;
        }
        let wire_name = rename.unwrap_or_else(|| ident.to_string());
        wire.push(WireField {
            ident,
            ty: field.ty,
            wire_name,
        });
    }

    let descriptor_fields = wire.iter().map(|f| {
        let ty = &f.ty;
        let wire_name = &f.wire_name;
        quote! {
            .field(#wire_name, <#ty as hessian_graph::WireObject>::type_descriptor())
        }
    });

    let to_value_fields = wire.iter().map(|f| {
        let ident = &f.ident;
        let wire_name = &f.wire_name;
        quote! {
            (#wire_name, hessian_graph::WireObject::to_value(&self.#ident))
        }
    });

    let from_value_fields = wire.iter().map(|f| {
        let ident = &f.ident;
        let ty = &f.ty;
        let wire_name = &f.wire_name;
        quote! {
            #ident: hessian_graph::rt::field::<#ty>(value, #class_name, #wire_name)?
        }
    });

    let default_fields = skipped.iter().map(|ident| {
        quote! { #ident: ::core::default::Default::default() }
    });

    Ok(quote! {
        impl hessian_graph::WireObject for #name {
            fn type_descriptor() -> hessian_graph::TypeDescriptor {
                static DESCRIPTOR: ::std::sync::OnceLock<hessian_graph::TypeDescriptor> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR
                    .get_or_init(|| {
                        hessian_graph::TypeInfo::class(#class_name)
                            #(#descriptor_fields)*
                            .build()
                    })
                    .clone()
            }

            fn to_value(&self) -> hessian_graph::Value {
                let fields: ::std::vec::Vec<(&'static str, hessian_graph::Value)> =
                    ::std::vec![#(#to_value_fields),*];
                hessian_graph::Value::object(
                    <Self as hessian_graph::WireObject>::type_descriptor(),
                    fields,
                )
            }

            fn from_value(value: &hessian_graph::Value) -> hessian_graph::Result<Self> {
                Ok(Self {
                    #(#from_value_fields,)*
                    #(#default_fields,)*
                })
            }
        }
    })
}

/// Parses `#[hessian(name = "...")]` on the struct.
fn parse_struct_attributes(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut class_name = None;
    for attr in attrs {
        if attr.path().is_ident("hessian") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let s: LitStr = meta.value()?.parse()?;
                    if s.value().is_empty() {
                        return Err(meta.error("class name must not be empty"));
                    }
                    class_name = Some(s.value());
                    return Ok(());
                }
                Err(meta.error("Unknown hessian attribute key on a struct. Supported: name"))
            })?;
        }
    }
    Ok(class_name)
}

/// Parses field attributes. Returns (rename, skip).
fn parse_field_attributes(attrs: &[Attribute]) -> syn::Result<(Option<String>, bool)> {
    let mut rename = None;
    let mut skip = false;
    for attr in attrs {
        if attr.path().is_ident("hessian") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    skip = true;
                    return Ok(());
                }
                if meta.path.is_ident("rename") {
                    let s: LitStr = meta.value()?.parse()?;
                    rename = Some(s.value());
                    return Ok(());
                }
                Err(meta.error("Unknown hessian attribute key on a field. Supported: rename, skip"))
            })?;
        }
    }
    Ok((rename, skip))
}
