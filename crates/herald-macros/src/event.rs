//! Event derive macro implementation.
//!
//! `#[derive(Event)]` generates `impl Event` by delegating `state()` to the
//! type's [`EventState`] storage.
//!
//! # Structs
//!
//! The state field is the one marked `#[event(state)]`, or else the field
//! named `state`. Tuple structs must use the marker.
//!
//! # Enums
//!
//! Every variant must hold exactly one field whose type implements `Event`.
//! The generated `state()` returns the state of the wrapped event.
//!
//! # Container attributes `#[event(...)]`
//!
//! | Key | Example | Description |
//! |-----|---------|-------------|
//! | `crate` | `"herald_core"` | Path of the crate exporting `Event` (default: `herald::core`) |

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Index, Member, Path, spanned::Spanned};

// ============================================================================
// Attribute parsing
// ============================================================================

fn parse_crate_path(attrs: &[Attribute]) -> syn::Result<Path> {
    let mut path: Option<Path> = None;

    for attr in attrs {
        if !attr.path().is_ident("event") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                let lit = meta.value()?.parse::<syn::LitStr>()?;
                path = Some(lit.parse()?);
                Ok(())
            } else {
                Err(meta.error("unknown event attribute, expected `crate = \"...\"`"))
            }
        })?;
    }

    Ok(path.unwrap_or_else(|| syn::parse_quote!(::herald::core)))
}

fn has_state_marker(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut marked = false;

    for attr in attrs {
        if !attr.path().is_ident("event") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("state") {
                marked = true;
                Ok(())
            } else {
                Err(meta.error("unknown field attribute, expected `state`"))
            }
        })?;
    }

    Ok(marked)
}

// ============================================================================
// Entry point
// ============================================================================

pub fn derive_event(input: &DeriveInput) -> syn::Result<TokenStream> {
    let krate = parse_crate_path(&input.attrs)?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Struct(data) => {
            let member = find_state_member(&data.fields, input.span())?;
            quote! { &self.#member }
        }
        Data::Enum(data) => {
            let mut arms = Vec::with_capacity(data.variants.len());
            for variant in &data.variants {
                let ident = &variant.ident;
                let arm = match &variant.fields {
                    Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                        quote! { Self::#ident(inner) => #krate::Event::state(inner) }
                    }
                    Fields::Named(fields) if fields.named.len() == 1 => {
                        let field = fields.named.first().and_then(|f| f.ident.as_ref());
                        quote! { Self::#ident { #field: inner } => #krate::Event::state(inner) }
                    }
                    _ => {
                        return Err(syn::Error::new(
                            variant.span(),
                            "Event enum variants must wrap exactly one event",
                        ));
                    }
                };
                arms.push(arm);
            }
            if arms.is_empty() {
                return Err(syn::Error::new(
                    input.span(),
                    "Event cannot be derived for an enum without variants",
                ));
            }
            quote! {
                match self {
                    #(#arms,)*
                }
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new(
                input.span(),
                "Event cannot be derived for unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics #krate::Event for #name #ty_generics #where_clause {
            fn state(&self) -> &#krate::EventState {
                #body
            }
        }
    })
}

fn find_state_member(fields: &Fields, span: proc_macro2::Span) -> syn::Result<Member> {
    let mut marked: Option<Member> = None;
    let mut named_state: Option<Member> = None;

    for (index, field) in fields.iter().enumerate() {
        let member = match &field.ident {
            Some(ident) => Member::Named(ident.clone()),
            None => Member::Unnamed(Index::from(index)),
        };

        if has_state_marker(&field.attrs)? {
            if marked.is_some() {
                return Err(syn::Error::new(
                    field.span(),
                    "only one field may be marked #[event(state)]",
                ));
            }
            marked = Some(member);
        } else if field.ident.as_ref().is_some_and(|ident| ident == "state") {
            named_state = Some(member);
        }
    }

    marked.or(named_state).ok_or_else(|| {
        syn::Error::new(
            span,
            "Event requires a field named `state` or marked #[event(state)]",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(input: TokenStream) -> String {
        let input: DeriveInput = syn::parse2(input).unwrap();
        derive_event(&input).unwrap().to_string()
    }

    fn expand_err(input: TokenStream) -> String {
        let input: DeriveInput = syn::parse2(input).unwrap();
        derive_event(&input).unwrap_err().to_string()
    }

    #[test]
    fn test_named_state_field() {
        let out = expand(quote! {
            struct Opened { state: EventState, path: String }
        });
        assert!(out.contains(":: herald :: core :: Event for Opened"));
        assert!(out.contains("& self . state"));
    }

    #[test]
    fn test_marked_field_and_crate_override() {
        let out = expand(quote! {
            #[event(crate = "herald_core")]
            struct Tick(u64, #[event(state)] EventState);
        });
        assert!(out.contains("herald_core :: Event for Tick"));
        assert!(out.contains("& self . 1"));
    }

    #[test]
    fn test_enum_delegates_to_variants() {
        let out = expand(quote! {
            enum ResourceEvent { Opened(Opened), Closed { inner: Closed } }
        });
        assert!(out.contains("Self :: Opened (inner) =>"));
        assert!(out.contains("Self :: Closed { inner : inner } =>"));
    }

    #[test]
    fn test_missing_state_field() {
        let err = expand_err(quote! {
            struct Plain { path: String }
        });
        assert!(err.contains("field named `state`"));
    }

    #[test]
    fn test_duplicate_marker() {
        let err = expand_err(quote! {
            struct Twice { #[event(state)] a: EventState, #[event(state)] b: EventState }
        });
        assert!(err.contains("only one field"));
    }

    #[test]
    fn test_multi_field_variant_rejected() {
        let err = expand_err(quote! {
            enum Bad { Pair(Opened, Closed) }
        });
        assert!(err.contains("exactly one event"));
    }
}
