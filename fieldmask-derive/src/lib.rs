//! Derive macros for `fieldmask`.
//!
//! This crate generates the descriptor table and reconstruction code behind
//! `#[derive(Maskable)]`. It:
//! - reads `#[mask(...)]` member and container attributes
//! - emits `Aggregate`, `Maskable` and `MaskNested` implementations
//!
//! It does **not** evaluate conditions or convert values. That happens at
//! runtime in the main `fieldmask` crate.

// <https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html>
#![warn(
    anonymous_parameters,
    bare_trait_objects,
    elided_lifetimes_in_paths,
    missing_copy_implementations,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_code,
    unused_extern_crates,
    unused_import_braces
)]
// <https://rust-lang.github.io/rust-clippy/stable>
#![warn(
    clippy::all,
    clippy::cargo,
    clippy::dbg_macro,
    clippy::float_cmp_const,
    clippy::get_unwrap,
    clippy::mem_forget,
    clippy::nursery,
    clippy::pedantic,
    clippy::todo,
    clippy::unwrap_used,
    clippy::uninlined_format_args
)]
// Allow some clippy lints
#![allow(
    clippy::default_trait_access,
    clippy::doc_markdown,
    clippy::if_not_else,
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::use_self,
    clippy::cargo_common_metadata,
    clippy::missing_errors_doc,
    clippy::enum_glob_use,
    clippy::struct_excessive_bools,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::result_large_err,
    clippy::option_if_let_else
)]
// Allow some lints while testing
#![cfg_attr(test, allow(clippy::non_ascii_literal, clippy::unwrap_used))]

#[allow(unused_extern_crates)]
extern crate proc_macro;

use proc_macro2::TokenStream;
use proc_macro_crate::{crate_name, FoundCrate};
use quote::{format_ident, quote};
use syn::{parse_macro_input, parse_quote, spanned::Spanned, Data, DeriveInput, Result};

mod container;
mod derive_struct;
mod generics;
mod strategy;
mod transform;
mod types;
use container::{parse_container_options, ContainerOptions};
use derive_struct::{derive_struct, StructDeriveOutput};
use generics::add_bounds;

/// Derives `fieldmask::Maskable` (and related impls) for structs.
///
/// # Container Attributes
///
/// - `#[mask(record)]` - Build the masked copy by default-constructing the
///   struct and assigning members one by one. The struct must implement
///   `Default`. Without it, the copy is built in one step from all members.
///
/// # Field Attributes
///
/// - **No annotation**: The member is walked when its type is itself
///   `Maskable` (or a container of such types) and cloned otherwise.
///
/// - `#[mask(conditions(A, B, ...))]`: Masks the member when any listed
///   condition holds. The member type must implement `MaskValue`. Condition
///   types that implement `Default` are constructed locally when no registered
///   provider supplies an instance.
///
/// - `#[mask(conditions(...), template = "...")]`: Replacement text. It may
///   reference sibling members with `{name}`. The default template is
///   `"****"`; an empty template requests each type's neutral value.
///
/// - `#[mask(nested)]`: Always walks the member. Required for members typed
///   by a generic parameter that should be walked.
///
/// - `#[mask(exclude)]`: Never walks or masks the member; it is cloned.
///
/// Enums and unions are rejected at compile time.
///
/// # Generic Parameters
///
/// Type parameters receive bounds according to the members that mention
/// them: `Clone` for unmarked or excluded members, `MaskNested` for nested
/// ones and `MaskValue` for marked ones.
#[proc_macro_derive(Maskable, attributes(mask))]
pub fn derive_maskable(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

/// Returns the token stream to reference the fieldmask crate root.
///
/// Handles crate renaming (e.g., `masking = { package = "fieldmask", ... }`).
/// Inside the fieldmask crate itself the root resolves through its
/// `extern crate self as fieldmask` alias, which keeps doctests and
/// integration tests working.
fn crate_root() -> TokenStream {
    match crate_name("fieldmask") {
        Ok(FoundCrate::Name(name)) => {
            let ident = format_ident!("{}", name);
            quote! { ::#ident }
        }
        Ok(FoundCrate::Itself) | Err(_) => quote! { ::fieldmask },
    }
}

fn expand(input: DeriveInput) -> Result<TokenStream> {
    let DeriveInput {
        ident,
        generics,
        data,
        attrs,
        ..
    } = input;

    let ContainerOptions { record } = parse_container_options(&attrs)?;

    let root = crate_root();

    let StructDeriveOutput {
        value_arms,
        descriptors,
        shape,
        mask_body,
        cloned_generics,
        nested_generics,
        value_generics,
    } = match data {
        Data::Struct(data) => derive_struct(&root, data, &generics, record)?,
        Data::Enum(e) => {
            return Err(syn::Error::new(
                e.enum_token.span(),
                "`Maskable` cannot be derived for enums",
            ));
        }
        Data::Union(u) => {
            return Err(syn::Error::new(
                u.union_token.span(),
                "`Maskable` cannot be derived for unions",
            ));
        }
    };

    let bounded = add_bounds(generics.clone(), &cloned_generics, &quote! { ::core::clone::Clone });
    let bounded = add_bounds(bounded, &nested_generics, &quote! { #root::MaskNested });
    let mut bounded = add_bounds(bounded, &value_generics, &quote! { #root::MaskValue });
    if record {
        let (_, ty_generics, _) = generics.split_for_impl();
        let self_ty: syn::Type = parse_quote!(#ident #ty_generics);
        bounded
            .make_where_clause()
            .predicates
            .push(parse_quote!(#self_ty: ::core::default::Default));
    }
    let (impl_generics, ty_generics, where_clause) = bounded.split_for_impl();

    Ok(quote! {
        impl #impl_generics #root::Aggregate for #ident #ty_generics #where_clause {
            fn type_name(&self) -> &'static str {
                stringify!(#ident)
            }

            fn field_value(&self, name: &str) -> ::core::option::Option<#root::FieldValue> {
                #[allow(unused_imports)]
                use #root::__private::{
                    DisplayValueKind as _, LeafValueKind as _, OpaqueValueKind as _,
                };
                match name {
                    #(#value_arms,)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl #impl_generics #root::Maskable for #ident #ty_generics #where_clause {
            fn describe() -> #root::AggregateDescriptor {
                #[allow(unused_imports)]
                use #root::__private::{
                    CopiedMemberKind as _, DefaultConstructible as _, NestedMemberKind as _,
                    ProviderOnly as _,
                };
                #root::AggregateDescriptor::new(
                    stringify!(#ident),
                    #shape,
                    ::std::vec![#(#descriptors),*],
                )
            }

            #[allow(unused_variables)]
            fn mask_with(
                &self,
                pass: &#root::MaskingPass<'_>,
            ) -> ::core::result::Result<Self, #root::MaskError> {
                #[allow(unused_imports)]
                use #root::__private::{
                    CopiedMemberKind as _, DefaultConstructible as _, NestedMemberKind as _,
                    ProviderOnly as _,
                };
                #mask_body
            }
        }

        impl #impl_generics #root::MaskNested for #ident #ty_generics #where_clause {
            fn mask_nested(
                &self,
                pass: &#root::MaskingPass<'_>,
            ) -> ::core::result::Result<Self, #root::MaskError> {
                #root::Maskable::mask_with(self, pass)
            }
        }
    })
}
