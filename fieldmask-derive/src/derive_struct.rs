//! Struct-specific `Maskable` derivation.
//!
//! This module generates the accessor arms, descriptors and reconstruction
//! body for struct members and collects generic parameters that require trait
//! bounds.

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use syn::{spanned::Spanned, DataStruct, Fields, Result};

use crate::{
    strategy::parse_field_strategy,
    transform::{generate_field_tokens, DeriveContext, FieldTokens},
};

pub(crate) struct StructDeriveOutput {
    pub(crate) value_arms: Vec<TokenStream>,
    pub(crate) descriptors: Vec<TokenStream>,
    pub(crate) shape: TokenStream,
    pub(crate) mask_body: TokenStream,
    pub(crate) cloned_generics: Vec<Ident>,
    pub(crate) nested_generics: Vec<Ident>,
    pub(crate) value_generics: Vec<Ident>,
}

pub(crate) fn derive_struct(
    root: &TokenStream,
    data: DataStruct,
    generics: &syn::Generics,
    record: bool,
) -> Result<StructDeriveOutput> {
    let mut cloned_generics = Vec::new();
    let mut nested_generics = Vec::new();
    let mut value_generics = Vec::new();
    let mut ctx = DeriveContext {
        root,
        generics,
        cloned_generics: &mut cloned_generics,
        nested_generics: &mut nested_generics,
        value_generics: &mut value_generics,
    };

    let unit = matches!(data.fields, Fields::Unit);
    let named = matches!(data.fields, Fields::Named(_));

    let mut members = Vec::new();
    let mut value_arms = Vec::new();
    let mut descriptors = Vec::new();
    let mut masked_values = Vec::new();
    for (index, field) in data.fields.into_iter().enumerate() {
        let span = field.span();
        let strategy = parse_field_strategy(&field.attrs)?;
        let member = field.ident.map_or_else(
            || syn::Member::Unnamed(syn::Index::from(index)),
            syn::Member::Named,
        );
        let FieldTokens {
            value_arm,
            descriptor,
            masked_value,
        } = generate_field_tokens(&mut ctx, &member, &field.ty, span, &strategy);
        members.push(member);
        value_arms.push(value_arm);
        descriptors.push(descriptor);
        masked_values.push(masked_value);
    }

    let mask_body = if unit {
        quote! { ::core::result::Result::Ok(Self) }
    } else if record {
        record_body(&members, &masked_values)
    } else {
        tuple_body(named, &members, &masked_values)
    };

    let shape = if record {
        quote! { #root::AggregateShape::Record }
    } else {
        quote! { #root::AggregateShape::Tuple }
    };

    Ok(StructDeriveOutput {
        value_arms,
        descriptors,
        shape,
        mask_body,
        cloned_generics,
        nested_generics,
        value_generics,
    })
}

/// Computes every member first, then builds `Self` in one expression.
fn tuple_body(named: bool, members: &[syn::Member], masked_values: &[TokenStream]) -> TokenStream {
    let bindings: Vec<Ident> = (0..members.len())
        .map(|index| format_ident!("__mask_{}", index))
        .collect();
    let construct = if named {
        quote! { Self { #(#members: #bindings),* } }
    } else {
        quote! { Self(#(#bindings),*) }
    };
    quote! {
        #(let #bindings = #masked_values;)*
        ::core::result::Result::Ok(#construct)
    }
}

/// Starts from `Default` and assigns members in declaration order.
fn record_body(members: &[syn::Member], masked_values: &[TokenStream]) -> TokenStream {
    quote! {
        let mut masked: Self = ::core::default::Default::default();
        #(masked.#members = #masked_values;)*
        ::core::result::Result::Ok(masked)
    }
}
