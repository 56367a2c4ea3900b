//! Per-member code generation.
//!
//! Every member contributes three pieces to the generated impls: a match arm
//! for `Aggregate::field_value`, a `FieldDescriptor` for `Maskable::describe`
//! and the expression producing its masked value inside `Maskable::mask_with`.

use proc_macro2::{Ident, Span, TokenStream};
use quote::{quote, quote_spanned};

use crate::{
    generics::{collect_generics_from_type, mentions_generic},
    strategy::Strategy,
    types::{member_name, type_label},
};

/// Accumulated state during member processing.
pub(crate) struct DeriveContext<'a> {
    pub(crate) root: &'a TokenStream,
    pub(crate) generics: &'a syn::Generics,
    pub(crate) cloned_generics: &'a mut Vec<Ident>,
    pub(crate) nested_generics: &'a mut Vec<Ident>,
    pub(crate) value_generics: &'a mut Vec<Ident>,
}

pub(crate) struct FieldTokens {
    pub(crate) value_arm: TokenStream,
    pub(crate) descriptor: TokenStream,
    pub(crate) masked_value: TokenStream,
}

fn marker_tokens(root: &TokenStream, strategy: &Strategy, span: Span) -> TokenStream {
    let Strategy::Mask {
        conditions,
        template,
    } = strategy
    else {
        return quote! {};
    };
    let template = template
        .as_ref()
        .map_or_else(|| quote! { #root::DEFAULT_MASK_TEMPLATE }, |lit| quote! { #lit });
    let refs = conditions.iter().map(|condition| {
        quote_spanned! { condition_span(condition, span) =>
            #root::ConditionRef::from_parts(
                #root::ConditionKey::of::<#condition>(),
                (&#root::__private::ConditionProbe::<#condition>::new()).local_constructor(),
            )
        }
    });
    quote! {
        #root::MaskMarker::from_derive(::std::vec![#(#refs),*], #template)
    }
}

fn condition_span(condition: &syn::Path, fallback: Span) -> Span {
    condition
        .segments
        .last()
        .map_or(fallback, |segment| segment.ident.span())
}

/// Generates the tokens for one member.
///
/// ## Member Rules
///
/// | Strategy | `field_value` | masked value |
/// |----------|---------------|--------------|
/// | `PassThrough` | probed | walked if nested, cloned otherwise |
/// | `Exclude` | probed | cloned |
/// | `Nested` | probed | walked |
/// | `Mask` | `MaskValue::to_field_value` | `MaskingPass::mask_field` |
///
/// Members typed by a generic parameter skip the probes: they are cloned (or
/// walked under `nested`) and read as opaque values.
pub(crate) fn generate_field_tokens(
    ctx: &mut DeriveContext<'_>,
    member: &syn::Member,
    ty: &syn::Type,
    span: Span,
    strategy: &Strategy,
) -> FieldTokens {
    let root = ctx.root;
    let name = member_name(member);
    let label = type_label(ty);
    let generic = mentions_generic(ty, ctx.generics);

    let probed_value = if generic {
        quote_spanned! { span =>
            #root::FieldValue::Opaque(::core::any::type_name::<#ty>())
        }
    } else {
        quote_spanned! { span =>
            (&&&#root::__private::TypeProbe::<#ty>::new()).value_kind().field_value(&self.#member)
        }
    };

    let (value, descriptor, masked_value) = match strategy {
        Strategy::PassThrough => {
            let (nested, masked) = if generic {
                collect_generics_from_type(ty, ctx.generics, ctx.cloned_generics);
                (
                    quote! { false },
                    quote_spanned! { span => ::core::clone::Clone::clone(&self.#member) },
                )
            } else {
                (
                    quote_spanned! { span =>
                        (&#root::__private::TypeProbe::<#ty>::new()).member_kind().is_nested()
                    },
                    quote_spanned! { span =>
                        (&#root::__private::TypeProbe::<#ty>::new())
                            .member_kind()
                            .mask_member(&self.#member, pass)?
                    },
                )
            };
            (
                probed_value,
                quote! { #root::FieldDescriptor::plain(#name, #label, #nested) },
                masked,
            )
        }
        Strategy::Exclude => {
            collect_generics_from_type(ty, ctx.generics, ctx.cloned_generics);
            (
                probed_value,
                quote! { #root::FieldDescriptor::excluded(#name, #label) },
                quote_spanned! { span => ::core::clone::Clone::clone(&self.#member) },
            )
        }
        Strategy::Nested => {
            collect_generics_from_type(ty, ctx.generics, ctx.nested_generics);
            (
                probed_value,
                quote! { #root::FieldDescriptor::plain(#name, #label, true) },
                quote_spanned! { span => #root::MaskNested::mask_nested(&self.#member, pass)? },
            )
        }
        Strategy::Mask { .. } => {
            collect_generics_from_type(ty, ctx.generics, ctx.value_generics);
            let marker = marker_tokens(root, strategy, span);
            (
                quote_spanned! { span => #root::MaskValue::to_field_value(&self.#member) },
                quote! { #root::FieldDescriptor::masked(#name, #label, #marker) },
                quote_spanned! { span =>
                    pass.mask_field(&self.#member, #name, &#marker, self)?
                },
            )
        }
    };

    FieldTokens {
        value_arm: quote! { #name => ::core::option::Option::Some(#value) },
        descriptor,
        masked_value,
    }
}
