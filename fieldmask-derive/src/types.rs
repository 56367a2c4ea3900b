//! Type utilities for the derive macro.

use quote::ToTokens;
use syn::ext::IdentExt;

fn is_tight(c: char) -> bool {
    matches!(c, '<' | '>' | ':' | '(' | ')' | '[' | ']' | '&' | ',' | ';')
}

/// Renders a type the way it is usually written, for descriptors and errors.
///
/// Token streams print with a space between every token; this drops the
/// spaces around punctuation while keeping the one after a comma.
pub(crate) fn type_label(ty: &syn::Type) -> String {
    let raw = ty.to_token_stream().to_string();
    let chars: Vec<char> = raw.chars().collect();
    let mut label = String::with_capacity(raw.len());
    for (index, &c) in chars.iter().enumerate() {
        if c == ' ' {
            let prev = label.chars().last();
            let next = chars.get(index + 1).copied();
            let after_tight = prev.is_some_and(|p| is_tight(p) && p != ',');
            let before_tight = next.is_some_and(is_tight);
            if after_tight || before_tight {
                continue;
            }
        }
        label.push(c);
    }
    label
}

/// Returns the member name used in descriptors and field references.
///
/// Raw identifiers lose their `r#` prefix; tuple members are named by index.
pub(crate) fn member_name(member: &syn::Member) -> String {
    match member {
        syn::Member::Named(ident) => ident.unraw().to_string(),
        syn::Member::Unnamed(index) => index.index.to_string(),
    }
}
