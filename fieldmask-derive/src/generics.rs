//! Generic type parameter handling and trait bound management.
//!
//! Members whose type mentions a type parameter cannot be inspected by the
//! compile-time probes, so the derive adds explicit bounds instead:
//!
//! | Member | Bound on the parameters it mentions |
//! |--------|-------------------------------------|
//! | unmarked or `#[mask(exclude)]` | `Clone` |
//! | `#[mask(nested)]` | `MaskNested` |
//! | `#[mask(conditions(...))]` | `MaskValue` |
//!
//! ## PhantomData Handling
//!
//! `PhantomData<T>` members are skipped when collecting generics:
//!
//! ```ignore
//! struct TypedId<T> {
//!     id: String,
//!     _marker: PhantomData<T>,  // T needs no bound
//! }
//! ```

use proc_macro2::TokenStream;
use syn::{parse_quote, Ident};

pub(crate) fn collect_generics_from_type(
    ty: &syn::Type,
    generics: &syn::Generics,
    result: &mut Vec<Ident>,
) {
    match ty {
        syn::Type::Path(path) => {
            if let Some(qself) = &path.qself {
                collect_generics_from_type(&qself.ty, generics, result);
            }
            let Some(segment) = path.path.segments.last() else {
                return;
            };
            if segment.ident == "PhantomData" {
                return;
            }

            if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                for arg in &args.args {
                    if let syn::GenericArgument::Type(inner_ty) = arg {
                        collect_generics_from_type(inner_ty, generics, result);
                    }
                }
            }

            // `T` or `T::Assoc`
            if let Some(first) = path.path.segments.first() {
                for param in generics.type_params() {
                    if first.ident == param.ident && !result.iter().any(|g| g == &param.ident) {
                        result.push(param.ident.clone());
                    }
                }
            }
        }
        syn::Type::Reference(reference) => {
            collect_generics_from_type(&reference.elem, generics, result);
        }
        syn::Type::Array(array) => collect_generics_from_type(&array.elem, generics, result),
        syn::Type::Slice(slice) => collect_generics_from_type(&slice.elem, generics, result),
        syn::Type::Paren(paren) => collect_generics_from_type(&paren.elem, generics, result),
        syn::Type::Group(group) => collect_generics_from_type(&group.elem, generics, result),
        syn::Type::Tuple(tuple) => {
            for elem in &tuple.elems {
                collect_generics_from_type(elem, generics, result);
            }
        }
        _ => {}
    }
}

/// Returns `true` when `ty` mentions one of the type parameters in `generics`.
pub(crate) fn mentions_generic(ty: &syn::Type, generics: &syn::Generics) -> bool {
    let mut found = Vec::new();
    collect_generics_from_type(ty, generics, &mut found);
    !found.is_empty()
}

/// Adds `bound` to every type parameter listed in `used_generics`.
pub(crate) fn add_bounds(
    mut generics: syn::Generics,
    used_generics: &[Ident],
    bound: &TokenStream,
) -> syn::Generics {
    for param in generics.type_params_mut() {
        if used_generics.iter().any(|g| g == &param.ident) {
            param.bounds.push(parse_quote!(#bound));
        }
    }
    generics
}
