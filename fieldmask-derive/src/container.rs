//! Container-level attribute parsing for `#[derive(Maskable)]`.
//!
//! This module handles attributes on the struct itself, not on fields.

use syn::{Attribute, Meta, Result};

/// Options parsed from container-level `#[mask(...)]` attributes.
#[derive(Clone, Debug, Default)]
pub(crate) struct ContainerOptions {
    /// Build the masked copy from `Default` and assign member by member.
    pub(crate) record: bool,
}

/// Parses container-level `#[mask(...)]` attributes.
pub(crate) fn parse_container_options(attrs: &[Attribute]) -> Result<ContainerOptions> {
    let mut options = ContainerOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("mask") {
            continue;
        }

        match &attr.meta {
            Meta::Path(path) => {
                return Err(syn::Error::new_spanned(
                    path,
                    "bare #[mask] on a struct has no meaning; expected `#[mask(record)]`",
                ));
            }
            Meta::List(list) => {
                list.parse_nested_meta(|meta| {
                    if meta.path.is_ident("record") {
                        options.record = true;
                        Ok(())
                    } else {
                        Err(meta.error(format!(
                            "unknown container option `{}`; expected `record`",
                            meta.path
                                .get_ident()
                                .map_or_else(|| "?".to_string(), ToString::to_string)
                        )))
                    }
                })?;
            }
            Meta::NameValue(nv) => {
                return Err(syn::Error::new_spanned(
                    nv,
                    "name-value syntax is not supported for container-level #[mask]",
                ));
            }
        }
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use quote::quote;
    use syn::DeriveInput;

    use super::*;

    fn parse_attrs(tokens: proc_macro2::TokenStream) -> Vec<Attribute> {
        let input: DeriveInput = syn::parse2(quote! {
            #tokens
            struct Dummy;
        })
        .expect("should parse as DeriveInput");
        input.attrs
    }

    #[test]
    fn no_attribute_returns_defaults() {
        let options = parse_container_options(&parse_attrs(quote! {})).unwrap();
        assert!(!options.record);
    }

    #[test]
    fn record_is_parsed() {
        let attrs = parse_attrs(quote! { #[mask(record)] });
        assert!(parse_container_options(&attrs).unwrap().record);
    }

    #[test]
    fn unknown_option_errors() {
        let attrs = parse_attrs(quote! { #[mask(tuple)] });
        let result = parse_container_options(&attrs);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("unknown container option"));
    }

    #[test]
    fn bare_mask_on_container_errors() {
        let attrs = parse_attrs(quote! { #[mask] });
        assert!(parse_container_options(&attrs).is_err());
    }
}
