//! Parsing of `#[mask(...)]` field attributes.
//!
//! This module maps attribute syntax to masking decisions and produces
//! structured errors for invalid forms.

use proc_macro2::Span;
use syn::{
    parse::Parse, punctuated::Punctuated, spanned::Spanned, Attribute, LitStr, Meta, Path,
    Result, Token,
};

/// How a member is treated by the generated masking code.
///
/// ## Strategy Mapping
///
/// | Attribute | Strategy | Behavior |
/// |-----------|----------|----------|
/// | None | `PassThrough` | Walked if it is a nested aggregate, cloned otherwise |
/// | `#[mask(exclude)]` | `Exclude` | Cloned, never walked |
/// | `#[mask(nested)]` | `Nested` | Always walked |
/// | `#[mask(conditions(A, B), template = "..")]` | `Mask` | Masked leaf |
#[derive(Clone, Debug)]
pub(crate) enum Strategy {
    PassThrough,
    Exclude,
    Nested,
    Mask {
        conditions: Vec<Path>,
        template: Option<LitStr>,
    },
}

#[derive(Default)]
struct FieldOptions {
    conditions: Option<(Vec<Path>, Span)>,
    template: Option<LitStr>,
    exclude: Option<Span>,
    nested: Option<Span>,
}

impl FieldOptions {
    fn into_strategy(self, attr_span: Span) -> Result<Strategy> {
        match self {
            Self {
                exclude: Some(span),
                conditions,
                template,
                nested,
            } => {
                if conditions.is_some() || template.is_some() || nested.is_some() {
                    return Err(syn::Error::new(
                        span,
                        "`exclude` cannot be combined with other #[mask] options",
                    ));
                }
                Ok(Strategy::Exclude)
            }
            Self {
                nested: Some(span),
                conditions,
                template,
                ..
            } => {
                if conditions.is_some() || template.is_some() {
                    return Err(syn::Error::new(
                        span,
                        "`nested` cannot be combined with `conditions` or `template`",
                    ));
                }
                Ok(Strategy::Nested)
            }
            Self {
                conditions: Some((conditions, span)),
                template,
                ..
            } => {
                if conditions.is_empty() {
                    return Err(syn::Error::new(
                        span,
                        "`conditions(...)` must name at least one condition type",
                    ));
                }
                Ok(Strategy::Mask {
                    conditions,
                    template,
                })
            }
            Self {
                template: Some(template),
                ..
            } => Err(syn::Error::new(
                template.span(),
                "`template` requires `conditions(...)`",
            )),
            _ => Err(syn::Error::new(
                attr_span,
                "expected `conditions(...)`, `exclude` or `nested`",
            )),
        }
    }
}

fn duplicate(span: Span, option: &str) -> syn::Error {
    syn::Error::new(span, format!("`{option}` specified more than once"))
}

fn parse_options(attr: &Attribute) -> Result<FieldOptions> {
    let mut options = FieldOptions::default();
    let list = match &attr.meta {
        Meta::List(list) => list,
        Meta::Path(_) => {
            return Err(syn::Error::new(
                attr.span(),
                "bare #[mask] is not supported: expected `conditions(...)`, `exclude` or `nested`",
            ));
        }
        Meta::NameValue(_) => {
            return Err(syn::Error::new(
                attr.span(),
                "name-value syntax is not supported for #[mask]",
            ));
        }
    };

    list.parse_nested_meta(|meta| {
        let span = meta.path.span();
        if meta.path.is_ident("conditions") {
            if options.conditions.is_some() {
                return Err(duplicate(span, "conditions"));
            }
            let content;
            syn::parenthesized!(content in meta.input);
            let paths: Punctuated<Path, Token![,]> =
                content.parse_terminated(Path::parse, Token![,])?;
            options.conditions = Some((paths.into_iter().collect(), span));
            Ok(())
        } else if meta.path.is_ident("template") {
            if options.template.is_some() {
                return Err(duplicate(span, "template"));
            }
            options.template = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("exclude") {
            if options.exclude.is_some() {
                return Err(duplicate(span, "exclude"));
            }
            options.exclude = Some(span);
            Ok(())
        } else if meta.path.is_ident("nested") {
            if options.nested.is_some() {
                return Err(duplicate(span, "nested"));
            }
            options.nested = Some(span);
            Ok(())
        } else {
            Err(meta.error(format!(
                "unknown #[mask] option `{}`; expected `conditions`, `template`, `exclude` or `nested`",
                meta.path
                    .get_ident()
                    .map_or_else(|| "?".to_string(), ToString::to_string)
            )))
        }
    })?;

    Ok(options)
}

pub(crate) fn parse_field_strategy(attrs: &[Attribute]) -> Result<Strategy> {
    let mut strategy: Option<Strategy> = None;
    for attr in attrs {
        if !attr.path().is_ident("mask") {
            continue;
        }
        if strategy.is_some() {
            return Err(syn::Error::new(
                attr.span(),
                "multiple #[mask] attributes specified on the same field",
            ));
        }
        strategy = Some(parse_options(attr)?.into_strategy(attr.span())?);
    }

    Ok(strategy.unwrap_or(Strategy::PassThrough))
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

    fn error_of(tokens: proc_macro2::TokenStream) -> String {
        parse_field_strategy(&parse_attrs(tokens))
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn no_attribute_returns_passthrough() {
        let strategy = parse_field_strategy(&parse_attrs(quote! {})).unwrap();
        assert!(matches!(strategy, Strategy::PassThrough));
    }

    #[test]
    fn conditions_and_template_are_parsed() {
        let attrs = parse_attrs(quote! {
            #[mask(conditions(AlwaysMask, conditions::Phone), template = "{id}-x")]
        });
        match parse_field_strategy(&attrs).unwrap() {
            Strategy::Mask {
                conditions,
                template,
            } => {
                assert_eq!(conditions.len(), 2);
                assert!(conditions[0].is_ident("AlwaysMask"));
                assert_eq!(conditions[1].segments.len(), 2);
                assert_eq!(template.unwrap().value(), "{id}-x");
            }
            other => panic!("expected Mask, got {other:?}"),
        }
    }

    #[test]
    fn template_is_optional() {
        let attrs = parse_attrs(quote! { #[mask(conditions(AlwaysMask))] });
        assert!(matches!(
            parse_field_strategy(&attrs).unwrap(),
            Strategy::Mask { template: None, .. }
        ));
    }

    #[test]
    fn exclude_and_nested_are_parsed() {
        let exclude = parse_field_strategy(&parse_attrs(quote! { #[mask(exclude)] })).unwrap();
        assert!(matches!(exclude, Strategy::Exclude));
        let nested = parse_field_strategy(&parse_attrs(quote! { #[mask(nested)] })).unwrap();
        assert!(matches!(nested, Strategy::Nested));
    }

    #[test]
    fn empty_conditions_error() {
        assert!(error_of(quote! { #[mask(conditions())] }).contains("at least one condition"));
    }

    #[test]
    fn template_without_conditions_error() {
        assert!(error_of(quote! { #[mask(template = "x")] }).contains("requires `conditions"));
    }

    #[test]
    fn conflicting_options_error() {
        assert!(error_of(quote! { #[mask(exclude, nested)] }).contains("cannot be combined"));
        assert!(
            error_of(quote! { #[mask(nested, conditions(AlwaysMask))] })
                .contains("cannot be combined")
        );
    }

    #[test]
    fn duplicate_options_error() {
        assert!(error_of(quote! { #[mask(conditions(A), conditions(B))] })
            .contains("specified more than once"));
    }

    #[test]
    fn multiple_mask_attributes_error() {
        let message = error_of(quote! {
            #[mask(exclude)]
            #[mask(nested)]
        });
        assert!(message.contains("multiple #[mask] attributes"));
    }

    #[test]
    fn bare_and_name_value_forms_error() {
        assert!(error_of(quote! { #[mask] }).contains("bare #[mask] is not supported"));
        assert!(error_of(quote! { #[mask = "x"] }).contains("name-value syntax"));
    }

    #[test]
    fn unknown_option_errors() {
        assert!(error_of(quote! { #[mask(redact)] }).contains("unknown #[mask] option"));
    }

    #[test]
    fn other_attributes_ignored() {
        let attrs = parse_attrs(quote! {
            #[serde(skip)]
            #[doc = "member"]
        });
        assert!(matches!(
            parse_field_strategy(&attrs).unwrap(),
            Strategy::PassThrough
        ));
    }
}
