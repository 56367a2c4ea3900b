//! Errors surfaced by a masking call.
//!
//! Only configuration and template problems are errors. A field that no
//! converter can produce a value for keeps its original value instead.

use thiserror::Error;

/// Error type for masking operations.
#[derive(Debug, Error)]
pub enum MaskError {
    /// A condition type has no instance: no provider supplied one and it has
    /// no parameterless constructor.
    #[error(
        "condition `{condition}` could not be resolved: no instance provider supplied it \
         and it does not implement `Default`"
    )]
    UnresolvedCondition { condition: &'static str },

    /// A mask template references a member that does not exist.
    #[error("mask template of `{aggregate}.{field}` references unknown field `{reference}`")]
    UnknownFieldReference {
        aggregate: &'static str,
        field: &'static str,
        reference: String,
    },

    /// A mask template references a member that has no textual form.
    #[error(
        "mask template of `{aggregate}.{field}` references field `{reference}` \
         of type `{declared_type}`, which cannot be rendered as text"
    )]
    UnrenderableFieldReference {
        aggregate: &'static str,
        field: &'static str,
        reference: String,
        declared_type: &'static str,
    },

    /// A field-reference pattern is not a valid single-capture-group regex.
    #[error("invalid field reference pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A mask marker was built without conditions.
    #[error("a mask marker must declare at least one condition")]
    EmptyConditions,
}

/// Error returned by an [`InstanceProvider`](crate::InstanceProvider).
///
/// The engine never propagates it; it logs the failure and falls back to
/// local construction.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;
