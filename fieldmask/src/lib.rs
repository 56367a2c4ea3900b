//! Declarative, conditional field masking.
//!
//! Mark the sensitive members of a struct, derive [`Maskable`], and call
//! [`mask`] at the boundary. The source value is never mutated: the call
//! returns a new value in which every marked member whose conditions hold has
//! been replaced.
//!
//! ```rust
//! use fieldmask::{AlwaysMask, Maskable, Masker, MatchesProvidedInput};
//!
//! #[derive(Clone, Debug, Maskable)]
//! struct User {
//!     id: u64,
//!     #[mask(conditions(AlwaysMask))]
//!     password: String,
//!     #[mask(conditions(MatchesProvidedInput), template = "{id}-masked")]
//!     email: String,
//! }
//!
//! let user = User { id: 1, password: "secret".into(), email: "a@b.com".into() };
//!
//! let masked = Masker::new().input::<MatchesProvidedInput>("mask").mask(&user).unwrap();
//! assert_eq!(masked.password, "****");
//! assert_eq!(masked.email, "1-masked");
//!
//! let partly = Masker::new().input::<MatchesProvidedInput>("nomask").mask(&user).unwrap();
//! assert_eq!(partly.email, "a@b.com");
//! ```
//!
//! How a marked member is masked:
//! 1. Its conditions are resolved (instance providers first, then `Default`)
//!    and evaluated with OR semantics.
//! 2. Field references in the template (`{name}` by default) are replaced
//!    with the values of sibling members.
//! 3. The converter chain turns the template into the member's native type:
//!    user converters by scope and priority, then the built-ins. If no
//!    converter applies the member keeps its value.
//!
//! Key rules:
//! - `#[mask(conditions(A, B), template = "...")]` marks a leaf
//!   ([`MaskValue`]) member. The default template is `"****"`.
//! - `#[mask(exclude)]` copies a member without looking inside it.
//! - Unmarked members that derive `Maskable` (or containers of them) are walked
//!   recursively. Other unmarked members are cloned.
//! - `#[mask(record)]` on the struct builds the copy from `Default` and
//!   assigns member by member.
//!
//! What this crate does not do:
//! - install a `tracing` subscriber
//! - handle cyclic object graphs

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
    clippy::missing_panics_doc,
    clippy::enum_glob_use,
    clippy::struct_excessive_bools,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::result_large_err,
    clippy::option_if_let_else,
    clippy::return_self_not_must_use
)]
// Allow some lints while testing
#![cfg_attr(test, allow(clippy::non_ascii_literal, clippy::unwrap_used))]

pub use fieldmask_derive::Maskable;

#[allow(unused_extern_crates)]
extern crate self as fieldmask;

// Module declarations
mod aggregate;
mod condition;
mod config;
mod context;
mod convert;
mod engine;
mod error;
mod masker;
mod pattern;
mod registry;
#[cfg(feature = "slog")]
pub mod slog;
mod value;

#[doc(hidden)]
#[path = "probe.rs"]
pub mod __private;

// Re-exports
pub use aggregate::{
    describe, Aggregate, AggregateDescriptor, AggregateShape, FieldDescriptor, MaskMarker,
    MaskNested, Maskable, DEFAULT_MASK_TEMPLATE,
};
pub use condition::{
    AlwaysMask, ConditionInput, ConditionInstances, ConditionKey, ConditionRef,
    ConditionResolver, InstanceProvider, LocalConstructor, MaskCondition, MatchesProvidedInput,
    DEFAULT_MASK_TRIGGER,
};
pub use config::{MaskingConfig, DEFAULT_ROUNDING_GRANULARITY};
pub use context::{ContextGuard, ExecutionContext, MaskingContext, RequestId};
pub use convert::{
    ConversionRequest, Converter, ConverterChain, FallbackConverter, IdentifierConverter,
    NumericConverter, PrimitiveConverter, TemporalConverter,
};
pub use engine::MaskingPass;
pub use error::{MaskError, ProviderError};
pub use masker::{mask, mask_with, Masker};
pub use pattern::{
    active_pattern, reset_user_pattern, set_user_pattern, FieldPattern, PatternResolver,
    DEFAULT_FIELD_PATTERN,
};
pub use registry::{
    begin_request, end_request, ConverterRegistry, ProviderRegistry, Registration, RequestScope,
    Scope,
};
pub use value::{FieldType, FieldValue, MaskValue};
