//! The entry points callers use.

use crate::{
    aggregate::MaskNested,
    condition::{ConditionInput, ConditionKey, MaskCondition},
    config::MaskingConfig,
    context::{ContextGuard, MaskingContext, RequestId},
    engine::MaskingPass,
    error::MaskError,
};

/// Masks `value` using the thread's [`ExecutionContext`](crate::ExecutionContext)
/// inputs and the default configuration.
///
/// The thread's inputs are cleared when the call returns, whether it
/// succeeded or not.
///
/// ```rust
/// use fieldmask::{mask, AlwaysMask, Maskable};
///
/// #[derive(Clone, Debug, Maskable)]
/// struct Credentials {
///     user: String,
///     #[mask(conditions(AlwaysMask))]
///     password: String,
/// }
///
/// let creds = Credentials { user: "alice".into(), password: "hunter2".into() };
/// let masked = mask(&creds).unwrap();
/// assert_eq!(masked.password, "****");
/// assert_eq!(creds.password, "hunter2");
/// ```
pub fn mask<T: MaskNested>(value: &T) -> Result<T, MaskError> {
    Masker::new().mask(value)
}

/// Like [`mask`], with inputs for this call only. They take precedence over
/// inputs set on the thread.
pub fn mask_with<T, I>(value: &T, inputs: I) -> Result<T, MaskError>
where
    T: MaskNested,
    I: IntoIterator<Item = (ConditionKey, ConditionInput)>,
{
    let mut masker = Masker::new();
    for (key, input) in inputs {
        masker.inputs.insert_input(key, input);
    }
    masker.mask(value)
}

/// Builder for a masking call.
///
/// ```rust
/// use fieldmask::{Maskable, Masker, MatchesProvidedInput};
///
/// #[derive(Clone, Debug, Maskable)]
/// struct Contact {
///     id: u32,
///     #[mask(conditions(MatchesProvidedInput), template = "{id}-masked")]
///     email: String,
/// }
///
/// let contact = Contact { id: 7, email: "a@b.com".into() };
/// let masked = Masker::new()
///     .input::<MatchesProvidedInput>("mask")
///     .mask(&contact)
///     .unwrap();
/// assert_eq!(masked.email, "7-masked");
/// ```
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct Masker {
    inputs: MaskingContext,
    config: MaskingConfig,
}

impl Masker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies `input` to condition type `C` for this call.
    pub fn input<C: MaskCondition>(mut self, input: impl Into<ConditionInput>) -> Self {
        self.inputs = self.inputs.with_input::<C>(input);
        self
    }

    /// Runs the call in request scope `id` instead of the thread's request.
    pub fn request(mut self, id: impl Into<RequestId>) -> Self {
        self.inputs = self.inputs.with_request(id);
        self
    }

    pub fn config(mut self, config: MaskingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn masking_config(&self) -> &MaskingConfig {
        &self.config
    }

    /// Masks `value`, leaving it untouched.
    pub fn mask<T: MaskNested>(&self, value: &T) -> Result<T, MaskError> {
        let _guard = ContextGuard::enter();
        let context = MaskingContext::capture().overlay(self.inputs.clone());
        MaskingPass::new(&context, &self.config).mask(value)
    }
}
