//! The masking pass: per-field decisions and recursion.

use tracing::debug;

use crate::{
    aggregate::{Aggregate, MaskMarker, MaskNested},
    condition::ConditionResolver,
    config::MaskingConfig,
    context::MaskingContext,
    convert::{ConversionRequest, ConverterChain},
    error::MaskError,
    pattern::PatternResolver,
    value::MaskValue,
};

/// State shared by every field of one masking call.
///
/// The registries are snapshotted when the pass is created; registrations
/// made while it runs are not seen.
#[derive(Debug)]
pub struct MaskingPass<'a> {
    context: &'a MaskingContext,
    conditions: ConditionResolver,
    converters: ConverterChain,
    patterns: PatternResolver,
}

impl<'a> MaskingPass<'a> {
    /// Snapshots the registries visible to the calling thread and the
    /// context's request.
    pub fn new(context: &'a MaskingContext, config: &MaskingConfig) -> Self {
        let request = context.request_id();
        Self {
            context,
            conditions: ConditionResolver::snapshot(request),
            converters: ConverterChain::snapshot(request, config),
            patterns: config.pattern_resolver(),
        }
    }

    /// Builds a pass from explicit collaborators, bypassing the registries.
    pub fn from_parts(
        context: &'a MaskingContext,
        conditions: ConditionResolver,
        converters: ConverterChain,
        patterns: PatternResolver,
    ) -> Self {
        Self {
            context,
            conditions,
            converters,
            patterns,
        }
    }

    pub fn context(&self) -> &MaskingContext {
        self.context
    }

    /// Masks `value` and everything nested in it.
    pub fn mask<T: MaskNested>(&self, value: &T) -> Result<T, MaskError> {
        value.mask_nested(self)
    }

    /// Masks one marked leaf of `container`.
    ///
    /// When no condition holds, or no converter produces a value, the result
    /// is a copy of `value`.
    pub fn mask_field<T: MaskValue>(
        &self,
        value: &T,
        field: &'static str,
        marker: &MaskMarker,
        container: &dyn Aggregate,
    ) -> Result<T, MaskError> {
        let aggregate = container.type_name();
        let original = value.to_field_value();
        if !self
            .conditions
            .should_mask(marker.conditions(), &original, container, self.context)?
        {
            debug!(aggregate, field, "no condition matched, field kept");
            return Ok(value.clone());
        }

        let template = self.patterns.resolve(marker.template(), field, container)?;
        let request = ConversionRequest::new(&template, T::field_type(), &original, container, field);
        match self.converters.convert_to_field_type::<T>(&request) {
            Some(masked) => {
                debug!(aggregate, field, "field masked");
                Ok(masked)
            }
            None => {
                debug!(
                    aggregate,
                    field,
                    target = %T::field_type(),
                    "no converter produced a value, field kept"
                );
                Ok(value.clone())
            }
        }
    }
}
