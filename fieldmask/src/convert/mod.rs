//! The prioritized conversion chain.
//!
//! A masked field's resolved template is turned into a value of the field's
//! native type by the first converter that accepts it. User converters come
//! from the [`ConverterRegistry`](crate::ConverterRegistry) (thread, request,
//! then global zone); the built-ins run last.

use std::{any::type_name, fmt, sync::Arc};

use tracing::warn;

use crate::{
    aggregate::Aggregate,
    config::MaskingConfig,
    context::RequestId,
    registry::ConverterRegistry,
    value::{FieldType, FieldValue, MaskValue},
};

mod builtin;

pub use builtin::{
    FallbackConverter, IdentifierConverter, NumericConverter, PrimitiveConverter,
    TemporalConverter,
};

/// Everything a converter may look at.
#[derive(Clone, Copy)]
pub struct ConversionRequest<'a> {
    template: &'a str,
    target: FieldType,
    original: &'a FieldValue,
    container: &'a dyn Aggregate,
    field_name: &'static str,
}

impl<'a> ConversionRequest<'a> {
    pub fn new(
        template: &'a str,
        target: FieldType,
        original: &'a FieldValue,
        container: &'a dyn Aggregate,
        field_name: &'static str,
    ) -> Self {
        Self {
            template,
            target,
            original,
            container,
            field_name,
        }
    }

    /// The template after field references were substituted.
    pub fn template(&self) -> &'a str {
        self.template
    }

    pub fn target(&self) -> FieldType {
        self.target
    }

    /// The field's value before masking.
    pub fn original(&self) -> &'a FieldValue {
        self.original
    }

    pub fn container(&self) -> &'a dyn Aggregate {
        self.container
    }

    pub fn field_name(&self) -> &'static str {
        self.field_name
    }

    /// An empty template asks converters to derive a value from the original.
    pub fn is_empty_template(&self) -> bool {
        self.template.is_empty()
    }
}

impl fmt::Debug for ConversionRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionRequest")
            .field("template", &self.template)
            .field("target", &self.target)
            .field("original", &self.original)
            .field("container", &self.container.type_name())
            .field("field_name", &self.field_name)
            .finish()
    }
}

/// Converts a template into a field value.
///
/// Returning `None` passes the request to the next converter.
pub trait Converter: Send + Sync {
    /// Higher runs first within a registry zone. Built-ins use `0`.
    fn priority(&self) -> i32;

    fn can_convert(&self, target: FieldType) -> bool;

    fn convert(&self, request: &ConversionRequest<'_>) -> Option<FieldValue>;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// An ordered list of converters, evaluated first to last.
#[derive(Clone)]
pub struct ConverterChain {
    converters: Vec<Arc<dyn Converter>>,
}

impl ConverterChain {
    pub fn new(converters: Vec<Arc<dyn Converter>>) -> Self {
        Self { converters }
    }

    /// The built-in converters alone.
    pub fn builtin(config: &MaskingConfig) -> Self {
        Self::new(builtin_converters(config))
    }

    /// Captures the registered converters visible to the calling thread and
    /// `request`, followed by the built-ins.
    pub fn snapshot(request: Option<&RequestId>, config: &MaskingConfig) -> Self {
        let mut converters = ConverterRegistry::ordered(request);
        converters.extend(builtin_converters(config));
        Self::new(converters)
    }

    pub fn converters(&self) -> &[Arc<dyn Converter>] {
        &self.converters
    }

    /// Runs the chain for a field of native type `T`.
    ///
    /// A converter output that `T` cannot hold is logged and skipped. `None`
    /// means no converter produced a usable value.
    pub fn convert_to_field_type<T: MaskValue>(&self, request: &ConversionRequest<'_>) -> Option<T> {
        for converter in &self.converters {
            if !converter.can_convert(request.target()) {
                continue;
            }
            let Some(produced) = converter.convert(request) else {
                continue;
            };
            match T::from_field_value(produced.clone()) {
                Some(value) => return Some(value),
                None => warn!(
                    converter = converter.name(),
                    field = request.field_name(),
                    target = %request.target(),
                    produced = ?produced,
                    "converter produced a value of the wrong kind"
                ),
            }
        }
        None
    }
}

impl fmt::Debug for ConverterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.converters.iter().map(|converter| converter.name()))
            .finish()
    }
}

fn builtin_converters(config: &MaskingConfig) -> Vec<Arc<dyn Converter>> {
    vec![
        Arc::new(PrimitiveConverter),
        Arc::new(NumericConverter::new(config.rounding_granularity())),
        Arc::new(TemporalConverter),
        Arc::new(IdentifierConverter),
        Arc::new(FallbackConverter),
    ]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{ConversionRequest, Converter, ConverterChain};
    use crate::{
        aggregate::Aggregate,
        config::MaskingConfig,
        value::{FieldType, FieldValue, MaskValue},
    };

    struct Empty;

    impl Aggregate for Empty {
        fn type_name(&self) -> &'static str {
            "Empty"
        }

        fn field_value(&self, _name: &str) -> Option<FieldValue> {
            None
        }
    }

    struct Fixed {
        priority: i32,
        output: FieldValue,
    }

    impl Converter for Fixed {
        fn priority(&self) -> i32 {
            self.priority
        }

        fn can_convert(&self, _target: FieldType) -> bool {
            true
        }

        fn convert(&self, _request: &ConversionRequest<'_>) -> Option<FieldValue> {
            Some(self.output.clone())
        }
    }

    struct Declines;

    impl Converter for Declines {
        fn priority(&self) -> i32 {
            100
        }

        fn can_convert(&self, _target: FieldType) -> bool {
            true
        }

        fn convert(&self, _request: &ConversionRequest<'_>) -> Option<FieldValue> {
            None
        }
    }

    fn run<T: MaskValue>(chain: &ConverterChain, template: &str, original: &FieldValue) -> Option<T> {
        let request = ConversionRequest::new(template, T::field_type(), original, &Empty, "field");
        chain.convert_to_field_type::<T>(&request)
    }

    #[test]
    fn first_applicable_converter_wins() {
        let chain = ConverterChain::new(vec![
            Arc::new(Declines),
            Arc::new(Fixed {
                priority: 20,
                output: FieldValue::from("custom"),
            }),
        ]);
        let original = FieldValue::from("secret");
        assert_eq!(run::<String>(&chain, "****", &original).as_deref(), Some("custom"));
    }

    #[test]
    fn wrong_kind_outputs_are_skipped() {
        let mut converters: Vec<Arc<dyn Converter>> = vec![Arc::new(Fixed {
            priority: 5,
            output: FieldValue::from("not a number"),
        })];
        converters.extend(ConverterChain::builtin(&MaskingConfig::default()).converters().iter().cloned());
        let chain = ConverterChain::new(converters);
        assert_eq!(run::<u32>(&chain, "42", &FieldValue::UInt(7)), Some(42));
    }

    #[test]
    fn no_value_when_nothing_converts() {
        let chain = ConverterChain::new(vec![Arc::new(Declines)]);
        assert_eq!(run::<String>(&chain, "x", &FieldValue::from("y")), None);
    }

    #[test]
    fn builtin_chain_handles_common_leaves() {
        let chain = ConverterChain::builtin(&MaskingConfig::default());
        assert_eq!(
            run::<String>(&chain, "****", &FieldValue::from("secret")).as_deref(),
            Some("****")
        );
        assert_eq!(run::<i64>(&chain, "-5", &FieldValue::Int(3)), Some(-5));
        assert_eq!(
            run::<Option<String>>(&chain, "x", &FieldValue::Null),
            Some(Some("x".to_string()))
        );
    }
}
