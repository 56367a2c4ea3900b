//! Per-call masking configuration.

use rust_decimal::Decimal;

use crate::pattern::{FieldPattern, PatternResolver};

/// Default granularity for numeric values masked with an empty template.
pub const DEFAULT_ROUNDING_GRANULARITY: i64 = 1000;

/// Settings for a masking pass.
///
/// ```rust
/// use fieldmask::{FieldPattern, MaskingConfig};
/// use rust_decimal::Decimal;
///
/// let config = MaskingConfig::default()
///     .with_rounding_granularity(Decimal::from(100))
///     .with_field_pattern(FieldPattern::brackets());
/// assert_eq!(config.rounding_granularity(), Decimal::from(100));
/// ```
#[derive(Clone, Debug)]
pub struct MaskingConfig {
    rounding_granularity: Decimal,
    field_pattern: Option<FieldPattern>,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            rounding_granularity: Decimal::from(DEFAULT_ROUNDING_GRANULARITY),
            field_pattern: None,
        }
    }
}

impl MaskingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Numeric values masked with an empty template are rounded to the
    /// nearest multiple of `granularity`. A non-positive granularity keeps
    /// the original value.
    #[must_use]
    pub fn with_rounding_granularity(mut self, granularity: Decimal) -> Self {
        self.rounding_granularity = granularity;
        self
    }

    /// Uses `pattern` instead of the process-wide one.
    #[must_use]
    pub fn with_field_pattern(mut self, pattern: FieldPattern) -> Self {
        self.field_pattern = Some(pattern);
        self
    }

    pub fn rounding_granularity(&self) -> Decimal {
        self.rounding_granularity
    }

    pub fn field_pattern(&self) -> Option<&FieldPattern> {
        self.field_pattern.as_ref()
    }

    pub(crate) fn pattern_resolver(&self) -> PatternResolver {
        self.field_pattern
            .clone()
            .map_or_else(PatternResolver::from_active, PatternResolver::new)
    }
}
