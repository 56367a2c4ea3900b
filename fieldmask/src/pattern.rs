//! Field references inside mask templates.
//!
//! A template such as `"{id}-masked"` names sibling members of the aggregate
//! being masked. The placeholder syntax is a regex with exactly one capture
//! group holding the member name.

use std::sync::{PoisonError, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::{aggregate::Aggregate, error::MaskError, value::FieldValue};

/// The default placeholder syntax, `{name}`.
pub const DEFAULT_FIELD_PATTERN: &str = r"\{([^{}]+)\}";

/// A compiled placeholder syntax.
#[derive(Clone, Debug)]
pub struct FieldPattern {
    regex: Regex,
}

impl FieldPattern {
    /// Compiles `pattern`, which must contain exactly one capture group.
    pub fn new(pattern: &str) -> Result<Self, MaskError> {
        let regex = Regex::new(pattern).map_err(|err| MaskError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })?;
        // Group 0 is the whole match.
        if regex.captures_len() != 2 {
            return Err(MaskError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: format!(
                    "expected exactly one capture group, found {}",
                    regex.captures_len() - 1
                ),
            });
        }
        Ok(Self { regex })
    }

    fn builtin(pattern: &'static str) -> Self {
        Self::new(pattern).expect("built-in field pattern is valid")
    }

    /// `{name}`
    pub fn braces() -> Self {
        Self::builtin(DEFAULT_FIELD_PATTERN)
    }

    /// `[name]`
    pub fn brackets() -> Self {
        Self::builtin(r"\[([^\[\]]+)\]")
    }

    /// `(name)`
    pub fn parentheses() -> Self {
        Self::builtin(r"\(([^()]+)\)")
    }

    /// `${name}`
    pub fn dollar_braces() -> Self {
        Self::builtin(r"\$\{([^{}]+)\}")
    }

    /// `<name>`
    pub fn angle_brackets() -> Self {
        Self::builtin(r"<([^<>]+)>")
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Returns `true` when `template` contains at least one placeholder.
    pub fn has_references(&self, template: &str) -> bool {
        self.regex.is_match(template)
    }
}

impl Default for FieldPattern {
    fn default() -> Self {
        Self::braces()
    }
}

static USER_PATTERN: Lazy<RwLock<Option<FieldPattern>>> = Lazy::new(|| RwLock::new(None));

/// Replaces the process-wide placeholder syntax.
///
/// Setting the same pattern again is harmless.
pub fn set_user_pattern(pattern: FieldPattern) {
    debug!(pattern = pattern.as_str(), "field reference pattern set");
    *USER_PATTERN.write().unwrap_or_else(PoisonError::into_inner) = Some(pattern);
}

/// Restores the default placeholder syntax.
pub fn reset_user_pattern() {
    *USER_PATTERN.write().unwrap_or_else(PoisonError::into_inner) = None;
}

/// The process-wide placeholder syntax currently in effect.
pub fn active_pattern() -> FieldPattern {
    USER_PATTERN
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .unwrap_or_default()
}

/// Substitutes field references in templates.
#[derive(Clone, Debug, Default)]
pub struct PatternResolver {
    pattern: FieldPattern,
}

impl PatternResolver {
    pub fn new(pattern: FieldPattern) -> Self {
        Self { pattern }
    }

    /// A resolver using the process-wide pattern at the time of the call.
    pub fn from_active() -> Self {
        Self::new(active_pattern())
    }

    pub fn pattern(&self) -> &FieldPattern {
        &self.pattern
    }

    /// Replaces each placeholder in `template` with the rendered value of the
    /// named member of `container`. `field` is the member being masked and is
    /// only used for error reporting.
    pub fn resolve(
        &self,
        template: &str,
        field: &'static str,
        container: &dyn Aggregate,
    ) -> Result<String, MaskError> {
        let mut resolved = String::with_capacity(template.len());
        let mut last = 0;
        for captures in self.pattern.regex.captures_iter(template) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let reference = name.as_str().trim();
            let value = container.field_value(reference).ok_or_else(|| {
                MaskError::UnknownFieldReference {
                    aggregate: container.type_name(),
                    field,
                    reference: reference.to_string(),
                }
            })?;
            let rendered = value.render().ok_or_else(|| MaskError::UnrenderableFieldReference {
                aggregate: container.type_name(),
                field,
                reference: reference.to_string(),
                declared_type: opaque_type(&value),
            })?;

            resolved.push_str(&template[last..whole.start()]);
            resolved.push_str(&rendered);
            last = whole.end();
        }
        resolved.push_str(&template[last..]);
        Ok(resolved)
    }
}

fn opaque_type(value: &FieldValue) -> &'static str {
    match value {
        FieldValue::Opaque(type_name) => *type_name,
        _ => "unknown",
    }
}
