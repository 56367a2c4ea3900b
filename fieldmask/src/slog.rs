//! Adapters for emitting masked values through `slog`.
//!
//! The logged representation is always the output of [`mask`](crate::mask),
//! never the original value. Logging stays infallible: masking and
//! serialization failures are emitted as placeholder strings.
//!
//! This module does not configure `slog`.

use serde::Serialize;
use serde_json::Value as JsonValue;
use slog::{Key, Record, Result as SlogResult, Serializer, Value as SlogValue};

use crate::{aggregate::MaskNested, masker::mask};

/// Placeholder logged when masking fails.
pub const MASK_FAILED_PLACEHOLDER: &str = "Failed to mask value";
/// Placeholder logged when the masked value cannot be serialized.
pub const SERIALIZE_FAILED_PLACEHOLDER: &str = "Failed to serialize masked value";

/// A `slog::Value` that emits a masked payload as structured JSON via
/// `slog`'s nested-value support.
#[derive(Clone, Debug)]
pub struct MaskedJson {
    value: JsonValue,
}

impl MaskedJson {
    fn new(value: JsonValue) -> Self {
        Self { value }
    }

    pub fn as_json(&self) -> &JsonValue {
        &self.value
    }
}

impl SlogValue for MaskedJson {
    fn serialize(
        &self,
        record: &Record<'_>,
        key: Key,
        serializer: &mut dyn Serializer,
    ) -> SlogResult {
        let nested = slog::Serde(self.value.clone());
        SlogValue::serialize(&nested, record, key, serializer)
    }
}

/// Converts values into a `slog::Value` that logs their masked form as JSON.
///
/// Masking uses the calling thread's condition inputs, which are cleared
/// afterwards exactly as with [`mask`](crate::mask).
///
/// ## Example
/// ```ignore
/// use fieldmask::slog::IntoMaskedJson;
///
/// info!(logger, "login"; "user" => user.into_masked_json());
/// ```
pub trait IntoMaskedJson: MaskNested + Serialize {
    fn into_masked_json(&self) -> MaskedJson {
        let json_value = match mask(self) {
            Ok(masked) => serde_json::to_value(masked)
                .unwrap_or_else(|_| JsonValue::String(SERIALIZE_FAILED_PLACEHOLDER.to_string())),
            Err(err) => {
                tracing::warn!(error = %err, "masking failed while logging");
                JsonValue::String(MASK_FAILED_PLACEHOLDER.to_string())
            }
        };
        MaskedJson::new(json_value)
    }
}

impl<T> IntoMaskedJson for T where T: MaskNested + Serialize {}
