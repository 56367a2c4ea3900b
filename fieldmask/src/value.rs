//! Dynamic value model for masked leaves.
//!
//! Conditions, converters and field references never see the concrete Rust type
//! of a member. They work on a [`FieldValue`] tagged by a [`FieldType`], and
//! the [`MaskValue`] trait moves a leaf in and out of that representation.
//!
//! ## Supported leaves
//!
//! | Rust type | [`FieldType`] | [`FieldValue`] |
//! |-----------|---------------|----------------|
//! | `bool` | `Bool` | `Bool` |
//! | `char` | `Char` | `Char` |
//! | `i8`..`i128`, `isize` | `I8`..`I128`, `Isize` | `Int` |
//! | `u8`..`u128`, `usize` | `U8`..`U128`, `Usize` | `UInt` |
//! | `f32`, `f64` | `F32`, `F64` | `Float` |
//! | `String` | `String` | `Text` |
//! | `rust_decimal::Decimal` | `Decimal` | `Decimal` |
//! | `chrono::NaiveDate` | `Date` | `Date` |
//! | `chrono::NaiveTime` | `Time` | `Time` |
//! | `chrono::NaiveDateTime` | `NaiveDateTime` | `NaiveDateTime` |
//! | `chrono::DateTime<Utc>` | `DateTime` | `DateTime` |
//! | `uuid::Uuid` | `Uuid` | `Uuid` |
//! | `Option<T>` | same as `T` | `Null` when absent |
//!
//! Types from other crates that are not listed here can still be masked by
//! wrapping them in a local newtype that implements [`MaskValue`] with
//! [`FieldType::Custom`].

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// The native type of a maskable leaf, as seen by converters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
    String,
    Decimal,
    Date,
    Time,
    NaiveDateTime,
    DateTime,
    Uuid,
    /// A user-defined leaf, identified by name.
    Custom(&'static str),
}

impl FieldType {
    /// Returns `true` for every signed and unsigned integer width.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::I16
                | Self::I32
                | Self::I64
                | Self::I128
                | Self::Isize
                | Self::U8
                | Self::U16
                | Self::U32
                | Self::U64
                | Self::U128
                | Self::Usize
        )
    }

    /// Returns `true` for `f32` and `f64`.
    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Returns `true` for integers, floats and decimals.
    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float() || self == Self::Decimal
    }

    /// Returns `true` for the chrono date and time types.
    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            Self::Date | Self::Time | Self::NaiveDateTime | Self::DateTime
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(name) => f.write_str(name),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A member value in the engine's dynamic representation.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    /// An absent optional value.
    Null,
    Bool(bool),
    Char(char),
    Int(i128),
    UInt(u128),
    Float(f64),
    Text(String),
    Decimal(Decimal),
    Date(NaiveDate),
    Time(NaiveTime),
    NaiveDateTime(NaiveDateTime),
    DateTime(DateTime<Utc>),
    Uuid(Uuid),
    /// A member that has no textual form (carries the declared type name).
    Opaque(&'static str),
}

impl FieldValue {
    /// Returns `true` for [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the text payload, if this is a [`FieldValue::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Renders the value for field-reference substitution.
    ///
    /// `Null` renders as the empty string. `Opaque` has no rendering.
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Opaque(_) => None,
            Self::Null => Some(String::new()),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Char(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::UInt(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Decimal(value) => write!(f, "{value}"),
            Self::Date(value) => write!(f, "{value}"),
            Self::Time(value) => write!(f, "{value}"),
            Self::NaiveDateTime(value) => write!(f, "{value}"),
            Self::DateTime(value) => f.write_str(&value.to_rfc3339()),
            Self::Uuid(value) => write!(f, "{value}"),
            Self::Opaque(type_name) => write!(f, "<{type_name}>"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A leaf type that can be masked.
///
/// `from_field_value` returns `None` when the value has the wrong kind or does
/// not fit the target (for example an out-of-range integer). The engine then
/// treats the producing converter as not applicable.
///
/// ```rust
/// use fieldmask::{FieldType, FieldValue, MaskValue};
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Phone(String);
///
/// impl MaskValue for Phone {
///     fn field_type() -> FieldType {
///         FieldType::Custom("Phone")
///     }
///
///     fn to_field_value(&self) -> FieldValue {
///         FieldValue::Text(self.0.clone())
///     }
///
///     fn from_field_value(value: FieldValue) -> Option<Self> {
///         match value {
///             FieldValue::Text(text) => Some(Phone(text)),
///             _ => None,
///         }
///     }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `MaskValue`",
    label = "this type cannot carry a mask marker",
    note = "`#[mask(conditions(...))]` is for leaf values (String, numbers, dates, Uuid, ...)",
    note = "if `{Self}` derives `Maskable`, remove the marker: nested aggregates are walked automatically"
)]
pub trait MaskValue: Clone {
    /// The native type converters are asked to produce.
    fn field_type() -> FieldType;
    /// Returns the value in the engine's representation.
    fn to_field_value(&self) -> FieldValue;
    /// Rebuilds the native value from a converter's output.
    fn from_field_value(value: FieldValue) -> Option<Self>;
}

macro_rules! impl_mask_value_signed {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl MaskValue for $ty {
                fn field_type() -> FieldType {
                    FieldType::$kind
                }

                fn to_field_value(&self) -> FieldValue {
                    FieldValue::Int(i128::from(*self))
                }

                fn from_field_value(value: FieldValue) -> Option<Self> {
                    match value {
                        FieldValue::Int(value) => <$ty>::try_from(value).ok(),
                        FieldValue::UInt(value) => <$ty>::try_from(value).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

macro_rules! impl_mask_value_unsigned {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl MaskValue for $ty {
                fn field_type() -> FieldType {
                    FieldType::$kind
                }

                fn to_field_value(&self) -> FieldValue {
                    FieldValue::UInt(u128::from(*self))
                }

                fn from_field_value(value: FieldValue) -> Option<Self> {
                    match value {
                        FieldValue::Int(value) => <$ty>::try_from(value).ok(),
                        FieldValue::UInt(value) => <$ty>::try_from(value).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_mask_value_signed!(i8 => I8, i16 => I16, i32 => I32, i64 => I64, i128 => I128);
impl_mask_value_unsigned!(u8 => U8, u16 => U16, u32 => U32, u64 => U64, u128 => U128);

// `isize`/`usize` have no lossless `From` into 128-bit integers on every target.
impl MaskValue for isize {
    fn field_type() -> FieldType {
        FieldType::Isize
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Int(*self as i128)
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Int(value) => isize::try_from(value).ok(),
            FieldValue::UInt(value) => isize::try_from(value).ok(),
            _ => None,
        }
    }
}

impl MaskValue for usize {
    fn field_type() -> FieldType {
        FieldType::Usize
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::UInt(*self as u128)
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Int(value) => usize::try_from(value).ok(),
            FieldValue::UInt(value) => usize::try_from(value).ok(),
            _ => None,
        }
    }
}

impl MaskValue for f64 {
    fn field_type() -> FieldType {
        FieldType::F64
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Float(*self)
    }

    #[allow(clippy::cast_precision_loss)]
    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Float(value) => Some(value),
            FieldValue::Int(value) => Some(value as f64),
            FieldValue::UInt(value) => Some(value as f64),
            _ => None,
        }
    }
}

impl MaskValue for f32 {
    fn field_type() -> FieldType {
        FieldType::F32
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Float(f64::from(*self))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Float(value) => Some(value as f32),
            FieldValue::Int(value) => Some(value as f32),
            FieldValue::UInt(value) => Some(value as f32),
            _ => None,
        }
    }
}

impl MaskValue for bool {
    fn field_type() -> FieldType {
        FieldType::Bool
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Bool(*self)
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Bool(value) => Some(value),
            _ => None,
        }
    }
}

impl MaskValue for char {
    fn field_type() -> FieldType {
        FieldType::Char
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Char(*self)
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Char(value) => Some(value),
            _ => None,
        }
    }
}

impl MaskValue for String {
    fn field_type() -> FieldType {
        FieldType::String
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Text(self.clone())
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl MaskValue for Decimal {
    fn field_type() -> FieldType {
        FieldType::Decimal
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::Decimal(*self)
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Decimal(value) => Some(value),
            FieldValue::Int(value) => i64::try_from(value).ok().map(Decimal::from),
            FieldValue::UInt(value) => u64::try_from(value).ok().map(Decimal::from),
            _ => None,
        }
    }
}

macro_rules! impl_mask_value_exact {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl MaskValue for $ty {
                fn field_type() -> FieldType {
                    FieldType::$kind
                }

                fn to_field_value(&self) -> FieldValue {
                    FieldValue::$kind(*self)
                }

                fn from_field_value(value: FieldValue) -> Option<Self> {
                    match value {
                        FieldValue::$kind(value) => Some(value),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_mask_value_exact!(
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => NaiveDateTime,
    DateTime<Utc> => DateTime,
    Uuid => Uuid,
);

impl<T> MaskValue for Option<T>
where
    T: MaskValue,
{
    fn field_type() -> FieldType {
        T::field_type()
    }

    fn to_field_value(&self) -> FieldValue {
        self.as_ref()
            .map_or(FieldValue::Null, MaskValue::to_field_value)
    }

    fn from_field_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Null => Some(None),
            other => T::from_field_value(other).map(Some),
        }
    }
}
