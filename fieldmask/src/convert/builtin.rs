use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use tracing::debug;
use uuid::Uuid;

use super::{ConversionRequest, Converter};
use crate::value::{FieldType, FieldValue};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d"];
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Marks a template a converter accepted the target of but could not read.
fn unparseable(request: &ConversionRequest<'_>) -> Option<FieldValue> {
    debug!(
        field = request.field_name(),
        target = %request.target(),
        template = request.template(),
        "template is not a valid value of the target type"
    );
    None
}

/// `String`, `bool` and `char` fields.
///
/// With an empty template strings become empty, booleans `false` and
/// characters `'*'`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrimitiveConverter;

impl Converter for PrimitiveConverter {
    fn priority(&self) -> i32 {
        0
    }

    fn can_convert(&self, target: FieldType) -> bool {
        matches!(target, FieldType::String | FieldType::Bool | FieldType::Char)
    }

    fn convert(&self, request: &ConversionRequest<'_>) -> Option<FieldValue> {
        let template = request.template();
        if request.is_empty_template() {
            if request.original().is_null() {
                return None;
            }
            return match request.target() {
                FieldType::String => Some(FieldValue::Text(String::new())),
                FieldType::Bool => Some(FieldValue::Bool(false)),
                FieldType::Char => Some(FieldValue::Char('*')),
                _ => None,
            };
        }

        match request.target() {
            FieldType::String => Some(FieldValue::Text(template.to_string())),
            FieldType::Bool => match template.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(FieldValue::Bool(true)),
                "false" | "no" | "0" => Some(FieldValue::Bool(false)),
                _ => unparseable(request),
            },
            FieldType::Char => template.chars().next().map(FieldValue::Char),
            _ => None,
        }
    }
}

/// Integer, float and `Decimal` fields.
///
/// With an empty template the original value is rounded to the nearest
/// multiple of the granularity, midpoints away from zero.
#[derive(Clone, Copy, Debug)]
pub struct NumericConverter {
    granularity: Decimal,
}

impl NumericConverter {
    pub fn new(granularity: Decimal) -> Self {
        Self { granularity }
    }

    pub fn granularity(&self) -> Decimal {
        self.granularity
    }

    fn round_decimal(&self, value: Decimal) -> Option<Decimal> {
        value
            .checked_div(self.granularity)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(self.granularity)
    }

    fn round(&self, original: &FieldValue) -> Option<FieldValue> {
        if self.granularity <= Decimal::ZERO {
            return None;
        }
        match original {
            FieldValue::Decimal(value) => self.round_decimal(*value).map(FieldValue::Decimal),
            FieldValue::Int(value) => {
                let value = Decimal::try_from_i128_with_scale(*value, 0).ok()?;
                self.round_decimal(value)?.to_i128().map(FieldValue::Int)
            }
            FieldValue::UInt(value) => {
                let value = i128::try_from(*value).ok()?;
                let value = Decimal::try_from_i128_with_scale(value, 0).ok()?;
                self.round_decimal(value)?.to_u128().map(FieldValue::UInt)
            }
            FieldValue::Float(value) => {
                let granularity = self.granularity.to_f64()?;
                let rounded = (value / granularity).round() * granularity;
                rounded.is_finite().then_some(FieldValue::Float(rounded))
            }
            _ => None,
        }
    }
}

impl Default for NumericConverter {
    fn default() -> Self {
        Self::new(Decimal::from(crate::config::DEFAULT_ROUNDING_GRANULARITY))
    }
}

fn parse_integral(text: &str) -> Option<Decimal> {
    let value = Decimal::from_str(text).ok()?;
    value.fract().is_zero().then_some(value)
}

impl Converter for NumericConverter {
    fn priority(&self) -> i32 {
        0
    }

    fn can_convert(&self, target: FieldType) -> bool {
        target.is_numeric()
    }

    fn convert(&self, request: &ConversionRequest<'_>) -> Option<FieldValue> {
        if request.is_empty_template() {
            return self.round(request.original());
        }

        let text = request.template().trim();
        let target = request.target();
        let parsed = if target == FieldType::Decimal {
            Decimal::from_str(text)
                .or_else(|_| Decimal::from_scientific(text))
                .ok()
                .map(FieldValue::Decimal)
        } else if target.is_float() {
            text.parse::<f64>().ok().map(FieldValue::Float)
        } else if matches!(
            target,
            FieldType::U8
                | FieldType::U16
                | FieldType::U32
                | FieldType::U64
                | FieldType::U128
                | FieldType::Usize
        ) {
            text.parse::<u128>()
                .ok()
                .or_else(|| parse_integral(text)?.to_u128())
                .map(FieldValue::UInt)
        } else {
            text.parse::<i128>()
                .ok()
                .or_else(|| parse_integral(text)?.to_i128())
                .map(FieldValue::Int)
        };
        parsed.or_else(|| unparseable(request))
    }
}

/// chrono date and time fields.
///
/// Accepts ISO-8601 forms, RFC 3339 for `DateTime<Utc>`, and the
/// `dd/mm/yyyy` and `mm/dd/yyyy` date forms (day first when ambiguous).
/// With an empty template dates become January 1st of their year, date-times
/// midnight of their day and times `00:00`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemporalConverter;

fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
}

fn parse_naive_date_time(text: &str) -> Option<NaiveDateTime> {
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| parse_date(text)?.and_hms_opt(0, 0, 0))
}

fn parse_utc(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|value| value.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_naive_date_time(text).map(|value| value.and_utc()))
}

impl TemporalConverter {
    fn truncate(original: &FieldValue) -> Option<FieldValue> {
        match original {
            FieldValue::Date(date) => NaiveDate::from_ymd_opt(date.year(), 1, 1).map(FieldValue::Date),
            FieldValue::Time(_) => NaiveTime::from_hms_opt(0, 0, 0).map(FieldValue::Time),
            FieldValue::NaiveDateTime(value) => value
                .date()
                .and_hms_opt(0, 0, 0)
                .map(FieldValue::NaiveDateTime),
            FieldValue::DateTime(value) => value
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|midnight| FieldValue::DateTime(midnight.and_utc())),
            _ => None,
        }
    }
}

impl Converter for TemporalConverter {
    fn priority(&self) -> i32 {
        0
    }

    fn can_convert(&self, target: FieldType) -> bool {
        target.is_temporal()
    }

    fn convert(&self, request: &ConversionRequest<'_>) -> Option<FieldValue> {
        if request.is_empty_template() {
            return Self::truncate(request.original());
        }

        let text = request.template().trim();
        let parsed = match request.target() {
            FieldType::Date => parse_date(text).map(FieldValue::Date),
            FieldType::Time => parse_time(text).map(FieldValue::Time),
            FieldType::NaiveDateTime => parse_naive_date_time(text).map(FieldValue::NaiveDateTime),
            FieldType::DateTime => parse_utc(text).map(FieldValue::DateTime),
            _ => return None,
        };
        parsed.or_else(|| unparseable(request))
    }
}

/// `Uuid` fields. An empty template yields the nil UUID.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentifierConverter;

impl Converter for IdentifierConverter {
    fn priority(&self) -> i32 {
        0
    }

    fn can_convert(&self, target: FieldType) -> bool {
        target == FieldType::Uuid
    }

    fn convert(&self, request: &ConversionRequest<'_>) -> Option<FieldValue> {
        if request.is_empty_template() {
            return (!request.original().is_null()).then(|| FieldValue::Uuid(Uuid::nil()));
        }
        Uuid::parse_str(request.template().trim())
            .ok()
            .map(FieldValue::Uuid)
            .or_else(|| unparseable(request))
    }
}

/// Hands the template as text to [`FieldType::Custom`] leaves.
#[derive(Clone, Copy, Debug, Default)]
pub struct FallbackConverter;

impl Converter for FallbackConverter {
    fn priority(&self) -> i32 {
        0
    }

    fn can_convert(&self, target: FieldType) -> bool {
        matches!(target, FieldType::Custom(_))
    }

    fn convert(&self, request: &ConversionRequest<'_>) -> Option<FieldValue> {
        (!request.is_empty_template()).then(|| FieldValue::Text(request.template().to_string()))
    }
}
