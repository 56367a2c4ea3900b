//! Compile-time dispatch helpers used by `#[derive(Maskable)]`.
//!
//! The derive cannot see whether a member type implements a trait, so the
//! generated code asks through method resolution: an impl on a probe with
//! fewer references wins when its bounds hold, otherwise auto-ref/deref falls
//! through to the next impl. This only works for concrete types; the derive
//! emits plain trait bounds for members typed by a generic parameter.
//!
//! Not public API.

use std::{any::type_name, fmt::Display, marker::PhantomData};

use crate::{
    aggregate::MaskNested,
    condition::{construct_default, LocalConstructor, MaskCondition},
    engine::MaskingPass,
    error::MaskError,
    value::{FieldValue, MaskValue},
};

pub struct TypeProbe<T: ?Sized>(PhantomData<fn() -> T>);

impl<T: ?Sized> TypeProbe<T> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: ?Sized> Default for TypeProbe<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Member kind: walked or copied.

#[derive(Clone, Copy)]
pub struct NestedMember;

impl NestedMember {
    pub fn mask_member<T: MaskNested>(
        self,
        value: &T,
        pass: &MaskingPass<'_>,
    ) -> Result<T, MaskError> {
        value.mask_nested(pass)
    }

    pub const fn is_nested(self) -> bool {
        true
    }
}

#[derive(Clone, Copy)]
pub struct CopiedMember;

impl CopiedMember {
    pub fn mask_member<T: Clone>(self, value: &T, _pass: &MaskingPass<'_>) -> Result<T, MaskError> {
        Ok(value.clone())
    }

    pub const fn is_nested(self) -> bool {
        false
    }
}

pub trait NestedMemberKind {
    fn member_kind(&self) -> NestedMember {
        NestedMember
    }
}

impl<T: MaskNested> NestedMemberKind for TypeProbe<T> {}

pub trait CopiedMemberKind {
    fn member_kind(&self) -> CopiedMember {
        CopiedMember
    }
}

impl<T> CopiedMemberKind for &TypeProbe<T> {}

// Value kind: how a member is exposed through `Aggregate::field_value`.

#[derive(Clone, Copy)]
pub struct LeafValue;

impl LeafValue {
    pub fn field_value<T: MaskValue>(self, value: &T) -> FieldValue {
        value.to_field_value()
    }
}

#[derive(Clone, Copy)]
pub struct DisplayValue;

impl DisplayValue {
    pub fn field_value<T: Display>(self, value: &T) -> FieldValue {
        FieldValue::Text(value.to_string())
    }
}

#[derive(Clone, Copy)]
pub struct OpaqueValue;

impl OpaqueValue {
    pub fn field_value<T: ?Sized>(self, _value: &T) -> FieldValue {
        FieldValue::Opaque(type_name::<T>())
    }
}

pub trait LeafValueKind {
    fn value_kind(&self) -> LeafValue {
        LeafValue
    }
}

impl<T: MaskValue> LeafValueKind for &&TypeProbe<T> {}

pub trait DisplayValueKind {
    fn value_kind(&self) -> DisplayValue {
        DisplayValue
    }
}

impl<T: Display + ?Sized> DisplayValueKind for &TypeProbe<T> {}

pub trait OpaqueValueKind {
    fn value_kind(&self) -> OpaqueValue {
        OpaqueValue
    }
}

impl<T: ?Sized> OpaqueValueKind for TypeProbe<T> {}

// Condition construction: locally via `Default`, or provider only.

pub struct ConditionProbe<C>(PhantomData<fn() -> C>);

impl<C> ConditionProbe<C> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<C> Default for ConditionProbe<C> {
    fn default() -> Self {
        Self::new()
    }
}

pub trait DefaultConstructible {
    fn local_constructor(&self) -> Option<LocalConstructor>;
}

impl<C: MaskCondition + Default> DefaultConstructible for ConditionProbe<C> {
    fn local_constructor(&self) -> Option<LocalConstructor> {
        Some(construct_default::<C>)
    }
}

pub trait ProviderOnly {
    fn local_constructor(&self) -> Option<LocalConstructor> {
        None
    }
}

impl<C: MaskCondition> ProviderOnly for &ConditionProbe<C> {}
