//! Aggregates: the structured values the engine walks.
//!
//! `#[derive(Maskable)]` implements [`Aggregate`], [`Maskable`] and
//! [`MaskNested`] for a struct. The traits are public so hand-written
//! implementations can take part in the same pipeline.

use std::{
    borrow::Cow,
    collections::{BTreeMap, HashMap},
    hash::{BuildHasher, Hash},
};

use crate::{
    condition::{ConditionRef, MaskCondition},
    engine::MaskingPass,
    error::MaskError,
    value::FieldValue,
};

/// Template used when a mask marker does not set one.
pub const DEFAULT_MASK_TEMPLATE: &str = "****";

/// Read access to the members of an aggregate, by name.
///
/// Tuple structs name their members `"0"`, `"1"`, and so on.
pub trait Aggregate {
    fn type_name(&self) -> &'static str;

    /// Returns the current value of member `name`, or `None` if there is no
    /// such member. Members without a textual form return
    /// [`FieldValue::Opaque`].
    fn field_value(&self, name: &str) -> Option<FieldValue>;
}

/// How the masked copy of an aggregate is constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateShape {
    /// Built in one step from all members, in declaration order.
    Tuple,
    /// Default-constructed, then populated member by member.
    Record,
}

/// The mask attached to one member.
#[derive(Clone, Debug)]
pub struct MaskMarker {
    conditions: Vec<ConditionRef>,
    template: Cow<'static, str>,
}

impl MaskMarker {
    /// Builds a marker from explicit condition references.
    pub fn new<T>(conditions: Vec<ConditionRef>, template: T) -> Result<Self, MaskError>
    where
        T: Into<Cow<'static, str>>,
    {
        if conditions.is_empty() {
            return Err(MaskError::EmptyConditions);
        }
        Ok(Self {
            conditions,
            template: template.into(),
        })
    }

    /// A marker masking with [`DEFAULT_MASK_TEMPLATE`] when `C` holds.
    pub fn when<C>() -> Self
    where
        C: MaskCondition + Default,
    {
        Self {
            conditions: vec![ConditionRef::of::<C>()],
            template: Cow::Borrowed(DEFAULT_MASK_TEMPLATE),
        }
    }

    /// Adds `C` as an alternative condition.
    #[must_use]
    pub fn or_when<C>(mut self) -> Self
    where
        C: MaskCondition + Default,
    {
        self.conditions.push(ConditionRef::of::<C>());
        self
    }

    /// Adds `C`, which only an instance provider can supply.
    #[must_use]
    pub fn or_when_provided<C: MaskCondition>(mut self) -> Self {
        self.conditions.push(ConditionRef::provided::<C>());
        self
    }

    #[must_use]
    pub fn with_template<T>(mut self, template: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        self.template = template.into();
        self
    }

    #[doc(hidden)]
    pub fn from_derive(conditions: Vec<ConditionRef>, template: &'static str) -> Self {
        Self {
            conditions,
            template: Cow::Borrowed(template),
        }
    }

    pub fn conditions(&self) -> &[ConditionRef] {
        &self.conditions
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

/// One member of an aggregate, as seen by discovery.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    name: &'static str,
    declared_type: &'static str,
    marker: Option<MaskMarker>,
    excluded: bool,
    nested: bool,
}

impl FieldDescriptor {
    /// An unmarked member. `nested` members are walked recursively.
    pub fn plain(name: &'static str, declared_type: &'static str, nested: bool) -> Self {
        Self {
            name,
            declared_type,
            marker: None,
            excluded: false,
            nested,
        }
    }

    pub fn masked(name: &'static str, declared_type: &'static str, marker: MaskMarker) -> Self {
        Self {
            name,
            declared_type,
            marker: Some(marker),
            excluded: false,
            nested: false,
        }
    }

    pub fn excluded(name: &'static str, declared_type: &'static str) -> Self {
        Self {
            name,
            declared_type,
            marker: None,
            excluded: true,
            nested: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The member type as written in the source.
    pub fn declared_type(&self) -> &'static str {
        self.declared_type
    }

    pub fn marker(&self) -> Option<&MaskMarker> {
        self.marker.as_ref()
    }

    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    pub fn is_nested(&self) -> bool {
        self.nested
    }
}

/// The discovered structure of an aggregate type.
#[derive(Clone, Debug)]
pub struct AggregateDescriptor {
    type_name: &'static str,
    shape: AggregateShape,
    fields: Vec<FieldDescriptor>,
}

impl AggregateDescriptor {
    pub fn new(type_name: &'static str, shape: AggregateShape, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            type_name,
            shape,
            fields,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn shape(&self) -> AggregateShape {
        self.shape
    }

    /// Members in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Members carrying a mask marker, in declaration order.
    pub fn masked_fields(&self) -> impl Iterator<Item = &FieldDescriptor> + '_ {
        self.fields.iter().filter(|field| field.marker.is_some())
    }
}

/// An aggregate type the engine can produce masked copies of.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Maskable`",
    label = "this type cannot be masked",
    note = "add `#[derive(fieldmask::Maskable)]` to the type definition"
)]
pub trait Maskable: Aggregate + Sized {
    /// Describes the members of `Self`. Has no side effects.
    fn describe() -> AggregateDescriptor;

    /// Produces a masked copy of `self` within `pass`.
    fn mask_with(&self, pass: &MaskingPass<'_>) -> Result<Self, MaskError>;
}

/// Describes aggregate type `T`.
pub fn describe<T: Maskable>() -> AggregateDescriptor {
    T::describe()
}

/// A value the engine can walk into: a [`Maskable`] aggregate or a container
/// of them.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be walked for masking",
    label = "this type does not implement `MaskNested`",
    note = "derive `Maskable` on the type, or mark the field `#[mask(exclude)]` to copy it unchanged"
)]
pub trait MaskNested: Sized {
    fn mask_nested(&self, pass: &MaskingPass<'_>) -> Result<Self, MaskError>;
}

impl<T: MaskNested> MaskNested for Option<T> {
    fn mask_nested(&self, pass: &MaskingPass<'_>) -> Result<Self, MaskError> {
        self.as_ref().map(|value| value.mask_nested(pass)).transpose()
    }
}

impl<T: MaskNested> MaskNested for Vec<T> {
    fn mask_nested(&self, pass: &MaskingPass<'_>) -> Result<Self, MaskError> {
        self.iter().map(|value| value.mask_nested(pass)).collect()
    }
}

impl<T: MaskNested> MaskNested for Box<T> {
    fn mask_nested(&self, pass: &MaskingPass<'_>) -> Result<Self, MaskError> {
        (**self).mask_nested(pass).map(Box::new)
    }
}

impl<K, V, S> MaskNested for HashMap<K, V, S>
where
    K: Clone + Eq + Hash,
    V: MaskNested,
    S: BuildHasher + Clone,
{
    fn mask_nested(&self, pass: &MaskingPass<'_>) -> Result<Self, MaskError> {
        let mut masked = HashMap::with_capacity_and_hasher(self.len(), self.hasher().clone());
        for (key, value) in self {
            masked.insert(key.clone(), value.mask_nested(pass)?);
        }
        Ok(masked)
    }
}

impl<K, V> MaskNested for BTreeMap<K, V>
where
    K: Clone + Ord,
    V: MaskNested,
{
    fn mask_nested(&self, pass: &MaskingPass<'_>) -> Result<Self, MaskError> {
        self.iter()
            .map(|(key, value)| Ok((key.clone(), value.mask_nested(pass)?)))
            .collect()
    }
}
