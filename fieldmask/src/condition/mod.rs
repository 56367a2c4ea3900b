//! Conditions decide, per call, whether a marked field is masked.
//!
//! A condition is any `'static` type implementing [`MaskCondition`]. Fields
//! refer to condition *types*; instances are resolved at masking time by the
//! [`ConditionResolver`] and receive the caller's runtime input before being
//! asked [`MaskCondition::should_mask`].

use std::{
    any::{type_name, Any, TypeId},
    borrow::Cow,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::{aggregate::Aggregate, value::FieldValue};

mod resolver;

pub use resolver::{ConditionInstances, ConditionResolver, InstanceProvider};

/// Trigger expected by [`MatchesProvidedInput::default`].
pub const DEFAULT_MASK_TRIGGER: &str = "mask";

/// A runtime predicate deciding whether a field is masked.
///
/// Implementations that need collaborators (services, repositories, ...)
/// cannot be built locally; supply them through an
/// [`InstanceProvider`] such as [`ConditionInstances`].
pub trait MaskCondition: 'static {
    /// Receives the caller-supplied input bound to this condition type.
    ///
    /// Called only when the caller supplied an input for this type.
    fn set_input(&mut self, input: &ConditionInput) {
        let _ = input;
    }

    /// Returns `true` when `value` (the field's current value) should be
    /// masked. `container` is the aggregate that owns the field.
    fn should_mask(&self, value: &FieldValue, container: &dyn Aggregate) -> bool;
}

/// Identity of a condition type.
///
/// Equality and hashing use the type identity only.
#[derive(Clone, Copy)]
pub struct ConditionKey {
    type_id: TypeId,
    name: &'static str,
}

impl ConditionKey {
    /// Returns the key of condition type `C`.
    pub fn of<C: MaskCondition>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: type_name::<C>(),
        }
    }

    /// The condition's type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The condition's type identity.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

impl PartialEq for ConditionKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ConditionKey {}

impl Hash for ConditionKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ConditionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConditionKey").field(&self.name).finish()
    }
}

/// Builds a condition instance without outside help.
pub type LocalConstructor = fn() -> Box<dyn MaskCondition>;

pub(crate) fn construct_default<C>() -> Box<dyn MaskCondition>
where
    C: MaskCondition + Default,
{
    Box::new(C::default())
}

/// A reference from a mask marker to a condition type.
#[derive(Clone, Copy, Debug)]
pub struct ConditionRef {
    key: ConditionKey,
    local: Option<LocalConstructor>,
}

impl ConditionRef {
    /// References a condition that can be constructed locally via `Default`.
    pub fn of<C>() -> Self
    where
        C: MaskCondition + Default,
    {
        Self {
            key: ConditionKey::of::<C>(),
            local: Some(construct_default::<C>),
        }
    }

    /// References a condition that only an [`InstanceProvider`] can supply.
    pub fn provided<C: MaskCondition>() -> Self {
        Self {
            key: ConditionKey::of::<C>(),
            local: None,
        }
    }

    #[doc(hidden)]
    pub fn from_parts(key: ConditionKey, local: Option<LocalConstructor>) -> Self {
        Self { key, local }
    }

    pub fn key(&self) -> ConditionKey {
        self.key
    }

    /// The parameterless constructor, if the condition type has one.
    pub fn local_constructor(&self) -> Option<LocalConstructor> {
        self.local
    }
}

/// A runtime input handed to a condition through [`MaskCondition::set_input`].
///
/// Any `Send + Sync` value can be carried; text inputs are the common case and
/// get a direct accessor.
#[derive(Clone)]
pub struct ConditionInput(Arc<dyn Any + Send + Sync>);

impl ConditionInput {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self(Arc::new(value))
    }

    /// Returns the input as `T`, if it holds one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Returns the input as text, if it holds a `String` or a `&'static str`.
    pub fn as_str(&self) -> Option<&str> {
        self.downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| self.downcast_ref::<&'static str>().copied())
    }
}

impl fmt::Debug for ConditionInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(text) => f.debug_tuple("ConditionInput").field(&text).finish(),
            None => f.write_str("ConditionInput(..)"),
        }
    }
}

impl From<&str> for ConditionInput {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl From<String> for ConditionInput {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Masks unconditionally.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysMask;

impl MaskCondition for AlwaysMask {
    fn should_mask(&self, _value: &FieldValue, _container: &dyn Aggregate) -> bool {
        true
    }
}

/// Masks when the caller's input equals the expected trigger.
///
/// The default instance expects [`DEFAULT_MASK_TRIGGER`]. Register an instance
/// built with [`MatchesProvidedInput::expecting`] through an instance provider
/// to use another trigger. Without an input the field is left unmasked.
#[derive(Clone, Debug)]
pub struct MatchesProvidedInput {
    expected: Cow<'static, str>,
    input: Option<String>,
}

impl MatchesProvidedInput {
    pub fn expecting<S>(expected: S) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        Self {
            expected: expected.into(),
            input: None,
        }
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }
}

impl Default for MatchesProvidedInput {
    fn default() -> Self {
        Self::expecting(DEFAULT_MASK_TRIGGER)
    }
}

impl MaskCondition for MatchesProvidedInput {
    fn set_input(&mut self, input: &ConditionInput) {
        self.input = input.as_str().map(ToOwned::to_owned);
    }

    fn should_mask(&self, _value: &FieldValue, _container: &dyn Aggregate) -> bool {
        self.input.as_deref() == Some(self.expected.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AlwaysMask, ConditionInput, ConditionKey, ConditionRef, MaskCondition,
        MatchesProvidedInput,
    };
    use crate::{aggregate::Aggregate, value::FieldValue};

    struct Empty;

    impl Aggregate for Empty {
        fn type_name(&self) -> &'static str {
            "Empty"
        }

        fn field_value(&self, _name: &str) -> Option<FieldValue> {
            None
        }
    }

    #[test]
    fn always_mask_is_true() {
        assert!(AlwaysMask.should_mask(&FieldValue::Null, &Empty));
    }

    #[test]
    fn matches_provided_input_compares_with_trigger() {
        let mut condition = MatchesProvidedInput::default();
        assert!(!condition.should_mask(&FieldValue::Null, &Empty));

        condition.set_input(&ConditionInput::from("mask"));
        assert!(condition.should_mask(&FieldValue::Null, &Empty));

        condition.set_input(&ConditionInput::from("nomask"));
        assert!(!condition.should_mask(&FieldValue::Null, &Empty));
    }

    #[test]
    fn matches_provided_input_ignores_non_text_input() {
        let mut condition = MatchesProvidedInput::expecting("42");
        condition.set_input(&ConditionInput::new(42_u32));
        assert!(!condition.should_mask(&FieldValue::Null, &Empty));
    }

    #[test]
    fn condition_input_exposes_text_and_values() {
        let text = ConditionInput::from("abc");
        assert_eq!(text.as_str(), Some("abc"));

        let number = ConditionInput::new(7_i64);
        assert_eq!(number.downcast_ref::<i64>(), Some(&7));
        assert_eq!(number.as_str(), None);

        let literal = ConditionInput::new("static");
        assert_eq!(literal.as_str(), Some("static"));
    }

    #[test]
    fn keys_compare_by_type() {
        assert_eq!(ConditionKey::of::<AlwaysMask>(), ConditionKey::of::<AlwaysMask>());
        assert_ne!(
            ConditionKey::of::<AlwaysMask>(),
            ConditionKey::of::<MatchesProvidedInput>()
        );
        assert!(ConditionKey::of::<AlwaysMask>().name().ends_with("AlwaysMask"));
    }

    #[test]
    fn provided_refs_have_no_local_constructor() {
        assert!(ConditionRef::of::<AlwaysMask>().local_constructor().is_some());
        assert!(ConditionRef::provided::<AlwaysMask>()
            .local_constructor()
            .is_none());
    }
}
