//! Resolution and evaluation of conditions.

use std::{any::TypeId, collections::HashMap, fmt, sync::Arc};

use tracing::{debug, warn};

use super::{ConditionKey, ConditionRef, MaskCondition};
use crate::{
    aggregate::Aggregate,
    context::{MaskingContext, RequestId},
    error::{MaskError, ProviderError},
    registry::ProviderRegistry,
    value::FieldValue,
};

/// Supplies condition instances the engine cannot build on its own.
///
/// This is the seam for dependency-injection containers. Returning `Ok(None)`
/// means "this type is not managed here". Errors are logged and treated the
/// same way.
pub trait InstanceProvider: Send + Sync {
    fn get_instance(
        &self,
        key: ConditionKey,
    ) -> Result<Option<Box<dyn MaskCondition>>, ProviderError>;
}

type Factory = Arc<dyn Fn() -> Box<dyn MaskCondition> + Send + Sync>;

/// A map-backed [`InstanceProvider`] keyed by condition type.
///
/// Each lookup calls the registered factory, so every evaluation gets its own
/// instance.
///
/// ```rust
/// use fieldmask::{Aggregate, ConditionInstances, FieldValue, MaskCondition};
///
/// struct BlockedPhones {
///     blocked: Vec<String>,
/// }
///
/// impl MaskCondition for BlockedPhones {
///     fn should_mask(&self, value: &FieldValue, _container: &dyn Aggregate) -> bool {
///         value
///             .as_text()
///             .is_some_and(|phone| self.blocked.iter().any(|b| b == phone))
///     }
/// }
///
/// let blocked = vec!["0100".to_string()];
/// let instances = ConditionInstances::new()
///     .register(move || BlockedPhones { blocked: blocked.clone() });
/// assert!(instances.contains::<BlockedPhones>());
/// ```
#[derive(Clone, Default)]
pub struct ConditionInstances {
    factories: HashMap<TypeId, Factory>,
}

impl ConditionInstances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for condition type `C`, replacing any previous one.
    #[must_use]
    pub fn register<C, F>(mut self, factory: F) -> Self
    where
        C: MaskCondition,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.insert(factory);
        self
    }

    /// In-place form of [`ConditionInstances::register`].
    pub fn insert<C, F>(&mut self, factory: F)
    where
        C: MaskCondition,
        F: Fn() -> C + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move || Box::new(factory()) as Box<dyn MaskCondition>);
        self.factories.insert(TypeId::of::<C>(), factory);
    }

    pub fn contains<C: MaskCondition>(&self) -> bool {
        self.factories.contains_key(&TypeId::of::<C>())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn clear(&mut self) {
        self.factories.clear();
    }
}

impl fmt::Debug for ConditionInstances {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionInstances")
            .field("len", &self.factories.len())
            .finish()
    }
}

impl InstanceProvider for ConditionInstances {
    fn get_instance(
        &self,
        key: ConditionKey,
    ) -> Result<Option<Box<dyn MaskCondition>>, ProviderError> {
        Ok(self.factories.get(&key.type_id()).map(|factory| factory()))
    }
}

/// Turns condition references into instances and evaluates them.
///
/// Providers are consulted in order; the first one returning an instance wins.
/// Without one the condition's parameterless constructor is used.
#[derive(Clone, Default)]
pub struct ConditionResolver {
    providers: Vec<Arc<dyn InstanceProvider>>,
}

impl ConditionResolver {
    pub fn new(providers: Vec<Arc<dyn InstanceProvider>>) -> Self {
        Self { providers }
    }

    /// Captures the providers registered for the calling thread, the given
    /// request and the process, in that order.
    pub fn snapshot(request: Option<&RequestId>) -> Self {
        Self::new(ProviderRegistry::ordered(request))
    }

    pub fn resolve(&self, condition: &ConditionRef) -> Result<Box<dyn MaskCondition>, MaskError> {
        let key = condition.key();
        for provider in &self.providers {
            match provider.get_instance(key) {
                Ok(Some(instance)) => return Ok(instance),
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        condition = key.name(),
                        error = %err,
                        "instance provider failed, falling back"
                    );
                }
            }
        }

        condition
            .local_constructor()
            .map(|construct| construct())
            .ok_or(MaskError::UnresolvedCondition {
                condition: key.name(),
            })
    }

    /// Evaluates `conditions` with OR semantics, stopping at the first match.
    ///
    /// Each condition receives the input bound to its type in `context`
    /// before it is evaluated.
    pub fn should_mask(
        &self,
        conditions: &[ConditionRef],
        value: &FieldValue,
        container: &dyn Aggregate,
        context: &MaskingContext,
    ) -> Result<bool, MaskError> {
        for condition in conditions {
            let mut instance = self.resolve(condition)?;
            if let Some(input) = context.input(condition.key()) {
                instance.set_input(input);
            }
            if instance.should_mask(value, container) {
                debug!(condition = condition.key().name(), "condition matched");
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl fmt::Debug for ConditionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionResolver")
            .field("providers", &self.providers.len())
            .finish()
    }
}
