//! Runtime inputs for conditions.
//!
//! Two layers exist:
//! - [`ExecutionContext`] is the ambient, thread-scoped store callers fill
//!   before invoking the facade.
//! - [`MaskingContext`] is the explicit snapshot the engine reads during one
//!   masking pass. The facade captures the thread-scoped store into it.

use std::{cell::RefCell, collections::HashMap, fmt, marker::PhantomData};

use crate::condition::{ConditionInput, ConditionKey, MaskCondition};

/// Identifier of a request scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(String);

impl RequestId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Default)]
struct ThreadState {
    inputs: HashMap<ConditionKey, ConditionInput>,
    request_id: Option<RequestId>,
}

thread_local! {
    static EXECUTION_CONTEXT: RefCell<Option<ThreadState>> = const { RefCell::new(None) };
}

fn with_state<R>(f: impl FnOnce(&Option<ThreadState>) -> R) -> R {
    EXECUTION_CONTEXT.with(|state| f(&state.borrow()))
}

fn with_state_mut<R>(f: impl FnOnce(&mut Option<ThreadState>) -> R) -> R {
    EXECUTION_CONTEXT.with(|state| f(&mut state.borrow_mut()))
}

/// Thread-scoped condition inputs and request binding.
///
/// The store is created on first use and lives until [`ExecutionContext::clear`]
/// or until the facade clears the inputs at the end of a masking call.
///
/// ```rust
/// use fieldmask::{ExecutionContext, MatchesProvidedInput};
///
/// ExecutionContext::set_condition_input::<MatchesProvidedInput>("mask");
/// assert!(ExecutionContext::is_active());
/// ExecutionContext::clear();
/// assert!(!ExecutionContext::is_active());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext;

impl ExecutionContext {
    /// Binds `input` to condition type `C` for the calling thread.
    pub fn set_condition_input<C: MaskCondition>(input: impl Into<ConditionInput>) {
        let input = input.into();
        with_state_mut(|state| {
            state
                .get_or_insert_with(ThreadState::default)
                .inputs
                .insert(ConditionKey::of::<C>(), input);
        });
    }

    pub fn condition_input<C: MaskCondition>() -> Option<ConditionInput> {
        with_state(|state| {
            state
                .as_ref()
                .and_then(|state| state.inputs.get(&ConditionKey::of::<C>()).cloned())
        })
    }

    /// Drops every input of the calling thread. A bound request stays bound.
    pub fn clear_inputs() {
        with_state_mut(|state| {
            let bound = state
                .as_ref()
                .is_some_and(|current| current.request_id.is_some());
            if !bound {
                *state = None;
            } else if let Some(current) = state.as_mut() {
                current.inputs.clear();
            }
        });
    }

    /// Drops the calling thread's context entirely, request binding included.
    ///
    /// This does not end the request scope; use
    /// [`end_request`](crate::end_request) for that.
    pub fn clear() {
        with_state_mut(|state| *state = None);
    }

    /// Returns `true` when the calling thread holds inputs or a request binding.
    pub fn is_active() -> bool {
        with_state(Option::is_some)
    }

    /// The request bound to the calling thread, if any.
    pub fn current_request() -> Option<RequestId> {
        with_state(|state| state.as_ref().and_then(|state| state.request_id.clone()))
    }

    pub(crate) fn bind_request(id: RequestId) -> Option<RequestId> {
        with_state_mut(|state| {
            state
                .get_or_insert_with(ThreadState::default)
                .request_id
                .replace(id)
        })
    }

    pub(crate) fn unbind_request() -> Option<RequestId> {
        with_state_mut(|state| {
            let current = state.as_mut()?;
            let id = current.request_id.take();
            if current.inputs.is_empty() {
                *state = None;
            }
            id
        })
    }

    fn snapshot() -> MaskingContext {
        with_state(|state| {
            state.as_ref().map_or_else(MaskingContext::new, |state| MaskingContext {
                inputs: state.inputs.clone(),
                request_id: state.request_id.clone(),
            })
        })
    }
}

/// Clears the thread-scoped inputs when dropped.
///
/// Not `Send`: it must be dropped on the thread whose context it guards.
#[derive(Debug)]
pub struct ContextGuard {
    _not_send: PhantomData<*const ()>,
}

impl ContextGuard {
    pub fn enter() -> Self {
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        ExecutionContext::clear_inputs();
    }
}

/// The inputs and request scope visible to one masking pass.
#[derive(Clone, Debug, Default)]
pub struct MaskingContext {
    inputs: HashMap<ConditionKey, ConditionInput>,
    request_id: Option<RequestId>,
}

impl MaskingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the calling thread's [`ExecutionContext`].
    pub fn capture() -> Self {
        ExecutionContext::snapshot()
    }

    #[must_use]
    pub fn with_input<C: MaskCondition>(mut self, input: impl Into<ConditionInput>) -> Self {
        self.insert_input(ConditionKey::of::<C>(), input.into());
        self
    }

    #[must_use]
    pub fn with_request(mut self, id: impl Into<RequestId>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn insert_input(&mut self, key: ConditionKey, input: ConditionInput) {
        self.inputs.insert(key, input);
    }

    pub fn input(&self, key: ConditionKey) -> Option<&ConditionInput> {
        self.inputs.get(&key)
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Layers `other` on top of `self`: its inputs replace ours key by key and
    /// its request id, when set, replaces ours.
    #[must_use]
    pub fn overlay(mut self, other: Self) -> Self {
        self.inputs.extend(other.inputs);
        if other.request_id.is_some() {
            self.request_id = other.request_id;
        }
        self
    }
}
