//! Scoped registries for converters and condition instance providers.
//!
//! Registrations live in one of three zones above the built-in converters:
//!
//! - **Thread**: visible only to the registering thread.
//! - **Request**: keyed by a [`RequestId`]; visible to passes that run with
//!   that request bound and dropped by [`end_request`].
//! - **Global**: visible process-wide until cleared.
//!
//! A masking pass snapshots the zones in that order, each sorted by
//! descending priority with ties kept in registration order.

use std::{
    cell::RefCell,
    cmp::Reverse,
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
    thread::LocalKey,
};

use once_cell::sync::Lazy;
use tracing::debug;

use crate::{
    condition::InstanceProvider,
    context::{ExecutionContext, RequestId},
    convert::Converter,
};

/// The zone a registration lives in.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Thread,
    Request(RequestId),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Thread => f.write_str("thread"),
            Self::Request(id) => write!(f, "request:{id}"),
        }
    }
}

/// One registered entry.
pub struct Registration<T: ?Sized> {
    entry: Arc<T>,
    priority: i32,
    scope: Scope,
}

impl<T: ?Sized> Registration<T> {
    pub fn entry(&self) -> &Arc<T> {
        &self.entry
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl<T: ?Sized> Clone for Registration<T> {
    fn clone(&self) -> Self {
        Self {
            entry: Arc::clone(&self.entry),
            priority: self.priority,
            scope: self.scope.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Registration<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("priority", &self.priority)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

type Entries<T> = Vec<Registration<T>>;

struct ScopeTables<T: ?Sized + 'static> {
    thread: &'static LocalKey<RefCell<Entries<T>>>,
    global: RwLock<Entries<T>>,
    requests: RwLock<HashMap<RequestId, Entries<T>>>,
}

fn by_priority<T: ?Sized>(entries: &[Registration<T>]) -> Vec<Registration<T>> {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|registration| Reverse(registration.priority));
    sorted
}

impl<T: ?Sized + 'static> ScopeTables<T> {
    fn new(thread: &'static LocalKey<RefCell<Entries<T>>>) -> Self {
        Self {
            thread,
            global: RwLock::new(Vec::new()),
            requests: RwLock::new(HashMap::new()),
        }
    }

    fn register(&self, entry: Arc<T>, priority: i32, scope: Scope) {
        let registration = Registration {
            entry,
            priority,
            scope: scope.clone(),
        };
        match scope {
            Scope::Global => self
                .global
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .push(registration),
            Scope::Thread => self
                .thread
                .with(|entries| entries.borrow_mut().push(registration)),
            Scope::Request(id) => self
                .requests
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(id)
                .or_default()
                .push(registration),
        }
    }

    fn clear(&self, scope: &Scope) {
        match scope {
            Scope::Global => self
                .global
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .clear(),
            Scope::Thread => self.thread.with(|entries| entries.borrow_mut().clear()),
            Scope::Request(id) => {
                self.requests
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(id);
            }
        }
    }

    fn registrations(&self, scope: &Scope) -> Entries<T> {
        match scope {
            Scope::Global => by_priority(&self.global.read().unwrap_or_else(PoisonError::into_inner)),
            Scope::Thread => self.thread.with(|entries| by_priority(&entries.borrow())),
            Scope::Request(id) => self
                .requests
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(id)
                .map(|entries| by_priority(entries))
                .unwrap_or_default(),
        }
    }

    fn ordered(&self, request: Option<&RequestId>) -> Vec<Arc<T>> {
        let mut layers = self.registrations(&Scope::Thread);
        if let Some(id) = request {
            layers.extend(self.registrations(&Scope::Request(id.clone())));
        }
        layers.extend(self.registrations(&Scope::Global));
        layers
            .into_iter()
            .map(|registration| registration.entry)
            .collect()
    }
}

thread_local! {
    static THREAD_CONVERTERS: RefCell<Entries<dyn Converter>> = const { RefCell::new(Vec::new()) };
    static THREAD_PROVIDERS: RefCell<Entries<dyn InstanceProvider>> = const { RefCell::new(Vec::new()) };
}

static CONVERTERS: Lazy<ScopeTables<dyn Converter>> =
    Lazy::new(|| ScopeTables::new(&THREAD_CONVERTERS));

static PROVIDERS: Lazy<ScopeTables<dyn InstanceProvider>> =
    Lazy::new(|| ScopeTables::new(&THREAD_PROVIDERS));

/// Registry of user [`Converter`]s.
///
/// A converter's scope position comes from [`Converter::priority`]. Duplicate
/// registrations co-exist.
///
/// ```rust
/// use fieldmask::{ConversionRequest, Converter, ConverterRegistry, FieldType, FieldValue, Scope};
///
/// struct Shout;
///
/// impl Converter for Shout {
///     fn priority(&self) -> i32 {
///         10
///     }
///
///     fn can_convert(&self, target: FieldType) -> bool {
///         target == FieldType::String
///     }
///
///     fn convert(&self, request: &ConversionRequest<'_>) -> Option<FieldValue> {
///         Some(FieldValue::Text(request.template().to_uppercase()))
///     }
/// }
///
/// ConverterRegistry::register_thread(Shout);
/// assert_eq!(ConverterRegistry::registrations(&Scope::Thread).len(), 1);
/// ConverterRegistry::clear_thread();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ConverterRegistry;

impl ConverterRegistry {
    pub fn register<C: Converter + 'static>(converter: C, scope: Scope) {
        Self::register_shared(Arc::new(converter), scope);
    }

    /// Registers an already shared converter.
    pub fn register_shared(converter: Arc<dyn Converter>, scope: Scope) {
        let priority = converter.priority();
        debug!(converter = converter.name(), priority, %scope, "registering converter");
        CONVERTERS.register(converter, priority, scope);
    }

    pub fn register_global<C: Converter + 'static>(converter: C) {
        Self::register(converter, Scope::Global);
    }

    pub fn register_thread<C: Converter + 'static>(converter: C) {
        Self::register(converter, Scope::Thread);
    }

    pub fn register_request<C: Converter + 'static>(id: impl Into<RequestId>, converter: C) {
        Self::register(converter, Scope::Request(id.into()));
    }

    pub fn clear(scope: &Scope) {
        CONVERTERS.clear(scope);
    }

    pub fn clear_global() {
        Self::clear(&Scope::Global);
    }

    /// Clears the calling thread's converters only.
    pub fn clear_thread() {
        Self::clear(&Scope::Thread);
    }

    pub fn clear_request(id: &RequestId) {
        Self::clear(&Scope::Request(id.clone()));
    }

    /// The registrations of `scope`, in evaluation order.
    pub fn registrations(scope: &Scope) -> Vec<Registration<dyn Converter>> {
        CONVERTERS.registrations(scope)
    }

    pub(crate) fn ordered(request: Option<&RequestId>) -> Vec<Arc<dyn Converter>> {
        CONVERTERS.ordered(request)
    }
}

/// Registry of [`InstanceProvider`]s used to resolve conditions.
///
/// Providers carry no priority of their own; within a zone they are consulted
/// in registration order.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRegistry;

impl ProviderRegistry {
    pub fn register<P: InstanceProvider + 'static>(provider: P, scope: Scope) {
        Self::register_shared(Arc::new(provider), scope);
    }

    pub fn register_shared(provider: Arc<dyn InstanceProvider>, scope: Scope) {
        debug!(%scope, "registering instance provider");
        PROVIDERS.register(provider, 0, scope);
    }

    pub fn register_global<P: InstanceProvider + 'static>(provider: P) {
        Self::register(provider, Scope::Global);
    }

    pub fn register_thread<P: InstanceProvider + 'static>(provider: P) {
        Self::register(provider, Scope::Thread);
    }

    pub fn register_request<P: InstanceProvider + 'static>(id: impl Into<RequestId>, provider: P) {
        Self::register(provider, Scope::Request(id.into()));
    }

    pub fn clear(scope: &Scope) {
        PROVIDERS.clear(scope);
    }

    pub fn clear_global() {
        Self::clear(&Scope::Global);
    }

    pub fn clear_thread() {
        Self::clear(&Scope::Thread);
    }

    pub fn clear_request(id: &RequestId) {
        Self::clear(&Scope::Request(id.clone()));
    }

    pub fn registrations(scope: &Scope) -> Vec<Registration<dyn InstanceProvider>> {
        PROVIDERS.registrations(scope)
    }

    pub(crate) fn ordered(request: Option<&RequestId>) -> Vec<Arc<dyn InstanceProvider>> {
        PROVIDERS.ordered(request)
    }
}

/// Binds request `id` to the calling thread.
///
/// Passes started by the facade on this thread see the request's
/// registrations until [`end_request`] is called.
pub fn begin_request(id: impl Into<RequestId>) {
    let id = id.into();
    debug!(request = %id, "request scope started");
    if let Some(previous) = ExecutionContext::bind_request(id) {
        debug!(request = %previous, "request scope replaced without being ended");
    }
}

/// Ends the request bound to the calling thread and drops its registrations.
///
/// Without a bound request this does nothing.
pub fn end_request() {
    if let Some(id) = ExecutionContext::unbind_request() {
        CONVERTERS.clear(&Scope::Request(id.clone()));
        PROVIDERS.clear(&Scope::Request(id.clone()));
        debug!(request = %id, "request scope ended");
    }
}

/// Ends its request scope when dropped.
///
/// ```rust
/// use fieldmask::{ExecutionContext, RequestScope};
///
/// {
///     let _scope = RequestScope::begin("req-42");
///     assert_eq!(
///         ExecutionContext::current_request().map(|id| id.to_string()),
///         Some("req-42".to_string())
///     );
/// }
/// assert!(ExecutionContext::current_request().is_none());
/// ```
#[derive(Debug)]
#[must_use = "the request scope ends when this guard is dropped"]
pub struct RequestScope {
    id: RequestId,
}

impl RequestScope {
    pub fn begin(id: impl Into<RequestId>) -> Self {
        let id = id.into();
        begin_request(id.clone());
        Self { id }
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        end_request();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{
        begin_request, end_request, ConverterRegistry, ProviderRegistry, RequestScope, Scope,
    };
    use crate::{
        condition::ConditionInstances,
        context::{ExecutionContext, RequestId},
        convert::{ConversionRequest, Converter},
        value::{FieldType, FieldValue},
    };

    struct Labelled {
        label: &'static str,
        priority: i32,
    }

    impl Converter for Labelled {
        fn priority(&self) -> i32 {
            self.priority
        }

        fn can_convert(&self, target: FieldType) -> bool {
            target == FieldType::String
        }

        fn convert(&self, _request: &ConversionRequest<'_>) -> Option<FieldValue> {
            Some(FieldValue::from(self.label))
        }
    }

    fn labels(converters: &[Arc<dyn Converter>]) -> Vec<i32> {
        converters.iter().map(|converter| converter.priority()).collect()
    }

    #[test]
    fn thread_registrations_sort_by_priority_then_order() {
        ConverterRegistry::clear_thread();
        ConverterRegistry::register_thread(Labelled { label: "low", priority: 1 });
        ConverterRegistry::register_thread(Labelled { label: "high", priority: 20 });
        ConverterRegistry::register_thread(Labelled { label: "low-2", priority: 1 });

        let registrations = ConverterRegistry::registrations(&Scope::Thread);
        let priorities: Vec<_> = registrations.iter().map(|r| r.priority()).collect();
        assert_eq!(priorities, vec![20, 1, 1]);
        assert!(registrations.iter().all(|r| r.scope() == &Scope::Thread));
        ConverterRegistry::clear_thread();
        assert!(ConverterRegistry::registrations(&Scope::Thread).is_empty());
    }

    #[test]
    fn thread_zone_precedes_request_zone() {
        let id = RequestId::from("registry-order");
        ConverterRegistry::clear_thread();
        ConverterRegistry::register_request(id.clone(), Labelled { label: "request", priority: 50 });
        ConverterRegistry::register_thread(Labelled { label: "thread", priority: 5 });

        let ordered = ConverterRegistry::ordered(Some(&id));
        assert_eq!(labels(&ordered)[..2], [5, 50]);

        let without_request = ConverterRegistry::ordered(None);
        assert!(!labels(&without_request).contains(&50));

        ConverterRegistry::clear_request(&id);
        ConverterRegistry::clear_thread();
    }

    #[test]
    fn thread_registrations_are_invisible_to_other_threads() {
        ConverterRegistry::register_thread(Labelled { label: "local", priority: 3 });
        let seen = std::thread::spawn(|| ConverterRegistry::registrations(&Scope::Thread).len())
            .join()
            .unwrap();
        assert_eq!(seen, 0);
        ConverterRegistry::clear_thread();
    }

    #[test]
    fn ending_a_request_drops_its_registrations() {
        let id = RequestId::from("registry-end");
        begin_request(id.clone());
        ConverterRegistry::register_request(id.clone(), Labelled { label: "r", priority: 1 });
        ProviderRegistry::register_request(id.clone(), ConditionInstances::new());
        assert_eq!(ExecutionContext::current_request(), Some(id.clone()));

        end_request();
        assert!(ConverterRegistry::registrations(&Scope::Request(id.clone())).is_empty());
        assert!(ProviderRegistry::registrations(&Scope::Request(id)).is_empty());
        assert!(ExecutionContext::current_request().is_none());
    }

    #[test]
    fn ending_without_a_request_is_a_no_op() {
        ExecutionContext::clear();
        end_request();
        assert!(!ExecutionContext::is_active());
    }

    #[test]
    fn request_scope_guard_ends_on_drop() {
        let id = RequestId::from("registry-guard");
        {
            let scope = RequestScope::begin(id.clone());
            assert_eq!(scope.id(), &id);
            ProviderRegistry::register_request(id.clone(), ConditionInstances::new());
        }
        assert!(ProviderRegistry::registrations(&Scope::Request(id)).is_empty());
        assert!(ExecutionContext::current_request().is_none());
    }

    #[test]
    fn scopes_display_their_zone() {
        assert_eq!(Scope::Global.to_string(), "global");
        assert_eq!(Scope::Request(RequestId::from("r1")).to_string(), "request:r1");
    }
}
