//! Scoped registries: converter ordering, scope layering and instance
//! providers.
//!
//! Thread-scoped registrations are cleared by a guard in every test so that a
//! test runner reusing threads starts each test from an empty thread zone.
//! Global registrations only target types private to a single test.

use std::fmt;

use fieldmask::{
    mask, Aggregate, ConditionInstances, ConditionKey, ConversionRequest, Converter,
    ConverterRegistry, FieldType, FieldValue, InstanceProvider, MaskCondition, MaskValue,
    Maskable, Masker, ProviderError, ProviderRegistry, RequestScope, Scope,
};

struct ThreadZone;

impl ThreadZone {
    fn enter() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
        ConverterRegistry::clear_thread();
        ProviderRegistry::clear_thread();
        Self
    }
}

impl Drop for ThreadZone {
    fn drop(&mut self) {
        ConverterRegistry::clear_thread();
        ProviderRegistry::clear_thread();
    }
}

/// Declares a text newtype that converters can target by name.
macro_rules! text_newtype {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq)]
        struct $name(String);

        impl MaskValue for $name {
            fn field_type() -> FieldType {
                FieldType::Custom(stringify!($name))
            }

            fn to_field_value(&self) -> FieldValue {
                FieldValue::Text(self.0.clone())
            }

            fn from_field_value(value: FieldValue) -> Option<Self> {
                match value {
                    FieldValue::Text(text) => Some(Self(text)),
                    _ => None,
                }
            }
        }
    };
}

/// Produces a fixed text for one custom field type.
struct Fixed {
    target: &'static str,
    priority: i32,
    output: &'static str,
}

impl Fixed {
    fn new(target: &'static str, priority: i32, output: &'static str) -> Self {
        Self {
            target,
            priority,
            output,
        }
    }
}

impl Converter for Fixed {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn can_convert(&self, target: FieldType) -> bool {
        target == FieldType::Custom(self.target)
    }

    fn convert(&self, _request: &ConversionRequest<'_>) -> Option<FieldValue> {
        Some(FieldValue::from(self.output))
    }
}

text_newtype!(AccountNumber);

#[derive(Clone, Debug, Maskable)]
struct Transfer {
    #[mask(conditions(fieldmask::AlwaysMask))]
    account: AccountNumber,
}

fn transfer() -> Transfer {
    Transfer {
        account: AccountNumber("PT50000201231234567890154".into()),
    }
}

#[test]
fn test_builtin_fallback_applies_without_registrations() {
    let _zone = ThreadZone::enter();
    let masked = mask(&transfer()).unwrap();
    assert_eq!(masked.account, AccountNumber("****".into()));
}

#[test]
fn test_higher_priority_wins_regardless_of_registration_order() {
    let _zone = ThreadZone::enter();
    ConverterRegistry::register_thread(Fixed::new("AccountNumber", 0, "low"));
    ConverterRegistry::register_thread(Fixed::new("AccountNumber", 20, "high"));

    let masked = mask(&transfer()).unwrap();
    assert_eq!(masked.account.0, "high");

    let priorities: Vec<i32> = ConverterRegistry::registrations(&Scope::Thread)
        .iter()
        .map(|registration| registration.priority())
        .collect();
    assert_eq!(priorities, vec![20, 0]);
}

#[test]
fn test_equal_priorities_keep_registration_order() {
    let _zone = ThreadZone::enter();
    ConverterRegistry::register_thread(Fixed::new("AccountNumber", 5, "first"));
    ConverterRegistry::register_thread(Fixed::new("AccountNumber", 5, "second"));

    assert_eq!(mask(&transfer()).unwrap().account.0, "first");
}

#[test]
fn test_converters_returning_none_pass_the_request_on() {
    struct Declines;

    impl Converter for Declines {
        fn priority(&self) -> i32 {
            100
        }

        fn can_convert(&self, _target: FieldType) -> bool {
            true
        }

        fn convert(&self, _request: &ConversionRequest<'_>) -> Option<FieldValue> {
            None
        }
    }

    let _zone = ThreadZone::enter();
    ConverterRegistry::register_thread(Declines);
    assert_eq!(mask(&transfer()).unwrap().account.0, "****");
}

#[test]
fn test_wrong_kind_output_is_skipped() {
    struct WrongKind;

    impl Converter for WrongKind {
        fn priority(&self) -> i32 {
            100
        }

        fn can_convert(&self, target: FieldType) -> bool {
            target == FieldType::Custom("AccountNumber")
        }

        fn convert(&self, _request: &ConversionRequest<'_>) -> Option<FieldValue> {
            Some(FieldValue::Bool(true))
        }
    }

    let _zone = ThreadZone::enter();
    ConverterRegistry::register_thread(WrongKind);
    assert_eq!(mask(&transfer()).unwrap().account.0, "****");
}

#[test]
fn test_converter_sees_the_resolved_request() {
    struct Echo;

    impl Converter for Echo {
        fn priority(&self) -> i32 {
            1
        }

        fn can_convert(&self, target: FieldType) -> bool {
            target == FieldType::Custom("AccountNumber")
        }

        fn convert(&self, request: &ConversionRequest<'_>) -> Option<FieldValue> {
            let original = request.original().as_text()?;
            let tail = &original[original.len().saturating_sub(4)..];
            Some(FieldValue::Text(format!(
                "{}:{}:{}",
                request.container().type_name(),
                request.field_name(),
                tail
            )))
        }
    }

    let _zone = ThreadZone::enter();
    ConverterRegistry::register_thread(Echo);
    assert_eq!(mask(&transfer()).unwrap().account.0, "Transfer:account:0154");
}

#[test]
fn test_thread_scope_overrides_global_until_cleared() {
    text_newtype!(LedgerNumber);

    #[derive(Clone, Debug, Maskable)]
    struct Ledger {
        #[mask(conditions(fieldmask::AlwaysMask))]
        number: LedgerNumber,
    }

    let _zone = ThreadZone::enter();
    let ledger = Ledger {
        number: LedgerNumber("L-1".into()),
    };

    ConverterRegistry::register_global(Fixed::new("LedgerNumber", 0, "global"));
    assert_eq!(mask(&ledger).unwrap().number.0, "global");

    ConverterRegistry::register_thread(Fixed::new("LedgerNumber", 0, "thread"));
    assert_eq!(mask(&ledger).unwrap().number.0, "thread");

    let other_thread = std::thread::spawn(move || mask(&ledger).unwrap().number.0)
        .join()
        .unwrap();
    assert_eq!(other_thread, "global");

    ConverterRegistry::clear_thread();
    let ledger = Ledger {
        number: LedgerNumber("L-1".into()),
    };
    assert_eq!(mask(&ledger).unwrap().number.0, "global");

    ConverterRegistry::clear_global();
    assert_eq!(mask(&ledger).unwrap().number.0, "****");
}

#[test]
fn test_request_scope_sits_between_thread_and_global() {
    let _zone = ThreadZone::enter();
    {
        let scope = RequestScope::begin("req-layering");
        ConverterRegistry::register_request(scope.id().clone(), Fixed::new("AccountNumber", 0, "request"));
        assert_eq!(mask(&transfer()).unwrap().account.0, "request");

        ConverterRegistry::register_thread(Fixed::new("AccountNumber", 0, "thread"));
        assert_eq!(mask(&transfer()).unwrap().account.0, "thread");
        ConverterRegistry::clear_thread();
    }

    let request = Scope::Request("req-layering".into());
    assert!(ConverterRegistry::registrations(&request).is_empty());
    assert_eq!(mask(&transfer()).unwrap().account.0, "****");
}

#[test]
fn test_masker_can_target_a_request_without_binding_it() {
    let _zone = ThreadZone::enter();
    ConverterRegistry::register_request("req-explicit", Fixed::new("AccountNumber", 0, "explicit"));

    let masked = Masker::new().request("req-explicit").mask(&transfer()).unwrap();
    assert_eq!(masked.account.0, "explicit");
    assert_eq!(mask(&transfer()).unwrap().account.0, "****");

    ConverterRegistry::clear_request(&"req-explicit".into());
    let masked = Masker::new().request("req-explicit").mask(&transfer()).unwrap();
    assert_eq!(masked.account.0, "****");
}

#[test]
fn test_duplicate_registrations_coexist() {
    let _zone = ThreadZone::enter();
    ConverterRegistry::register_thread(Fixed::new("AccountNumber", 0, "a"));
    ConverterRegistry::register_thread(Fixed::new("AccountNumber", 0, "a"));

    let registrations = ConverterRegistry::registrations(&Scope::Thread);
    assert_eq!(registrations.len(), 2);
    assert!(registrations
        .iter()
        .all(|registration| registration.scope() == &Scope::Thread));
}

struct BlockedPhones {
    blocked: Vec<String>,
}

impl MaskCondition for BlockedPhones {
    fn should_mask(&self, value: &FieldValue, _container: &dyn Aggregate) -> bool {
        value
            .as_text()
            .is_some_and(|phone| self.blocked.iter().any(|blocked| blocked == phone))
    }
}

#[derive(Clone, Debug, Maskable)]
struct Subscriber {
    #[mask(conditions(BlockedPhones), template = "hidden")]
    phone: String,
}

#[test]
fn test_provider_supplies_conditions_without_constructor() {
    let _zone = ThreadZone::enter();
    ProviderRegistry::register_thread(ConditionInstances::new().register(|| BlockedPhones {
        blocked: vec!["0100".into()],
    }));

    let blocked = mask(&Subscriber {
        phone: "0100".into(),
    })
    .unwrap();
    assert_eq!(blocked.phone, "hidden");

    let allowed = mask(&Subscriber {
        phone: "0200".into(),
    })
    .unwrap();
    assert_eq!(allowed.phone, "0200");
}

#[test]
fn test_provider_instance_wins_over_default() {
    struct MinLength {
        min: usize,
    }

    impl Default for MinLength {
        fn default() -> Self {
            Self { min: 100 }
        }
    }

    impl MaskCondition for MinLength {
        fn should_mask(&self, value: &FieldValue, _container: &dyn Aggregate) -> bool {
            value.as_text().is_some_and(|text| text.len() >= self.min)
        }
    }

    #[derive(Clone, Debug, Maskable)]
    struct Token {
        #[mask(conditions(MinLength))]
        value: String,
    }

    let _zone = ThreadZone::enter();
    let token = Token {
        value: "secret".into(),
    };
    assert_eq!(mask(&token).unwrap().value, "secret");

    ProviderRegistry::register_thread(ConditionInstances::new().register(|| MinLength { min: 3 }));
    assert_eq!(mask(&token).unwrap().value, "****");
}

#[test]
fn test_failing_provider_falls_back_to_default() {
    #[derive(Debug)]
    struct ContainerDown;

    impl fmt::Display for ContainerDown {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("container unavailable")
        }
    }

    impl std::error::Error for ContainerDown {}

    struct Failing;

    impl InstanceProvider for Failing {
        fn get_instance(
            &self,
            _key: ConditionKey,
        ) -> Result<Option<Box<dyn MaskCondition>>, ProviderError> {
            Err(Box::new(ContainerDown))
        }
    }

    #[derive(Clone, Debug, Maskable)]
    struct Secret {
        #[mask(conditions(fieldmask::AlwaysMask))]
        value: String,
    }

    let _zone = ThreadZone::enter();
    ProviderRegistry::register_thread(Failing);
    let masked = mask(&Secret {
        value: "v".into(),
    })
    .unwrap();
    assert_eq!(masked.value, "****");
}

#[test]
fn test_failing_provider_without_default_is_unresolved() {
    struct Failing;

    impl InstanceProvider for Failing {
        fn get_instance(
            &self,
            _key: ConditionKey,
        ) -> Result<Option<Box<dyn MaskCondition>>, ProviderError> {
            Err("lookup failed".into())
        }
    }

    let _zone = ThreadZone::enter();
    ProviderRegistry::register_thread(Failing);
    let result = mask(&Subscriber {
        phone: "0100".into(),
    });
    assert!(matches!(
        result,
        Err(fieldmask::MaskError::UnresolvedCondition { .. })
    ));
}
