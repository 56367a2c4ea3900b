use std::marker::PhantomData;

use fieldmask::{mask, AlwaysMask, Maskable};

#[derive(Clone, Debug, PartialEq, Maskable)]
struct Inner {
    #[mask(conditions(AlwaysMask))]
    secret: String,
}

#[derive(Clone, Debug, Maskable)]
struct Envelope<P, N, V> {
    payload: P,
    #[mask(nested)]
    items: Vec<N>,
    #[mask(conditions(AlwaysMask), template = "")]
    value: V,
    marker: PhantomData<P>,
}

#[derive(Clone, Debug, Maskable)]
struct Borrowed<'a> {
    label: &'a str,
    #[mask(conditions(AlwaysMask), template = "{label}-hidden")]
    code: String,
}

fn main() {
    let envelope = Envelope {
        payload: 7_u32,
        items: vec![Inner {
            secret: "s".into(),
        }],
        value: 1499_i64,
        marker: PhantomData,
    };
    let masked = mask(&envelope).unwrap();
    assert_eq!(masked.payload, 7);
    assert_eq!(masked.items[0].secret, "****");
    assert_eq!(masked.value, 1000);

    let label = String::from("door");
    let borrowed = Borrowed {
        label: &label,
        code: "1234".into(),
    };
    let masked = mask(&borrowed).unwrap();
    assert_eq!(masked.label, "door");
    assert_eq!(masked.code, "door-hidden");
}
