use fieldmask::{describe, mask, AggregateShape, AlwaysMask, Maskable};

#[derive(Clone, Debug, Default, PartialEq, Maskable)]
#[mask(record)]
struct Settings<T> {
    owner: String,
    #[mask(conditions(AlwaysMask))]
    token: String,
    extra: T,
}

#[derive(Clone, Debug, Default, PartialEq, Maskable)]
#[mask(record)]
struct Pair(String, #[mask(conditions(AlwaysMask), template = "{0}!")] String);

#[derive(Clone, Debug, PartialEq, Maskable)]
struct Marker;

fn main() {
    let settings = Settings {
        owner: "ops".to_string(),
        token: "t0k3n".to_string(),
        extra: vec![1_u8, 2, 3],
    };
    let masked = mask(&settings).unwrap();
    assert_eq!(masked.owner, "ops");
    assert_eq!(masked.token, "****");
    assert_eq!(masked.extra, vec![1, 2, 3]);
    assert_eq!(describe::<Settings<u8>>().shape(), AggregateShape::Record);

    let pair = mask(&Pair("left".to_string(), "right".to_string())).unwrap();
    assert_eq!(pair, Pair("left".to_string(), "left!".to_string()));

    assert_eq!(mask(&Marker).unwrap(), Marker);
    assert!(describe::<Marker>().fields().is_empty());
}
