use rstest::rstest;
use ucl::{parse, ErrorKind, ValueKind};

fn single(input: &str) -> ucl::Value {
    let doc = parse(input).unwrap();
    doc.lookup_path("v").unwrap().clone()
}

#[rstest]
#[case("v = 0;", 0)]
#[case("v = 42;", 42)]
#[case("v = -17;", -17)]
#[case("v = 10k;", 10_000)]
#[case("v = 10K;", 10_000)]
#[case("v = 2m;", 2_000_000)]
#[case("v = 3g;", 3_000_000_000)]
#[case("v = 10kb;", 10_240)]
#[case("v = 10Kb;", 10_240)]
#[case("v = 2mb;", 2 * 1024 * 1024)]
#[case("v = 1Gb;", 1024 * 1024 * 1024)]
fn integers_with_multipliers(#[case] input: &str, #[case] expected: i64) {
    let v = single(input);
    assert!(matches!(v.kind(), ValueKind::Int(_)), "{input}: {v:?}");
    assert_eq!(v.as_i64(), Some(expected), "{input}");
}

#[rstest]
#[case("v = 10min;", 600.0)]
#[case("v = 10MIN;", 600.0)]
#[case("v = 0.2s;", 0.2)]
#[case("v = 10ms;", 0.01)]
#[case("v = 1h;", 3600.0)]
#[case("v = 2d;", 172_800.0)]
#[case("v = 1w;", 604_800.0)]
#[case("v = 1y;", 31_536_000.0)]
#[case("v = 30S;", 30.0)]
fn time_suffixes(#[case] input: &str, #[case] seconds: f64) {
    let v = single(input);
    assert!(matches!(v.kind(), ValueKind::Time(_)), "{input}: {v:?}");
    let got = v.as_f64().unwrap();
    assert!((got - seconds).abs() < 1e-9, "{input}: {got} != {seconds}");
}

#[rstest]
#[case("v = 1.5;", 1.5)]
#[case("v = -0.25;", -0.25)]
#[case("v = 1e3;", 1000.0)]
#[case("v = 2.5E-2;", 0.025)]
#[case("v = 1.5k;", 1500.0)]
fn floats(#[case] input: &str, #[case] expected: f64) {
    let v = single(input);
    assert!(matches!(v.kind(), ValueKind::Float(_)), "{input}: {v:?}");
    assert!((v.as_f64().unwrap() - expected).abs() < 1e-9);
}

#[rstest]
#[case("v = 10units;", "10units")]
#[case("v = 1.2.3;", "1.2.3")]
#[case("v = 1x;", "1x")]
#[case("v = -;", "-")]
#[case("v = 1e;", "1e")]
fn unrecognized_suffixes_fall_back_to_strings(#[case] input: &str, #[case] expected: &str) {
    let v = single(input);
    assert_eq!(v.as_str(), Some(expected), "{input}");
}

#[rstest]
fn out_of_range_integer_is_fatal() {
    let err = parse("v = 123456789012345678901234567890;").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);
    assert!(err.message.contains("out of range"));
}

#[rstest]
fn numbers_inside_arrays() {
    let doc = parse("[1, 2.5, 10kb, 3min]").unwrap();
    let items = doc.as_array().unwrap();
    assert_eq!(items[0].as_i64(), Some(1));
    assert!(matches!(items[1].kind(), ValueKind::Float(_)));
    assert_eq!(items[2].as_i64(), Some(10_240));
    assert!(matches!(items[3].kind(), ValueKind::Time(_)));
    assert_eq!(items[3].as_f64(), Some(180.0));
}
