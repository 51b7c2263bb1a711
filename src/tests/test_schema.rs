use crate::Error;
use crate::schema::{ColumnType, DecimalWidth};
use rstest::rstest;

fn dt64(scale: u8, tz: Option<&str>) -> ColumnType {
    ColumnType::DateTime64 {
        scale,
        timezone: tz.map(str::to_string),
    }
}

#[rstest]
#[case("UInt32", ColumnType::UInt32)]
#[case("Int128", ColumnType::Int128)]
#[case(" IPv4 ", ColumnType::IPv4)]
#[case("FixedString(16)", ColumnType::FixedString(16))]
#[case("Decimal(18,4)", ColumnType::Decimal { precision: 18, scale: 4 })]
#[case("Decimal(18, 4)", ColumnType::Decimal { precision: 18, scale: 4 })]
#[case("Decimal32(2)", ColumnType::Decimal { precision: 9, scale: 2 })]
#[case("Decimal64(4)", ColumnType::Decimal { precision: 18, scale: 4 })]
#[case("Decimal128(10)", ColumnType::Decimal { precision: 38, scale: 10 })]
#[case("Decimal256(20)", ColumnType::Decimal { precision: 76, scale: 20 })]
#[case("DateTime64(6)", dt64(6, None))]
#[case("DateTime64(3,'UTC')", dt64(3, Some("UTC")))]
#[case("DateTime64(3, 'Europe/Berlin')", dt64(3, Some("Europe/Berlin")))]
#[case("Nullable(String)", ColumnType::Nullable(Box::new(ColumnType::String)))]
#[case("Nullable(Decimal(9,2))", ColumnType::Nullable(Box::new(ColumnType::Decimal { precision: 9, scale: 2 })))]
#[case("LowCardinality(String)", ColumnType::LowCardinality(Box::new(ColumnType::String)))]
fn parses_type_strings(#[case] s: &str, #[case] expected: ColumnType) {
    assert_eq!(ColumnType::parse(s).unwrap(), expected);
}

#[rstest]
#[case("Decimal(18,4)", "Decimal(18, 4)")]
#[case("Decimal64(4)", "Decimal(18, 4)")]
#[case("DateTime64(3,'UTC')", "DateTime64(3, 'UTC')")]
#[case("LowCardinality(String)", "LowCardinality(String)")]
#[case("Nullable(FixedString(4))", "Nullable(FixedString(4))")]
fn prints_canonical_type_strings(#[case] s: &str, #[case] canonical: &str) {
    let ty = ColumnType::parse(s).unwrap();
    assert_eq!(ty.to_string(), canonical);
    assert_eq!(ColumnType::parse(canonical).unwrap(), ty);
}

#[test]
fn malformed_type_strings_are_framing_errors() {
    for s in ["", "FixedString(0)", "FixedString(x)", "Decimal(18)", "Nullable(String", "DateTime64(3, UTC)"] {
        let err = ColumnType::parse(s).unwrap_err();
        assert!(matches!(err, Error::Framing(_)), "{s}: {err:?}");
    }
}

#[test]
fn unknown_and_nested_wrappers_are_unsupported() {
    for s in ["Map(String, UInt8)", "UUID", "Nullable(Nullable(String))", "Nullable(LowCardinality(String))"] {
        let err = ColumnType::parse(s).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)), "{s}: {err:?}");
    }
}

#[test]
fn decimal_precision_and_scale_are_range_checked() {
    for s in ["Decimal(0,0)", "Decimal(77,2)", "Decimal(9,10)", "Decimal32(10)", "DateTime64(10)"] {
        let err = ColumnType::parse(s).unwrap_err();
        assert!(matches!(err, Error::NumericRange(_)), "{s}: {err:?}");
    }
}

#[test]
fn decimal_constructor_matches_parsed_and_codec_types() {
    use crate::codec::ColumnCodec;
    use crate::codec::decimal::Decimal64Codec;

    let ty = ColumnType::decimal(18, 4).unwrap();
    assert_eq!(ty, ColumnType::parse("Decimal64(4)").unwrap());
    assert_eq!(ty.to_string(), "Decimal(18, 4)");
    assert_eq!(Decimal64Codec::new(18, 4).unwrap().column_type(), ty);
    assert_eq!(
        ColumnType::decimal(4, 5).unwrap_err(),
        Error::NumericRange("decimal scale 5 exceeds precision 4".to_string())
    );
    assert!(matches!(ColumnType::decimal(0, 0), Err(Error::NumericRange(_))));
}

#[rstest]
#[case(1, DecimalWidth::D32)]
#[case(9, DecimalWidth::D32)]
#[case(10, DecimalWidth::D64)]
#[case(18, DecimalWidth::D64)]
#[case(19, DecimalWidth::D128)]
#[case(38, DecimalWidth::D128)]
#[case(39, DecimalWidth::D256)]
#[case(76, DecimalWidth::D256)]
fn decimal_storage_follows_precision(#[case] precision: u8, #[case] width: DecimalWidth) {
    assert_eq!(DecimalWidth::for_precision(precision).unwrap(), width);
}

#[test]
fn fixed_widths() {
    assert_eq!(ColumnType::Date.fixed_width(), Some(2));
    assert_eq!(ColumnType::IPv4.fixed_width(), Some(4));
    assert_eq!(dt64(3, None).fixed_width(), Some(8));
    assert_eq!(ColumnType::FixedString(7).fixed_width(), Some(7));
    assert_eq!(
        ColumnType::Decimal {
            precision: 40,
            scale: 0
        }
        .fixed_width(),
        Some(32)
    );
    assert_eq!(ColumnType::String.fixed_width(), None);
}
