use crate::decimal::{Decimal128, Decimal256};
use crate::{BlockReader, BlockWriter, Error, Result};
use arrow_buffer::i256;
use rust_decimal::Decimal;

const LONG_LITERAL: &str = "-12345678901234567890.1234567890";

#[test]
fn decimal128_literal_round_trips_losslessly() {
    let value: Decimal128 = LONG_LITERAL.parse().unwrap();
    assert_eq!(value.scale(), 10);
    assert_eq!(value.to_string(), LONG_LITERAL);

    let mut w = BlockWriter::new(1, 1);
    let mut col = w.create_decimal128("d", 38, 10).unwrap();
    col.write(&value).unwrap();
    col.finish().unwrap();
    let bytes = w.finish().unwrap();

    let mut r = BlockReader::new(&bytes).unwrap();
    let back = r.read_decimal128(38, 10).unwrap().next_value().unwrap();
    assert_eq!(back, value);
    assert_eq!(back.to_string(), LONG_LITERAL);
}

#[test]
fn rescale_up_is_lossless_and_down_must_be_exact() {
    let value: Decimal128 = LONG_LITERAL.parse().unwrap();

    let wider = value.rescale(12).unwrap();
    assert_eq!(wider.to_string(), "-12345678901234567890.123456789000");
    assert_eq!(wider.rescale(10).unwrap(), value);

    // The trailing zero can go, the 9 before it cannot.
    assert_eq!(
        value.rescale(9).unwrap().to_string(),
        "-12345678901234567890.123456789"
    );
    assert!(matches!(value.rescale(8), Err(Error::NumericRange(_))));
}

#[test]
fn writing_rescales_to_the_column_scale() {
    let mut w = BlockWriter::new(1, 2);
    let mut col = w.create_decimal128("d", 20, 4).unwrap();
    col.write(&"1.5".parse().unwrap()).unwrap();
    let err = col.write(&"0.00001".parse().unwrap()).unwrap_err();
    assert!(matches!(err, Error::NumericRange(_)), "{err:?}");
    col.write(&"-7".parse().unwrap()).unwrap();
    col.finish().unwrap();
    let bytes = w.finish().unwrap();

    let mut r = BlockReader::new(&bytes).unwrap();
    let back = r
        .read_decimal128(20, 4)
        .unwrap()
        .map(|v| v.map(|d| d.to_string()))
        .collect::<Result<Vec<_>>>()
        .unwrap();
    assert_eq!(back, vec!["1.5000", "-7.0000"]);
}

#[test]
fn decimal256_is_little_endian_twos_complement() {
    let mut w = BlockWriter::new(1, 2);
    let mut col = w.create_decimal256("d", 76, 0).unwrap();
    col.write(&Decimal256::new(i256::from_i128(-1), 0)).unwrap();
    col.write(&Decimal256::new(i256::from_i128(258), 0)).unwrap();
    col.finish().unwrap();
    let bytes = w.finish().unwrap();

    let payload = &bytes[bytes.len() - 64..];
    assert_eq!(&payload[..32], &[0xFFu8; 32]);
    let mut expected = [0u8; 32];
    expected[0] = 2;
    expected[1] = 1;
    assert_eq!(&payload[32..], &expected);
}

#[test]
fn decimal256_beyond_128_bits_round_trips() {
    let literal = "123456789012345678901234567890123456789012345678901234567890.5";
    let value: Decimal256 = literal.parse().unwrap();
    assert_eq!(value.digits(), 61);

    let mut w = BlockWriter::new(1, 1);
    let mut col = w.create_decimal256("d", 70, 3).unwrap();
    col.write(&value).unwrap();
    col.finish().unwrap();
    let bytes = w.finish().unwrap();

    let mut r = BlockReader::new(&bytes).unwrap();
    let back = r.read_decimal256(70, 3).unwrap().next_value().unwrap();
    assert_eq!(back.to_string(), format!("{literal}00"));
    assert_eq!(back.rescale(1).unwrap(), value);
    assert!(back.cast::<i128>().is_err());
}

#[test]
fn decimal256_overflow_is_rejected() {
    let too_wide = "9".repeat(78);
    assert!(matches!(
        too_wide.parse::<Decimal256>(),
        Err(Error::NumericRange(_))
    ));

    let value: Decimal256 = "9".repeat(76).parse().unwrap();
    let mut w = BlockWriter::new(1, 1);
    let mut col = w.create_decimal256("d", 76, 1).unwrap();
    assert!(matches!(col.write(&value), Err(Error::NumericRange(_))));
}

#[test]
fn decimal32_and_64_use_rust_decimal() {
    let mut w = BlockWriter::new(2, 1);
    let mut col = w.create_decimal32("a", 9, 2).unwrap();
    col.write(&Decimal::new(1234, 2)).unwrap();
    col.finish().unwrap();
    let mut col = w.create_decimal64("b", 18, 4).unwrap();
    col.write(&Decimal::new(-5, 1)).unwrap();
    col.finish().unwrap();
    let bytes = w.finish().unwrap();

    let mut r = BlockReader::new(&bytes).unwrap();
    assert_eq!(
        r.read_decimal32(9, 2).unwrap().next_value().unwrap(),
        Decimal::new(1234, 2)
    );
    let mut b = r.read_decimal64(18, 4).unwrap();
    assert_eq!(b.next_value().unwrap(), Decimal::new(-5000, 4));
    assert_eq!(&bytes[bytes.len() - 8..], &(-5000i64).to_le_bytes());
}

#[test]
fn decimal32_rejects_rounding_and_precision_overflow() {
    let mut w = BlockWriter::new(1, 1);
    let mut col = w.create_decimal32("a", 9, 2).unwrap();
    assert!(matches!(
        col.write(&Decimal::new(1234, 3)),
        Err(Error::NumericRange(_))
    ));
    assert!(matches!(
        col.write(&Decimal::new(10_000_000, 0)),
        Err(Error::NumericRange(_))
    ));
    col.write(&Decimal::new(9_999_999, 0)).unwrap();
    col.finish().unwrap();
}

#[test]
fn storage_width_must_match_precision() {
    let mut w = BlockWriter::new(1, 1);
    assert!(matches!(
        w.create_decimal32("a", 18, 4),
        Err(Error::NumericRange(_))
    ));
    assert!(matches!(
        w.create_decimal128("a", 9, 2),
        Err(Error::NumericRange(_))
    ));
    assert!(matches!(
        w.create_decimal64("a", 10, 11),
        Err(Error::NumericRange(_))
    ));
}

#[test]
fn shorthand_and_spaced_type_strings_match() {
    for type_name in ["Decimal(18,4)", "Decimal64(4)", "Decimal(18, 4)"] {
        let mut bytes = vec![1u8, 1, 1, b'd', type_name.len() as u8];
        bytes.extend_from_slice(type_name.as_bytes());
        bytes.extend_from_slice(&12_345i64.to_le_bytes());

        let mut r = BlockReader::new(&bytes).unwrap();
        let v = r.read_decimal64(18, 4).unwrap().next_value().unwrap();
        assert_eq!(v, Decimal::new(12_345, 4), "{type_name}");
    }

    let mut bytes = vec![1u8, 1, 1, b'd', 13];
    bytes.extend_from_slice(b"Decimal(18,3)");
    bytes.extend_from_slice(&12_345i64.to_le_bytes());
    let mut r = BlockReader::new(&bytes).unwrap();
    assert_eq!(
        r.read_decimal64(18, 4).unwrap_err(),
        Error::TypeMismatch {
            column: "d".to_string(),
            expected: "Decimal(18, 4)".to_string(),
            actual: "Decimal(18,3)".to_string(),
        }
    );
    assert_eq!(r.columns_read(), 0);
    assert_eq!(r.read_decimal64(18, 3).unwrap().next_value().unwrap(), Decimal::new(12_345, 3));
}

#[test]
fn literals_and_conversions() {
    assert!(matches!("1.2.3".parse::<Decimal128>(), Err(Error::NumericRange(_))));
    assert!(matches!("".parse::<Decimal128>(), Err(Error::NumericRange(_))));
    assert!(matches!("12a".parse::<Decimal128>(), Err(Error::NumericRange(_))));

    let d: Decimal128 = "+0.050".parse().unwrap();
    assert_eq!((d.unscaled(), d.scale()), (50, 3));
    assert_eq!(d.to_string(), "0.050");
    let neg: Decimal128 = "-0.5".parse().unwrap();
    assert_eq!(neg.to_string(), "-0.5");

    let from_rust = Decimal128::try_from(Decimal::new(-5, 1)).unwrap();
    assert_eq!(from_rust, neg);
    assert_eq!(Decimal::try_from(neg).unwrap(), Decimal::new(-5, 1));

    let wide = neg.cast::<i256>().unwrap();
    assert_eq!(wide.to_string(), "-0.5");
    assert_eq!(wide.cast::<i128>().unwrap(), neg);
}
