use crate::codec::fixed::{
    BoolCodec, Date32Codec, DateCodec, FixedCodec, Ipv4Codec, Le,
};
use crate::{BlockReader, BlockWriter, Error, Result};
use chrono::NaiveDate;
use rstest::rstest;
use std::net::Ipv4Addr;

fn round_trip<C>(codec: C, values: &[C::Value]) -> Vec<C::Value>
where
    C: FixedCodec + Clone,
{
    let mut w = BlockWriter::new(1, values.len());
    let mut col = w.create_column("v", codec.clone()).unwrap();
    for v in values {
        col.write(v).unwrap();
    }
    col.finish().unwrap();
    let bytes = w.finish().unwrap();

    let mut r = BlockReader::new(&bytes).unwrap();
    let col = r.next_column(codec).unwrap();
    col.collect::<Result<Vec<_>>>().unwrap()
}

/// Block header plus one column header.
fn block_prefix(rows: u8, name: &str, type_name: &str) -> Vec<u8> {
    let mut out = vec![1u8, rows, name.len() as u8];
    out.extend_from_slice(name.as_bytes());
    out.push(type_name.len() as u8);
    out.extend_from_slice(type_name.as_bytes());
    out
}

#[test]
fn integers_round_trip() {
    assert_eq!(round_trip(Le::<u8>::new(), &[0, 1, u8::MAX]), vec![0, 1, u8::MAX]);
    assert_eq!(round_trip(Le::<u16>::new(), &[0, u16::MAX]), vec![0, u16::MAX]);
    assert_eq!(round_trip(Le::<u32>::new(), &[7, u32::MAX]), vec![7, u32::MAX]);
    assert_eq!(round_trip(Le::<u64>::new(), &[u64::MAX]), vec![u64::MAX]);
    assert_eq!(round_trip(Le::<u128>::new(), &[u128::MAX, 1]), vec![u128::MAX, 1]);
    assert_eq!(round_trip(Le::<i8>::new(), &[i8::MIN, -1, i8::MAX]), vec![i8::MIN, -1, i8::MAX]);
    assert_eq!(round_trip(Le::<i16>::new(), &[i16::MIN, i16::MAX]), vec![i16::MIN, i16::MAX]);
    assert_eq!(round_trip(Le::<i32>::new(), &[i32::MIN, 0, i32::MAX]), vec![i32::MIN, 0, i32::MAX]);
    assert_eq!(round_trip(Le::<i64>::new(), &[i64::MIN, i64::MAX]), vec![i64::MIN, i64::MAX]);
    assert_eq!(round_trip(Le::<i128>::new(), &[i128::MIN, -5, i128::MAX]), vec![i128::MIN, -5, i128::MAX]);
}

#[test]
fn floats_round_trip_bit_exact() {
    let values = [0.0f64, -0.0, 1.5, f64::MIN_POSITIVE, f64::INFINITY];
    let back = round_trip(Le::<f64>::new(), &values);
    assert_eq!(
        back.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
        values.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
    );
    assert_eq!(round_trip(Le::<f32>::new(), &[3.25f32, -1.0]), vec![3.25f32, -1.0]);
}

#[test]
fn bool_round_trips_and_reads_nonzero_as_true() {
    assert_eq!(round_trip(BoolCodec, &[true, false, true]), vec![true, false, true]);

    let mut bytes = block_prefix(2, "b", "Bool");
    bytes.extend_from_slice(&[0, 2]);
    let mut r = BlockReader::new(&bytes).unwrap();
    let col = r.read_bool().unwrap();
    assert_eq!(col.collect::<Result<Vec<_>>>().unwrap(), vec![false, true]);
}

#[rstest]
#[case(Ipv4Addr::new(192, 168, 0, 1), [1, 0, 168, 192])]
#[case(Ipv4Addr::new(10, 0, 0, 255), [255, 0, 0, 10])]
#[case(Ipv4Addr::new(0, 0, 0, 0), [0, 0, 0, 0])]
fn ipv4_is_stored_in_reversed_octet_order(#[case] ip: Ipv4Addr, #[case] wire: [u8; 4]) {
    let mut w = BlockWriter::new(1, 1);
    let mut col = w.create_ipv4("ip").unwrap();
    col.write(&ip).unwrap();
    col.finish().unwrap();
    let bytes = w.finish().unwrap();

    let mut expected = block_prefix(1, "ip", "IPv4");
    expected.extend_from_slice(&wire);
    assert_eq!(bytes, expected);

    let mut r = BlockReader::new(&bytes).unwrap();
    let mut col = r.read_ipv4().unwrap();
    assert_eq!(col.next_value().unwrap(), ip);
}

#[test]
fn date_round_trips_and_rejects_out_of_range() {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let last = NaiveDate::from_ymd_opt(2149, 6, 6).unwrap();
    assert_eq!(round_trip(DateCodec, &[epoch, last]), vec![epoch, last]);

    let mut w = BlockWriter::new(1, 1);
    let mut col = w.create_date("d").unwrap();
    let err = col
        .write(&NaiveDate::from_ymd_opt(1969, 12, 31).unwrap())
        .unwrap_err();
    assert_eq!(
        err,
        Error::NumericRange("column `d` row 0: 1969-12-31 is outside the Date range".to_string())
    );
    let err = col
        .write(&NaiveDate::from_ymd_opt(2149, 6, 7).unwrap())
        .unwrap_err();
    assert!(matches!(err, Error::NumericRange(_)));
    assert_eq!(col.written(), 0);
}

#[test]
fn date32_supports_pre_epoch_days() {
    let d = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap();
    assert_eq!(round_trip(Date32Codec, &[d]), vec![d]);

    let mut bytes = block_prefix(1, "d", "Date32");
    bytes.extend_from_slice(&(-25_567i32).to_le_bytes());
    let mut r = BlockReader::new(&bytes).unwrap();
    assert_eq!(r.read_date32().unwrap().next_value().unwrap(), d);
}

#[test]
fn fixed_width_column_is_sliced_once_and_checked() {
    let mut bytes = block_prefix(3, "a", "UInt32");
    bytes.extend_from_slice(&[0u8; 8]);
    let mut r = BlockReader::new(&bytes).unwrap();
    let err = r.read_uint32().unwrap_err();
    assert_eq!(
        err,
        Error::Bounds("column `a`: 3 rows of 4 bytes need 12 bytes, 8 remain".to_string())
    );
}

#[test]
fn cursor_reports_remaining_and_stops_at_row_count() {
    let mut bytes = block_prefix(2, "a", "UInt16");
    bytes.extend_from_slice(&[1, 0, 2, 0]);
    let mut r = BlockReader::new(&bytes).unwrap();
    let mut col = r.read_uint16().unwrap();
    assert_eq!(col.len(), 2);
    assert_eq!(col.remaining(), 2);
    assert_eq!(col.next_value().unwrap(), 1);
    assert_eq!(col.remaining(), 1);
    assert_eq!(col.next_value().unwrap(), 2);
    assert_eq!(col.remaining(), 0);
    assert!(matches!(col.next_value(), Err(Error::Bounds(_))));
    assert!(col.next().is_none());
}
