use crate::{BlockReader, BlockWriter, Error, Result};

fn full_block() -> Vec<u8> {
    let mut w = BlockWriter::new(5, 3);
    let mut c = w.create_uint32("u").unwrap();
    for v in [1u32, 2, 3] {
        c.write(&v).unwrap();
    }
    c.finish().unwrap();
    let mut c = w.create_string("s").unwrap();
    for v in ["a", "", "ccc"] {
        c.write(v).unwrap();
    }
    c.finish().unwrap();
    let mut c = w.create_nullable_string("n").unwrap();
    for v in [Some("x"), None, Some("zz")] {
        c.write(v).unwrap();
    }
    c.finish().unwrap();
    let mut c = w.create_low_cardinality_string("l").unwrap();
    for v in ["p", "q", "p"] {
        c.write(v).unwrap();
    }
    c.finish().unwrap();
    let mut c = w.create_decimal128("d", 38, 4).unwrap();
    for v in ["1", "-2.5", "0.0001"] {
        c.write(&v.parse().unwrap()).unwrap();
    }
    c.finish().unwrap();
    w.finish().unwrap()
}

fn read_everything(bytes: &[u8]) -> Result<()> {
    let mut r = BlockReader::new(bytes)?;
    for v in r.read_uint32()? {
        v?;
    }
    for v in r.read_string()? {
        v?;
    }
    for v in r.read_nullable_string()? {
        v?;
    }
    for v in r.read_low_cardinality_string()? {
        v?;
    }
    for v in r.read_decimal128(38, 4)? {
        v?;
    }
    Ok(())
}

#[test]
fn every_truncation_is_an_error() {
    let bytes = full_block();
    read_everything(&bytes).unwrap();
    for cut in 0..bytes.len() {
        assert!(
            read_everything(&bytes[..cut]).is_err(),
            "prefix of {cut} bytes decoded"
        );
    }
}

#[test]
fn skipping_every_truncation_is_an_error() {
    let bytes = full_block();
    for cut in 0..bytes.len() {
        let res = BlockReader::new(&bytes[..cut]).and_then(|mut r| {
            while !r.is_finished() {
                r.skip_column()?;
            }
            Ok(())
        });
        assert!(res.is_err(), "prefix of {cut} bytes skipped");
    }
}

#[test]
fn huge_declared_row_count_does_not_allocate() {
    let mut bytes = vec![1u8];
    bytes.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F]);
    bytes.extend_from_slice(&[1, b'a', 6]);
    bytes.extend_from_slice(b"UInt64");
    let mut r = BlockReader::new(&bytes).unwrap();
    assert!(matches!(r.read_uint64(), Err(Error::Bounds(_))));
    assert!(matches!(r.read_string(), Err(Error::TypeMismatch { .. })));
}

#[test]
fn huge_dictionary_size_is_rejected() {
    let mut bytes = vec![1u8, 1, 1, b'l', 22];
    bytes.extend_from_slice(b"LowCardinality(String)");
    bytes.extend_from_slice(&1u64.to_le_bytes());
    bytes.extend_from_slice(&(1u64 << 9).to_le_bytes());
    bytes.extend_from_slice(&u64::MAX.to_le_bytes());
    let mut r = BlockReader::new(&bytes).unwrap();
    assert!(r.read_low_cardinality_string().is_err());
}

#[test]
fn invalid_utf8_in_string_column_is_reported_with_row() {
    let mut bytes = vec![1u8, 2, 1, b's', 6];
    bytes.extend_from_slice(b"String");
    bytes.extend_from_slice(&[1, b'a', 1, 0xFF]);
    let mut r = BlockReader::new(&bytes).unwrap();
    let mut col = r.read_string().unwrap();
    assert_eq!(col.next_value().unwrap(), "a");
    assert_eq!(
        col.next_value().unwrap_err(),
        Error::Framing("column `s` row 1: invalid UTF-8 string at byte offset 2".to_string())
    );
    assert!(col.next().is_none());
}

#[test]
fn unknown_low_cardinality_key_type_is_rejected() {
    let mut bytes = vec![1u8, 1, 1, b'l', 22];
    bytes.extend_from_slice(b"LowCardinality(String)");
    bytes.extend_from_slice(&1u64.to_le_bytes());
    bytes.extend_from_slice(&((1u64 << 9) | 7).to_le_bytes());
    let mut r = BlockReader::new(&bytes).unwrap();
    assert!(matches!(
        r.read_low_cardinality_string(),
        Err(Error::Framing(_))
    ));
}
