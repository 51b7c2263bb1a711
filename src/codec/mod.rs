pub mod compression;
pub mod decimal;
pub mod fixed;
pub mod low_cardinality;
pub mod nullable;
pub mod string;
pub mod varint;

use crate::schema::ColumnType;
use crate::{Error, Result};

/// A codec bound to one ClickHouse column type.
pub trait ColumnCodec {
    fn column_type(&self) -> ColumnType;
}

/// Decodes consecutive per-row values out of a column's byte span.
pub trait ValueDecoder<'a>: ColumnCodec {
    type Item;

    /// Byte length of `rows` consecutive values at the start of `data`.
    fn span(&self, data: &'a [u8], rows: usize) -> Result<usize>;

    fn decode(&self, data: &'a [u8], pos: &mut usize) -> Result<Self::Item>;
}

/// Appends per-row values to a column payload.
pub trait ValueEncoder: ColumnCodec {
    type Input: ?Sized;

    /// Payload bytes worth reserving for `rows` values.
    fn reserve_hint(&self, rows: usize) -> usize;

    fn encode(&self, value: &Self::Input, out: &mut Vec<u8>) -> Result<()>;

    /// Placeholder written for null rows of a `Nullable` column.
    fn encode_default(&self, out: &mut Vec<u8>);
}

#[inline]
pub(crate) fn checked_byte_len(count: usize, elem_size: usize) -> Result<usize> {
    count
        .checked_mul(elem_size)
        .ok_or_else(|| Error::bounds(format!("{count} rows of {elem_size} bytes overflow")))
}

/// Length of `rows` fixed-width slots, checked against what `data` holds.
pub(crate) fn fixed_span(data: &[u8], rows: usize, width: usize) -> Result<usize> {
    let len = checked_byte_len(rows, width)?;
    if len > data.len() {
        return Err(Error::bounds(format!(
            "{rows} rows of {width} bytes need {len} bytes, {} remain",
            data.len()
        )));
    }
    Ok(len)
}

/// Measures the payload of a column of type `ty` without decoding values.
pub(crate) fn column_span(ty: &ColumnType, data: &[u8], rows: usize) -> Result<usize> {
    match ty {
        ColumnType::String => string::StringCodec.span(data, rows),
        ColumnType::Nullable(inner) => {
            let mask = fixed_span(data, rows, 1)?;
            let values = column_span(inner, &data[mask..], rows)?;
            mask.checked_add(values)
                .ok_or_else(|| Error::bounds("nullable column span overflow"))
        }
        ColumnType::LowCardinality(inner) if **inner == ColumnType::String => {
            low_cardinality::decode(data, rows).map(|lc| lc.consumed)
        }
        ColumnType::LowCardinality(inner) => Err(Error::unsupported(format!(
            "LowCardinality({inner})"
        ))),
        other => match other.fixed_width() {
            Some(width) => fixed_span(data, rows, width),
            None => Err(Error::unsupported(format!("column type {other}"))),
        },
    }
}
