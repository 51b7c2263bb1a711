//! `Nullable(T)`: one mask byte per row (1 = null) followed by a value for
//! every row, null or not.

use crate::codec::{ValueDecoder, fixed_span};
use crate::schema::ColumnType;
use crate::{Error, Result};

pub const NULL: u8 = 1;
pub const NOT_NULL: u8 = 0;

pub fn nullable_type(inner: ColumnType) -> ColumnType {
    ColumnType::Nullable(Box::new(inner))
}

/// Splits a nullable column into its mask and the span holding the values.
pub fn split<'a, D: ValueDecoder<'a>>(
    decoder: &D,
    data: &'a [u8],
    rows: usize,
) -> Result<(&'a [u8], &'a [u8])> {
    let mask_len = fixed_span(data, rows, 1)?;
    let (mask, rest) = data.split_at(mask_len);
    let values_len = decoder.span(rest, rows)?;
    Ok((mask, &rest[..values_len]))
}

#[inline]
pub fn is_null(mask: &[u8], row: usize) -> Result<bool> {
    mask.get(row)
        .map(|&b| b != NOT_NULL)
        .ok_or_else(|| Error::bounds(format!("null mask has no row {row}")))
}
