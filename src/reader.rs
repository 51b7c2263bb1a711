//! Forward-only reader over one Native block.
//!
//! Every `read_*`/`next_*` call consumes one column header, validates its
//! declared type against the requested codec, measures the column's byte
//! span and hands back a cursor borrowing that span. Columns come back in
//! block order and are never revisited.

use crate::codec::decimal::{Decimal32Codec, Decimal64Codec, Decimal128Codec, Decimal256Codec};
use crate::codec::fixed::{BoolCodec, Date32Codec, DateCodec, DateTime64Codec, Ipv4Codec, Le};
use crate::codec::low_cardinality::{self, KeyWidth};
use crate::codec::nullable::{self, nullable_type};
use crate::codec::string::{FixedStringCodec, StringCodec};
use crate::codec::varint::{read_str, read_uvarint_usize};
use crate::codec::{ValueDecoder, column_span};
use crate::schema::ColumnType;
use crate::{Error, Result};
use log::{debug, trace};

/// Name and declared type of a column, as written in its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnHeader<'a> {
    pub name: &'a str,
    pub type_name: &'a str,
}

impl ColumnHeader<'_> {
    pub fn column_type(&self) -> Result<ColumnType> {
        ColumnType::parse(self.type_name)
            .map_err(|e| e.context(format_args!("column `{}`", self.name)))
    }
}

#[derive(Debug, Clone)]
pub struct BlockReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    columns: usize,
    rows: usize,
    columns_read: usize,
}

macro_rules! default_readers {
    ($a:lifetime; $($method:ident => $codec:ty),* $(,)?) => {
        $(
            pub fn $method(&mut self) -> Result<Column<$a, $codec>> {
                self.next_column(<$codec>::default())
            }
        )*
    };
}

impl<'a> BlockReader<'a> {
    /// Reads the block header. `bytes` must hold exactly one block; trailing
    /// bytes after the last column are left unread.
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        let mut pos = 0usize;
        let columns =
            read_uvarint_usize(bytes, &mut pos).map_err(|e| e.context("block column count"))?;
        let rows = read_uvarint_usize(bytes, &mut pos).map_err(|e| e.context("block row count"))?;
        debug!(
            "native block: {columns} columns x {rows} rows, {} bytes",
            bytes.len()
        );
        Ok(Self {
            bytes,
            pos,
            columns,
            rows,
            columns_read: 0,
        })
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns_read(&self) -> usize {
        self.columns_read
    }

    /// Byte offset of the next unread column header.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_finished(&self) -> bool {
        self.columns_read >= self.columns
    }

    fn read_header(&self) -> Result<(ColumnHeader<'a>, usize)> {
        if self.columns_read >= self.columns {
            return Err(Error::bounds(format!(
                "block declares {} columns, all already read",
                self.columns
            )));
        }
        let mut pos = self.pos;
        let at = format!("column {} header", self.columns_read);
        let name = read_str(self.bytes, &mut pos).map_err(|e| e.context(&at))?;
        let type_name = read_str(self.bytes, &mut pos).map_err(|e| e.context(&at))?;
        Ok((ColumnHeader { name, type_name }, pos))
    }

    /// Header of the next column, without advancing.
    pub fn peek_column(&self) -> Result<ColumnHeader<'a>> {
        self.read_header().map(|(header, _)| header)
    }

    /// Reads the next header and checks its type. Nothing is committed, so a
    /// failed check leaves the reader where it was.
    fn open_column(&self, expected: &ColumnType) -> Result<(&'a str, usize)> {
        let (header, start) = self.read_header()?;
        let expected_name = expected.to_string();
        if header.type_name != expected_name
            && ColumnType::parse(header.type_name).ok().as_ref() != Some(expected)
        {
            return Err(Error::TypeMismatch {
                column: header.name.to_string(),
                expected: expected_name,
                actual: header.type_name.to_string(),
            });
        }
        Ok((header.name, start))
    }

    fn commit(&mut self, name: &str, ty: &ColumnType, start: usize, span: usize) {
        trace!(
            "read column #{} `{name}` {ty}: {span} bytes at offset {start}",
            self.columns_read
        );
        self.pos = start + span;
        self.columns_read += 1;
    }

    /// Advances to the next column, decoding it with `decoder`.
    ///
    /// The declared type string matches when it is byte-identical to the
    /// decoder's canonical type, or when both parse to the same
    /// [`ColumnType`]: `Decimal64(4)` and `Decimal(18,4)` both match
    /// `Decimal(18, 4)`. Anything else is [`Error::TypeMismatch`] and the
    /// reader does not advance.
    pub fn next_column<D: ValueDecoder<'a>>(&mut self, decoder: D) -> Result<Column<'a, D>> {
        let ty = decoder.column_type();
        let (name, start) = self.open_column(&ty)?;
        let data = &self.bytes[start..];
        let span = decoder
            .span(data, self.rows)
            .map_err(|e| e.context(format_args!("column `{name}`")))?;
        self.commit(name, &ty, start, span);
        Ok(Column {
            name,
            decoder,
            data: &data[..span],
            pos: 0,
            rows: self.rows,
            index: 0,
        })
    }

    /// Advances to the next column, declared as `Nullable` of the decoder's
    /// type. Types match as in [`next_column`](Self::next_column).
    pub fn next_nullable<D: ValueDecoder<'a>>(
        &mut self,
        decoder: D,
    ) -> Result<NullableColumn<'a, D>> {
        let ty = nullable_type(decoder.column_type());
        let (name, start) = self.open_column(&ty)?;
        let (mask, values) = nullable::split(&decoder, &self.bytes[start..], self.rows)
            .map_err(|e| e.context(format_args!("column `{name}`")))?;
        self.commit(name, &ty, start, mask.len() + values.len());
        Ok(NullableColumn {
            name,
            decoder,
            mask,
            values,
            pos: 0,
            rows: self.rows,
            index: 0,
        })
    }

    pub fn read_low_cardinality_string(&mut self) -> Result<LowCardinalityColumn<'a>> {
        let ty = ColumnType::LowCardinality(Box::new(ColumnType::String));
        let (name, start) = self.open_column(&ty)?;
        let decoded = low_cardinality::decode(&self.bytes[start..], self.rows)
            .map_err(|e| e.context(format_args!("column `{name}`")))?;
        self.commit(name, &ty, start, decoded.consumed);
        Ok(LowCardinalityColumn {
            name,
            dictionary: decoded.dictionary,
            keys: decoded.keys,
            key_width: decoded.key_width,
            rows: self.rows,
            index: 0,
        })
    }

    /// Advances past the next column without decoding its values.
    pub fn skip_column(&mut self) -> Result<ColumnHeader<'a>> {
        let (header, start) = self.read_header()?;
        let ty = header.column_type()?;
        let span = column_span(&ty, &self.bytes[start..], self.rows)
            .map_err(|e| e.context(format_args!("column `{}`", header.name)))?;
        self.commit(header.name, &ty, start, span);
        Ok(header)
    }

    default_readers! {
        'a;
        read_uint8 => Le<u8>,
        read_uint16 => Le<u16>,
        read_uint32 => Le<u32>,
        read_uint64 => Le<u64>,
        read_uint128 => Le<u128>,
        read_int8 => Le<i8>,
        read_int16 => Le<i16>,
        read_int32 => Le<i32>,
        read_int64 => Le<i64>,
        read_int128 => Le<i128>,
        read_float32 => Le<f32>,
        read_float64 => Le<f64>,
        read_bool => BoolCodec,
        read_date => DateCodec,
        read_date32 => Date32Codec,
        read_ipv4 => Ipv4Codec,
        read_string => StringCodec,
    }

    pub fn read_fixed_string(&mut self, size: usize) -> Result<Column<'a, FixedStringCodec>> {
        self.next_column(FixedStringCodec::new(size)?)
    }

    pub fn read_datetime64(
        &mut self,
        scale: u8,
        timezone: Option<&str>,
    ) -> Result<Column<'a, DateTime64Codec>> {
        self.next_column(DateTime64Codec::new(scale, timezone)?)
    }

    pub fn read_decimal32(&mut self, precision: u8, scale: u8) -> Result<Column<'a, Decimal32Codec>> {
        self.next_column(Decimal32Codec::new(precision, scale)?)
    }

    pub fn read_decimal64(&mut self, precision: u8, scale: u8) -> Result<Column<'a, Decimal64Codec>> {
        self.next_column(Decimal64Codec::new(precision, scale)?)
    }

    pub fn read_decimal128(
        &mut self,
        precision: u8,
        scale: u8,
    ) -> Result<Column<'a, Decimal128Codec>> {
        self.next_column(Decimal128Codec::new(precision, scale)?)
    }

    pub fn read_decimal256(
        &mut self,
        precision: u8,
        scale: u8,
    ) -> Result<Column<'a, Decimal256Codec>> {
        self.next_column(Decimal256Codec::new(precision, scale)?)
    }

    pub fn read_nullable_string(&mut self) -> Result<NullableColumn<'a, StringCodec>> {
        self.next_nullable(StringCodec)
    }
}

/// Cursor over one column's values, in row order.
#[derive(Debug, Clone)]
pub struct Column<'a, D> {
    name: &'a str,
    decoder: D,
    data: &'a [u8],
    pos: usize,
    rows: usize,
    index: usize,
}

impl<'a, D: ValueDecoder<'a>> Column<'a, D> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn remaining(&self) -> usize {
        self.rows - self.index
    }

    /// Decodes the next row. After the last row, or after any error, this
    /// fails with a bounds error.
    pub fn next_value(&mut self) -> Result<D::Item> {
        let row = self.index;
        if row >= self.rows {
            return Err(Error::bounds(format!(
                "column `{}` has {} rows, all already read",
                self.name, self.rows
            )));
        }
        let value = self
            .decoder
            .decode(self.data, &mut self.pos)
            .and_then(|v| {
                if row + 1 == self.rows && self.pos != self.data.len() {
                    return Err(Error::framing(format!(
                        "decoded {} of {} column bytes",
                        self.pos,
                        self.data.len()
                    )));
                }
                Ok(v)
            });
        match value {
            Ok(v) => {
                self.index += 1;
                Ok(v)
            }
            Err(e) => {
                self.index = self.rows;
                Err(e.context(format_args!("column `{}` row {row}", self.name)))
            }
        }
    }
}

impl<'a, D: ValueDecoder<'a>> Iterator for Column<'a, D> {
    type Item = Result<D::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        (self.index < self.rows).then(|| self.next_value())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

/// Cursor over a `Nullable` column; null rows come back as `None`.
#[derive(Debug, Clone)]
pub struct NullableColumn<'a, D> {
    name: &'a str,
    decoder: D,
    mask: &'a [u8],
    values: &'a [u8],
    pos: usize,
    rows: usize,
    index: usize,
}

impl<'a, D: ValueDecoder<'a>> NullableColumn<'a, D> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn remaining(&self) -> usize {
        self.rows - self.index
    }

    pub fn next_value(&mut self) -> Result<Option<D::Item>> {
        let row = self.index;
        if row >= self.rows {
            return Err(Error::bounds(format!(
                "column `{}` has {} rows, all already read",
                self.name, self.rows
            )));
        }
        // The placeholder under a null is decoded too, to stay aligned.
        let value = nullable::is_null(self.mask, row).and_then(|null| {
            let v = self.decoder.decode(self.values, &mut self.pos)?;
            Ok((!null).then_some(v))
        });
        match value {
            Ok(v) => {
                self.index += 1;
                Ok(v)
            }
            Err(e) => {
                self.index = self.rows;
                Err(e.context(format_args!("column `{}` row {row}", self.name)))
            }
        }
    }
}

impl<'a, D: ValueDecoder<'a>> Iterator for NullableColumn<'a, D> {
    type Item = Result<Option<D::Item>>;

    fn next(&mut self) -> Option<Self::Item> {
        (self.index < self.rows).then(|| self.next_value())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

/// Cursor over a `LowCardinality(String)` column.
#[derive(Debug, Clone)]
pub struct LowCardinalityColumn<'a> {
    name: &'a str,
    dictionary: Vec<&'a str>,
    keys: &'a [u8],
    key_width: KeyWidth,
    rows: usize,
    index: usize,
}

impl<'a> LowCardinalityColumn<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Distinct values in dictionary order.
    pub fn dictionary(&self) -> &[&'a str] {
        &self.dictionary
    }

    pub fn key_width(&self) -> KeyWidth {
        self.key_width
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn remaining(&self) -> usize {
        self.rows - self.index
    }

    pub fn next_value(&mut self) -> Result<&'a str> {
        let row = self.index;
        if row >= self.rows {
            return Err(Error::bounds(format!(
                "column `{}` has {} rows, all already read",
                self.name, self.rows
            )));
        }
        let value = self
            .key_width
            .read(self.keys, row)
            .ok_or_else(|| Error::bounds("key array is shorter than the row count"))
            .and_then(|key| {
                usize::try_from(key)
                    .ok()
                    .and_then(|k| self.dictionary.get(k))
                    .copied()
                    .ok_or_else(|| {
                        Error::bounds(format!(
                            "key {key} outside dictionary of {}",
                            self.dictionary.len()
                        ))
                    })
            });
        match value {
            Ok(v) => {
                self.index += 1;
                Ok(v)
            }
            Err(e) => {
                self.index = self.rows;
                Err(e.context(format_args!("column `{}` row {row}", self.name)))
            }
        }
    }
}

impl<'a> Iterator for LowCardinalityColumn<'a> {
    type Item = Result<&'a str>;

    fn next(&mut self) -> Option<Self::Item> {
        (self.index < self.rows).then(|| self.next_value())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}
