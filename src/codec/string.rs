use crate::codec::varint::{read_len_prefixed, read_uvarint_usize, write_len_prefixed};
use crate::codec::{ColumnCodec, ValueDecoder, ValueEncoder, checked_byte_len, fixed_span};
use crate::schema::ColumnType;
use crate::{Error, Result};

/// `String`: per row, a varint byte length followed by UTF-8 bytes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StringCodec;

impl ColumnCodec for StringCodec {
    fn column_type(&self) -> ColumnType {
        ColumnType::String
    }
}

impl<'a> ValueDecoder<'a> for StringCodec {
    type Item = &'a str;

    fn span(&self, data: &'a [u8], rows: usize) -> Result<usize> {
        let mut pos = 0usize;
        for row in 0..rows {
            let len = read_uvarint_usize(data, &mut pos)
                .map_err(|e| e.context(format_args!("row {row}")))?;
            pos = pos
                .checked_add(len)
                .filter(|&end| end <= data.len())
                .ok_or_else(|| {
                    Error::framing(format!(
                        "row {row}: string of {len} bytes at byte offset {pos} exceeds buffer"
                    ))
                })?;
        }
        Ok(pos)
    }

    fn decode(&self, data: &'a [u8], pos: &mut usize) -> Result<&'a str> {
        let at = *pos;
        let bytes = read_len_prefixed(data, pos)?;
        core::str::from_utf8(bytes)
            .map_err(|_| Error::framing(format!("invalid UTF-8 string at byte offset {at}")))
    }
}

impl ValueEncoder for StringCodec {
    type Input = str;

    fn reserve_hint(&self, rows: usize) -> usize {
        rows
    }

    fn encode(&self, value: &str, out: &mut Vec<u8>) -> Result<()> {
        write_len_prefixed(out, value.as_bytes());
        Ok(())
    }

    fn encode_default(&self, out: &mut Vec<u8>) {
        out.push(0);
    }
}

/// `FixedString(N)`: N bytes per row, zero padded on write and trimmed of
/// trailing zeros on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedStringCodec {
    size: usize,
}

impl FixedStringCodec {
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::framing("FixedString size must be positive"));
        }
        Ok(Self { size })
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl ColumnCodec for FixedStringCodec {
    fn column_type(&self) -> ColumnType {
        ColumnType::FixedString(self.size)
    }
}

impl<'a> ValueDecoder<'a> for FixedStringCodec {
    type Item = &'a str;

    fn span(&self, data: &'a [u8], rows: usize) -> Result<usize> {
        fixed_span(data, rows, self.size)
    }

    fn decode(&self, data: &'a [u8], pos: &mut usize) -> Result<&'a str> {
        let at = *pos;
        let end = at
            .checked_add(self.size)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| Error::bounds(format!("slot at byte offset {at} exceeds column")))?;
        let slot = &data[at..end];
        let used = slot.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        let s = core::str::from_utf8(&slot[..used])
            .map_err(|_| Error::framing(format!("invalid UTF-8 string at byte offset {at}")))?;
        *pos = end;
        Ok(s)
    }
}

impl ValueEncoder for FixedStringCodec {
    type Input = str;

    fn reserve_hint(&self, rows: usize) -> usize {
        checked_byte_len(rows, self.size).unwrap_or(0)
    }

    fn encode(&self, value: &str, out: &mut Vec<u8>) -> Result<()> {
        let bytes = value.as_bytes();
        if bytes.len() > self.size {
            return Err(Error::numeric_range(format!(
                "{} bytes do not fit FixedString({})",
                bytes.len(),
                self.size
            )));
        }
        out.extend_from_slice(bytes);
        out.resize(out.len() + (self.size - bytes.len()), 0);
        Ok(())
    }

    fn encode_default(&self, out: &mut Vec<u8>) {
        out.resize(out.len() + self.size, 0);
    }
}
