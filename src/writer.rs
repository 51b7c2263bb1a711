//! Block assembly for inserts.
//!
//! A [`BlockWriter`] keeps the block header and each finished column as a
//! separate segment and joins them only when the block is retrieved. Segment
//! buffers come from a [`WriteWorkspace`] and go back to it when the column or
//! the writer is dropped, whether or not the block was completed.

use crate::codec::compression::{Compression, compress_parts_into};
use crate::codec::decimal::{Decimal32Codec, Decimal64Codec, Decimal128Codec, Decimal256Codec};
use crate::codec::fixed::{BoolCodec, Date32Codec, DateCodec, DateTime64Codec, Ipv4Codec, Le};
use crate::codec::low_cardinality;
use crate::codec::nullable::{NOT_NULL, NULL, nullable_type};
use crate::codec::string::{FixedStringCodec, StringCodec};
use crate::codec::varint::{write_len_prefixed, write_uvarint};
use crate::codec::ValueEncoder;
use crate::schema::ColumnType;
use crate::{Error, Result};
use core::ops::{Deref, DerefMut};
use log::{debug, trace};
use std::collections::HashMap;

pub const DEFAULT_MAX_POOLED: usize = 64;
pub const DEFAULT_INITIAL_CAPACITY: usize = 4 * 1024;

/// Scratch buffers reused across blocks.
#[derive(Debug, Clone)]
pub struct WriteWorkspace {
    max_pooled: usize,
    initial_capacity: usize,
    free: Vec<Vec<u8>>,

    dict_map: HashMap<Vec<u8>, u64>,
    dict_entries: Vec<u8>,
    dict_indices: Vec<u64>,
}

impl Default for WriteWorkspace {
    fn default() -> Self {
        Self {
            max_pooled: DEFAULT_MAX_POOLED,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            free: Vec::new(),
            dict_map: HashMap::new(),
            dict_entries: Vec::new(),
            dict_indices: Vec::new(),
        }
    }
}

impl WriteWorkspace {
    /// Upper bound on idle buffers kept for reuse. Shrinking it drops the excess.
    pub fn set_max_pooled(&mut self, max_pooled: usize) -> &mut Self {
        self.max_pooled = max_pooled;
        self.free.truncate(max_pooled);
        self
    }

    /// Minimum capacity of a freshly acquired segment buffer.
    pub fn set_initial_capacity(&mut self, bytes: usize) -> &mut Self {
        self.initial_capacity = bytes;
        self
    }

    /// Idle buffers currently held.
    pub fn pooled(&self) -> usize {
        self.free.len()
    }

    fn acquire(&mut self, hint: usize) -> Vec<u8> {
        let mut buf = self.free.pop().unwrap_or_default();
        buf.clear();
        buf.reserve(hint.max(self.initial_capacity));
        buf
    }

    fn release(&mut self, mut buf: Vec<u8>) {
        if buf.capacity() == 0 || self.free.len() >= self.max_pooled {
            return;
        }
        buf.clear();
        self.free.push(buf);
    }
}

#[derive(Debug)]
enum WorkspaceRef<'ws> {
    Owned(WriteWorkspace),
    Borrowed(&'ws mut WriteWorkspace),
}

impl Deref for WorkspaceRef<'_> {
    type Target = WriteWorkspace;

    fn deref(&self) -> &WriteWorkspace {
        match self {
            WorkspaceRef::Owned(ws) => ws,
            WorkspaceRef::Borrowed(ws) => ws,
        }
    }
}

impl DerefMut for WorkspaceRef<'_> {
    fn deref_mut(&mut self) -> &mut WriteWorkspace {
        match self {
            WorkspaceRef::Owned(ws) => ws,
            WorkspaceRef::Borrowed(ws) => ws,
        }
    }
}

/// Builds one Native block of `columns` columns, each holding exactly `rows`
/// values.
#[derive(Debug)]
pub struct BlockWriter<'ws> {
    ws: WorkspaceRef<'ws>,
    columns: usize,
    rows: usize,
    columns_started: usize,
    columns_finished: usize,
    segments: Vec<Vec<u8>>,
    finished: bool,
}

macro_rules! default_writers {
    ($ws:lifetime; $($method:ident => $codec:ty),* $(,)?) => {
        $(
            pub fn $method(&mut self, name: &str) -> Result<ColumnWriter<'_, $ws, $codec>> {
                self.create_column(name, <$codec>::default())
            }
        )*
    };
}

impl BlockWriter<'static> {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self::build(WorkspaceRef::Owned(WriteWorkspace::default()), columns, rows)
    }
}

impl<'ws> BlockWriter<'ws> {
    /// Like [`BlockWriter::new`], drawing buffers from a caller-owned pool.
    pub fn with_workspace(columns: usize, rows: usize, ws: &'ws mut WriteWorkspace) -> Self {
        Self::build(WorkspaceRef::Borrowed(ws), columns, rows)
    }

    fn build(mut ws: WorkspaceRef<'ws>, columns: usize, rows: usize) -> Self {
        let mut header = ws.acquire(2 * crate::codec::varint::MAX_VARINT_LEN);
        write_uvarint(&mut header, columns as u64);
        write_uvarint(&mut header, rows as u64);
        let mut segments = Vec::with_capacity(columns.saturating_add(1).min(256));
        segments.push(header);
        Self {
            ws,
            columns,
            rows,
            columns_started: 0,
            columns_finished: 0,
            segments,
            finished: false,
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns_finished(&self) -> usize {
        self.columns_finished
    }

    fn open_column(&mut self, name: &str, ty: &ColumnType, hint: usize) -> Result<ColumnSlot<'_, 'ws>> {
        if self.finished {
            return Err(Error::framing("block already finished"));
        }
        if self.columns_started >= self.columns {
            return Err(Error::bounds(format!(
                "block declares {} columns, cannot add `{name}`",
                self.columns
            )));
        }
        let type_name = ty.to_string();
        let header_len = name.len() + type_name.len() + 2 * crate::codec::varint::MAX_VARINT_LEN;
        let mut buf = self.ws.acquire(header_len.saturating_add(hint));
        write_len_prefixed(&mut buf, name.as_bytes());
        write_len_prefixed(&mut buf, type_name.as_bytes());
        trace!("create column #{} `{name}` {type_name}", self.columns_started);
        self.columns_started += 1;
        Ok(ColumnSlot {
            writer: self,
            name: name.to_string(),
            buf,
        })
    }

    /// Starts the next column, encoding values with `encoder`.
    pub fn create_column<E: ValueEncoder>(
        &mut self,
        name: &str,
        encoder: E,
    ) -> Result<ColumnWriter<'_, 'ws, E>> {
        let hint = encoder.reserve_hint(self.rows);
        let ty = encoder.column_type();
        let slot = self.open_column(name, &ty, hint)?;
        Ok(ColumnWriter {
            slot,
            encoder,
            written: 0,
        })
    }

    /// Starts the next column as `Nullable` of the encoder's type.
    pub fn create_nullable_column<E: ValueEncoder>(
        &mut self,
        name: &str,
        encoder: E,
    ) -> Result<NullableColumnWriter<'_, 'ws, E>> {
        let rows = self.rows;
        let hint = encoder.reserve_hint(rows).saturating_add(rows);
        let ty = nullable_type(encoder.column_type());
        let mut slot = self.open_column(name, &ty, hint)?;
        let mask_start = slot.buf.len();
        let mask_end = mask_start
            .checked_add(rows)
            .ok_or_else(|| Error::bounds(format!("null mask of {rows} rows overflows")))?;
        slot.buf.resize(mask_end, NOT_NULL);
        Ok(NullableColumnWriter {
            slot,
            encoder,
            mask_start,
            written: 0,
        })
    }

    pub fn create_low_cardinality_string(
        &mut self,
        name: &str,
    ) -> Result<LowCardinalityColumnWriter<'_, 'ws>> {
        let ty = ColumnType::LowCardinality(Box::new(ColumnType::String));
        let rows = self.rows;
        let mut slot = self.open_column(name, &ty, rows)?;
        let ws = &mut *slot.writer.ws;
        ws.dict_map.clear();
        ws.dict_entries.clear();
        ws.dict_indices.clear();
        ws.dict_indices.reserve(rows);
        Ok(LowCardinalityColumnWriter { slot, written: 0 })
    }

    default_writers! {
        'ws;
        create_uint8 => Le<u8>,
        create_uint16 => Le<u16>,
        create_uint32 => Le<u32>,
        create_uint64 => Le<u64>,
        create_uint128 => Le<u128>,
        create_int8 => Le<i8>,
        create_int16 => Le<i16>,
        create_int32 => Le<i32>,
        create_int64 => Le<i64>,
        create_int128 => Le<i128>,
        create_float32 => Le<f32>,
        create_float64 => Le<f64>,
        create_bool => BoolCodec,
        create_date => DateCodec,
        create_date32 => Date32Codec,
        create_ipv4 => Ipv4Codec,
        create_string => StringCodec,
    }

    pub fn create_fixed_string(
        &mut self,
        name: &str,
        size: usize,
    ) -> Result<ColumnWriter<'_, 'ws, FixedStringCodec>> {
        self.create_column(name, FixedStringCodec::new(size)?)
    }

    pub fn create_datetime64(
        &mut self,
        name: &str,
        scale: u8,
        timezone: Option<&str>,
    ) -> Result<ColumnWriter<'_, 'ws, DateTime64Codec>> {
        self.create_column(name, DateTime64Codec::new(scale, timezone)?)
    }

    pub fn create_decimal32(
        &mut self,
        name: &str,
        precision: u8,
        scale: u8,
    ) -> Result<ColumnWriter<'_, 'ws, Decimal32Codec>> {
        self.create_column(name, Decimal32Codec::new(precision, scale)?)
    }

    pub fn create_decimal64(
        &mut self,
        name: &str,
        precision: u8,
        scale: u8,
    ) -> Result<ColumnWriter<'_, 'ws, Decimal64Codec>> {
        self.create_column(name, Decimal64Codec::new(precision, scale)?)
    }

    pub fn create_decimal128(
        &mut self,
        name: &str,
        precision: u8,
        scale: u8,
    ) -> Result<ColumnWriter<'_, 'ws, Decimal128Codec>> {
        self.create_column(name, Decimal128Codec::new(precision, scale)?)
    }

    pub fn create_decimal256(
        &mut self,
        name: &str,
        precision: u8,
        scale: u8,
    ) -> Result<ColumnWriter<'_, 'ws, Decimal256Codec>> {
        self.create_column(name, Decimal256Codec::new(precision, scale)?)
    }

    pub fn create_nullable_string(
        &mut self,
        name: &str,
    ) -> Result<NullableColumnWriter<'_, 'ws, StringCodec>> {
        self.create_nullable_column(name, StringCodec)
    }

    fn check_complete(&self) -> Result<()> {
        if self.finished {
            return Err(Error::framing("block already finished"));
        }
        if self.columns_finished != self.columns {
            return Err(Error::framing(format!(
                "block declares {} columns, {} finished",
                self.columns, self.columns_finished
            )));
        }
        Ok(())
    }

    fn seal(&mut self, plain_len: usize, out_len: usize) {
        for seg in core::mem::take(&mut self.segments) {
            self.ws.release(seg);
        }
        self.finished = true;
        debug!(
            "finished native block: {} columns x {} rows, {plain_len} bytes ({out_len} on the wire)",
            self.columns, self.rows
        );
    }

    /// Writes the finished block into `out`, replacing its contents. Every
    /// declared column must have been created and finished.
    pub fn finish_into(&mut self, out: &mut Vec<u8>) -> Result<()> {
        self.check_complete()?;
        let total = self.segments.iter().map(Vec::len).sum::<usize>();
        out.clear();
        out.reserve(total);
        for seg in &self.segments {
            out.extend_from_slice(seg);
        }
        self.seal(total, total);
        Ok(())
    }

    pub fn finish(mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.finish_into(&mut out)?;
        Ok(out)
    }

    /// Finishes the block and compresses it into `out`, streaming the column
    /// segments into the compressor. If compression fails the block stays
    /// unfinished and may be retrieved again.
    pub fn finish_compressed_into(&mut self, out: &mut Vec<u8>, c: Compression) -> Result<()> {
        self.check_complete()?;
        compress_parts_into(self.segments.as_slice(), out, c)?;
        let total = self.segments.iter().map(Vec::len).sum::<usize>();
        self.seal(total, out.len());
        Ok(())
    }
}

impl Drop for BlockWriter<'_> {
    fn drop(&mut self) {
        let segments = core::mem::take(&mut self.segments);
        for seg in segments {
            self.ws.release(seg);
        }
    }
}

/// A column's pooled buffer while it is being written. Returned to the pool
/// on drop unless committed to the block.
#[derive(Debug)]
struct ColumnSlot<'w, 'ws> {
    writer: &'w mut BlockWriter<'ws>,
    name: String,
    buf: Vec<u8>,
}

impl ColumnSlot<'_, '_> {
    fn rows(&self) -> usize {
        self.writer.rows
    }

    fn check_room(&self, written: usize) -> Result<()> {
        if written >= self.rows() {
            return Err(Error::bounds(format!(
                "column `{}` declares {} rows, cannot write another",
                self.name,
                self.rows()
            )));
        }
        Ok(())
    }

    fn commit(mut self, written: usize) -> Result<()> {
        if written != self.rows() {
            return Err(Error::framing(format!(
                "column `{}`: wrote {written} of {} rows",
                self.name,
                self.rows()
            )));
        }
        let buf = core::mem::take(&mut self.buf);
        trace!("finished column `{}`: {} bytes", self.name, buf.len());
        self.writer.segments.push(buf);
        self.writer.columns_finished += 1;
        Ok(())
    }
}

impl Drop for ColumnSlot<'_, '_> {
    fn drop(&mut self) {
        let buf = core::mem::take(&mut self.buf);
        self.writer.ws.release(buf);
    }
}

/// Accepts exactly the block's row count of values, in order.
#[derive(Debug)]
pub struct ColumnWriter<'w, 'ws, E> {
    slot: ColumnSlot<'w, 'ws>,
    encoder: E,
    written: usize,
}

impl<E: ValueEncoder> ColumnWriter<'_, '_, E> {
    pub fn name(&self) -> &str {
        &self.slot.name
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn remaining(&self) -> usize {
        self.slot.rows() - self.written
    }

    pub fn write(&mut self, value: &E::Input) -> Result<()> {
        self.slot.check_room(self.written)?;
        let start = self.slot.buf.len();
        if let Err(e) = self.encoder.encode(value, &mut self.slot.buf) {
            self.slot.buf.truncate(start);
            return Err(e.context(format_args!("column `{}` row {}", self.slot.name, self.written)));
        }
        self.written += 1;
        Ok(())
    }

    /// Commits the column to the block. Fails unless every row was written.
    pub fn finish(self) -> Result<()> {
        self.slot.commit(self.written)
    }
}

/// Writer for a `Nullable` column. The null mask is sized up front and
/// filled in place; null rows get the inner type's default placeholder.
#[derive(Debug)]
pub struct NullableColumnWriter<'w, 'ws, E> {
    slot: ColumnSlot<'w, 'ws>,
    encoder: E,
    mask_start: usize,
    written: usize,
}

impl<E: ValueEncoder> NullableColumnWriter<'_, '_, E> {
    pub fn name(&self) -> &str {
        &self.slot.name
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn remaining(&self) -> usize {
        self.slot.rows() - self.written
    }

    pub fn write(&mut self, value: Option<&E::Input>) -> Result<()> {
        self.slot.check_room(self.written)?;
        match value {
            Some(v) => {
                let start = self.slot.buf.len();
                if let Err(e) = self.encoder.encode(v, &mut self.slot.buf) {
                    self.slot.buf.truncate(start);
                    return Err(
                        e.context(format_args!("column `{}` row {}", self.slot.name, self.written))
                    );
                }
            }
            None => {
                self.slot.buf[self.mask_start + self.written] = NULL;
                self.encoder.encode_default(&mut self.slot.buf);
            }
        }
        self.written += 1;
        Ok(())
    }

    pub fn write_null(&mut self) -> Result<()> {
        self.write(None)
    }

    pub fn finish(self) -> Result<()> {
        self.slot.commit(self.written)
    }
}

/// Writer for a `LowCardinality(String)` column. Values are collected into a
/// dictionary and serialized on [`finish`](Self::finish).
#[derive(Debug)]
pub struct LowCardinalityColumnWriter<'w, 'ws> {
    slot: ColumnSlot<'w, 'ws>,
    written: usize,
}

impl LowCardinalityColumnWriter<'_, '_> {
    pub fn name(&self) -> &str {
        &self.slot.name
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn remaining(&self) -> usize {
        self.slot.rows() - self.written
    }

    /// Distinct values seen so far.
    pub fn cardinality(&self) -> usize {
        self.slot.writer.ws.dict_map.len()
    }

    pub fn write(&mut self, value: &str) -> Result<()> {
        self.slot.check_room(self.written)?;
        let ws = &mut *self.slot.writer.ws;
        let key = match ws.dict_map.get(value.as_bytes()) {
            Some(&key) => key,
            None => {
                let key = ws.dict_map.len() as u64;
                ws.dict_map.insert(value.as_bytes().to_vec(), key);
                write_len_prefixed(&mut ws.dict_entries, value.as_bytes());
                key
            }
        };
        ws.dict_indices.push(key);
        self.written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        let written = self.written;
        if written == self.slot.rows() {
            let slot = &mut self.slot;
            let ws = &*slot.writer.ws;
            let key_width = low_cardinality::encode_into(
                &mut slot.buf,
                &ws.dict_entries,
                ws.dict_map.len(),
                &ws.dict_indices,
            )
            .map_err(|e| e.context(format_args!("column `{}`", slot.name)))?;
            debug!(
                "column `{}`: {} distinct values, {:?} keys",
                slot.name,
                ws.dict_map.len(),
                key_width
            );
        }
        self.slot.commit(written)
    }
}
