//! Unsigned LEB128, as used by the Native format for counts and lengths.

use crate::{Error, Result};

pub const MAX_VARINT_LEN: usize = 10;

#[inline]
pub fn write_uvarint(out: &mut Vec<u8>, mut x: u64) -> usize {
    let start = out.len();
    while x >= 0x80 {
        out.push((x as u8) | 0x80);
        x >>= 7;
    }
    out.push(x as u8);
    out.len() - start
}

/// Reads one varint at `*pos`, advancing `pos` past it.
pub fn read_uvarint(bytes: &[u8], pos: &mut usize) -> Result<u64> {
    let mut x: u64 = 0;
    let mut shift: u32 = 0;
    for i in 0..MAX_VARINT_LEN {
        let b = *bytes.get(*pos).ok_or_else(|| {
            Error::framing(format!("truncated varint at byte offset {}", *pos))
        })?;
        *pos += 1;
        let lo = (b & 0x7F) as u64;
        // 10th byte may only carry the single remaining bit.
        if i == MAX_VARINT_LEN - 1 && (b & 0x80 != 0 || lo > 1) {
            return Err(Error::framing(format!(
                "varint overflow at byte offset {}",
                *pos - 1
            )));
        }
        x |= lo << shift;
        if (b & 0x80) == 0 {
            return Ok(x);
        }
        shift += 7;
    }
    Err(Error::framing("varint overflow"))
}

/// Reads a varint that must fit the platform's `usize`.
pub fn read_uvarint_usize(bytes: &[u8], pos: &mut usize) -> Result<usize> {
    let at = *pos;
    let v = read_uvarint(bytes, pos)?;
    usize::try_from(v).map_err(|_| {
        Error::framing(format!("length {v} at byte offset {at} does not fit in memory"))
    })
}

pub fn uvarint_len(mut x: u64) -> usize {
    let mut n = 1;
    while x >= 0x80 {
        x >>= 7;
        n += 1;
    }
    n
}

/// Reads a varint length prefix followed by that many bytes.
pub fn read_len_prefixed<'a>(bytes: &'a [u8], pos: &mut usize) -> Result<&'a [u8]> {
    let len = read_uvarint_usize(bytes, pos)?;
    let end = pos
        .checked_add(len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| {
            Error::framing(format!(
                "length-prefixed payload of {len} bytes at byte offset {} exceeds buffer",
                *pos
            ))
        })?;
    let out = &bytes[*pos..end];
    *pos = end;
    Ok(out)
}

pub fn write_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    write_uvarint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

pub fn read_str<'a>(bytes: &'a [u8], pos: &mut usize) -> Result<&'a str> {
    let at = *pos;
    let raw = read_len_prefixed(bytes, pos)?;
    core::str::from_utf8(raw)
        .map_err(|_| Error::framing(format!("invalid UTF-8 string at byte offset {at}")))
}
