//! `LowCardinality(String)`: a dictionary of distinct strings plus one key
//! per row.
//!
//! Layout:
//! - `u64` serialization version (`1`, shared dictionaries with additional keys)
//! - `u64` flags: key type in the low byte, plus dictionary bits
//! - `u64` dictionary size, then each entry as varint length + UTF-8
//! - `u64` row count, then one key per row at the selected width
//!
//! A zero-row block carries no column payload at all, not even the version
//! word.

use crate::codec::varint::read_str;
use crate::codec::{checked_byte_len, fixed_span};
use crate::{Error, Result};

pub const SHARED_DICTIONARIES_WITH_ADDITIONAL_KEYS: u64 = 1;

pub const NEED_GLOBAL_DICTIONARY: u64 = 1 << 8;
pub const HAS_ADDITIONAL_KEYS: u64 = 1 << 9;
pub const NEED_UPDATE_DICTIONARY: u64 = 1 << 10;

const KEY_TYPE_MASK: u64 = 0xFF;
const KNOWN_FLAGS: u64 =
    KEY_TYPE_MASK | NEED_GLOBAL_DICTIONARY | HAS_ADDITIONAL_KEYS | NEED_UPDATE_DICTIONARY;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyWidth {
    U8 = 0,
    U16 = 1,
    U32 = 2,
    U64 = 3,
}

impl KeyWidth {
    fn from_id(id: u64) -> Result<Self> {
        match id {
            0 => Ok(KeyWidth::U8),
            1 => Ok(KeyWidth::U16),
            2 => Ok(KeyWidth::U32),
            3 => Ok(KeyWidth::U64),
            _ => Err(Error::framing(format!("unknown LowCardinality key type {id}"))),
        }
    }

    /// Narrowest width able to index a dictionary of `cardinality` entries.
    pub fn for_cardinality(cardinality: usize) -> Self {
        let cardinality = cardinality as u64;
        if cardinality <= 0x100 {
            KeyWidth::U8
        } else if cardinality <= 0x1_0000 {
            KeyWidth::U16
        } else if cardinality <= 0x1_0000_0000 {
            KeyWidth::U32
        } else {
            KeyWidth::U64
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            KeyWidth::U8 => 1,
            KeyWidth::U16 => 2,
            KeyWidth::U32 => 4,
            KeyWidth::U64 => 8,
        }
    }

    #[inline]
    pub fn read(self, keys: &[u8], row: usize) -> Option<u64> {
        let start = row.checked_mul(self.bytes())?;
        let slot = keys.get(start..start.checked_add(self.bytes())?)?;
        Some(match self {
            KeyWidth::U8 => slot[0] as u64,
            KeyWidth::U16 => u16::from_le_bytes([slot[0], slot[1]]) as u64,
            KeyWidth::U32 => u32::from_le_bytes([slot[0], slot[1], slot[2], slot[3]]) as u64,
            KeyWidth::U64 => u64::from_le_bytes([
                slot[0], slot[1], slot[2], slot[3], slot[4], slot[5], slot[6], slot[7],
            ]),
        })
    }

    fn write(self, out: &mut Vec<u8>, key: u64) {
        match self {
            KeyWidth::U8 => out.push(key as u8),
            KeyWidth::U16 => out.extend_from_slice(&(key as u16).to_le_bytes()),
            KeyWidth::U32 => out.extend_from_slice(&(key as u32).to_le_bytes()),
            KeyWidth::U64 => out.extend_from_slice(&key.to_le_bytes()),
        }
    }
}

fn read_u64_le(data: &[u8], pos: &mut usize) -> Result<u64> {
    let end = pos
        .checked_add(8)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| Error::framing(format!("truncated u64 at byte offset {}", *pos)))?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[*pos..end]);
    *pos = end;
    Ok(u64::from_le_bytes(buf))
}

fn read_count(data: &[u8], pos: &mut usize, what: &str) -> Result<usize> {
    let at = *pos;
    let v = read_u64_le(data, pos)?;
    usize::try_from(v)
        .map_err(|_| Error::framing(format!("{what} {v} at byte offset {at} does not fit in memory")))
}

/// A decoded LowCardinality column borrowing from the input buffer.
#[derive(Debug, Clone)]
pub struct Decoded<'a> {
    pub dictionary: Vec<&'a str>,
    pub keys: &'a [u8],
    pub key_width: KeyWidth,
    pub consumed: usize,
}

pub fn decode(data: &[u8], rows: usize) -> Result<Decoded<'_>> {
    if rows == 0 {
        return Ok(Decoded {
            dictionary: Vec::new(),
            keys: &[],
            key_width: KeyWidth::U8,
            consumed: 0,
        });
    }
    let mut pos = 0usize;
    let first = read_u64_le(data, &mut pos)?;
    let flags = if first & HAS_ADDITIONAL_KEYS != 0 {
        // Version word omitted: this is already the flags word.
        first
    } else if first == SHARED_DICTIONARIES_WITH_ADDITIONAL_KEYS {
        read_u64_le(data, &mut pos)?
    } else {
        return Err(Error::framing(format!(
            "unknown LowCardinality serialization version {first}"
        )));
    };

    if flags & NEED_GLOBAL_DICTIONARY != 0 {
        return Err(Error::unsupported(
            "LowCardinality global dictionary (server-side shared state)",
        ));
    }
    if flags & HAS_ADDITIONAL_KEYS == 0 {
        return Err(Error::unsupported(
            "LowCardinality column without additional keys",
        ));
    }
    if flags & !KNOWN_FLAGS != 0 {
        return Err(Error::framing(format!("unknown LowCardinality flags {flags:#x}")));
    }
    let key_width = KeyWidth::from_id(flags & KEY_TYPE_MASK)?;

    let dict_size = read_count(data, &mut pos, "dictionary size")?;
    let mut dictionary = Vec::with_capacity(dict_size.min(data.len() - pos));
    for _ in 0..dict_size {
        dictionary.push(read_str(data, &mut pos)?);
    }

    let key_rows = read_count(data, &mut pos, "key count")?;
    if key_rows != rows {
        return Err(Error::framing(format!(
            "LowCardinality carries {key_rows} keys, block declares {rows} rows"
        )));
    }
    let keys_len = fixed_span(&data[pos..], rows, key_width.bytes())?;
    let keys = &data[pos..pos + keys_len];
    pos += keys_len;

    Ok(Decoded {
        dictionary,
        keys,
        key_width,
        consumed: pos,
    })
}

/// Serializes a column from its dictionary (entries already varint-framed, in
/// first-seen order) and per-row dictionary indices. Writes nothing when
/// there are no rows.
pub fn encode_into(
    out: &mut Vec<u8>,
    dict_entries: &[u8],
    dict_len: usize,
    indices: &[u64],
) -> Result<KeyWidth> {
    let key_width = KeyWidth::for_cardinality(dict_len);
    if indices.is_empty() {
        return Ok(key_width);
    }

    out.extend_from_slice(&SHARED_DICTIONARIES_WITH_ADDITIONAL_KEYS.to_le_bytes());
    let flags = key_width as u64 | HAS_ADDITIONAL_KEYS | NEED_UPDATE_DICTIONARY;
    let keys_len = checked_byte_len(indices.len(), key_width.bytes())?;
    out.reserve(8 * 3 + dict_entries.len() + keys_len);
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&(dict_len as u64).to_le_bytes());
    out.extend_from_slice(dict_entries);
    out.extend_from_slice(&(indices.len() as u64).to_le_bytes());
    for &idx in indices {
        if idx as usize >= dict_len {
            return Err(Error::bounds(format!(
                "dictionary index {idx} outside dictionary of {dict_len}"
            )));
        }
        key_width.write(out, idx);
    }
    Ok(key_width)
}
