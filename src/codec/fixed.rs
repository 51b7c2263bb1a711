//! Fixed-width scalar codecs: one slot of `WIDTH` bytes per row.

use crate::codec::{ColumnCodec, ValueDecoder, ValueEncoder, checked_byte_len, fixed_span};
use crate::datetime::{
    date_from_days, datetime_from_ticks, datetime_to_ticks, days_since_epoch, parse_timezone,
    ticks_per_second,
};
use crate::schema::ColumnType;
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use core::marker::PhantomData;
use std::net::Ipv4Addr;

/// A per-row encoding with a constant byte width.
pub trait FixedCodec: ColumnCodec {
    type Value;

    const WIDTH: usize;

    /// `bytes` is exactly `WIDTH` long.
    fn decode_slot(&self, bytes: &[u8]) -> Result<Self::Value>;

    /// `out` is exactly `WIDTH` long.
    fn encode_slot(&self, value: &Self::Value, out: &mut [u8]) -> Result<()>;
}

impl<'a, C: FixedCodec> ValueDecoder<'a> for C {
    type Item = <C as FixedCodec>::Value;

    fn span(&self, data: &'a [u8], rows: usize) -> Result<usize> {
        fixed_span(data, rows, C::WIDTH)
    }

    fn decode(&self, data: &'a [u8], pos: &mut usize) -> Result<Self::Item> {
        let end = pos
            .checked_add(C::WIDTH)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| Error::bounds(format!("slot at byte offset {} exceeds column", *pos)))?;
        let value = self.decode_slot(&data[*pos..end])?;
        *pos = end;
        Ok(value)
    }
}

impl<C: FixedCodec> ValueEncoder for C {
    type Input = <C as FixedCodec>::Value;

    fn reserve_hint(&self, rows: usize) -> usize {
        checked_byte_len(rows, C::WIDTH).unwrap_or(0)
    }

    fn encode(&self, value: &Self::Input, out: &mut Vec<u8>) -> Result<()> {
        let start = out.len();
        out.resize(start + C::WIDTH, 0);
        if let Err(e) = self.encode_slot(value, &mut out[start..]) {
            out.truncate(start);
            return Err(e);
        }
        Ok(())
    }

    fn encode_default(&self, out: &mut Vec<u8>) {
        out.resize(out.len() + C::WIDTH, 0);
    }
}

/// Native numeric stored little-endian.
pub trait LePrimitive: Copy {
    const WIDTH: usize;

    fn column_type() -> ColumnType;

    fn read_le(bytes: &[u8]) -> Self;

    fn write_le(self, out: &mut [u8]);
}

macro_rules! le_primitive {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl LePrimitive for $t {
                const WIDTH: usize = core::mem::size_of::<$t>();

                fn column_type() -> ColumnType {
                    ColumnType::$variant
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; core::mem::size_of::<$t>()];
                    buf.copy_from_slice(bytes);
                    <$t>::from_le_bytes(buf)
                }

                #[inline]
                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

le_primitive! {
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    u128 => UInt128,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    i128 => Int128,
    f32 => Float32,
    f64 => Float64,
}

/// `UInt*`, `Int*` and `Float*` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Le<T>(PhantomData<T>);

impl<T> Le<T> {
    pub const fn new() -> Self {
        Le(PhantomData)
    }
}

impl<T> Default for Le<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: LePrimitive> ColumnCodec for Le<T> {
    fn column_type(&self) -> ColumnType {
        T::column_type()
    }
}

impl<T: LePrimitive> FixedCodec for Le<T> {
    type Value = T;

    const WIDTH: usize = T::WIDTH;

    fn decode_slot(&self, bytes: &[u8]) -> Result<T> {
        Ok(T::read_le(bytes))
    }

    fn encode_slot(&self, value: &T, out: &mut [u8]) -> Result<()> {
        value.write_le(out);
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BoolCodec;

impl ColumnCodec for BoolCodec {
    fn column_type(&self) -> ColumnType {
        ColumnType::Bool
    }
}

impl FixedCodec for BoolCodec {
    type Value = bool;

    const WIDTH: usize = 1;

    fn decode_slot(&self, bytes: &[u8]) -> Result<bool> {
        Ok(bytes[0] != 0)
    }

    fn encode_slot(&self, value: &bool, out: &mut [u8]) -> Result<()> {
        out[0] = *value as u8;
        Ok(())
    }
}

/// `Date`: unsigned 16-bit day count since 1970-01-01.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DateCodec;

impl ColumnCodec for DateCodec {
    fn column_type(&self) -> ColumnType {
        ColumnType::Date
    }
}

impl FixedCodec for DateCodec {
    type Value = NaiveDate;

    const WIDTH: usize = 2;

    fn decode_slot(&self, bytes: &[u8]) -> Result<NaiveDate> {
        date_from_days(u16::read_le(bytes) as i64)
    }

    fn encode_slot(&self, value: &NaiveDate, out: &mut [u8]) -> Result<()> {
        let days = days_since_epoch(*value);
        let days = u16::try_from(days)
            .map_err(|_| Error::numeric_range(format!("{value} is outside the Date range")))?;
        days.write_le(out);
        Ok(())
    }
}

/// `Date32`: signed 32-bit day count since 1970-01-01.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Date32Codec;

impl ColumnCodec for Date32Codec {
    fn column_type(&self) -> ColumnType {
        ColumnType::Date32
    }
}

impl FixedCodec for Date32Codec {
    type Value = NaiveDate;

    const WIDTH: usize = 4;

    fn decode_slot(&self, bytes: &[u8]) -> Result<NaiveDate> {
        date_from_days(i32::read_le(bytes) as i64)
    }

    fn encode_slot(&self, value: &NaiveDate, out: &mut [u8]) -> Result<()> {
        let days = days_since_epoch(*value);
        let days = i32::try_from(days)
            .map_err(|_| Error::numeric_range(format!("{value} is outside the Date32 range")))?;
        days.write_le(out);
        Ok(())
    }
}

/// `IPv4`: the address as a little-endian `u32`, i.e. octets reversed
/// relative to dotted-quad order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Codec;

impl ColumnCodec for Ipv4Codec {
    fn column_type(&self) -> ColumnType {
        ColumnType::IPv4
    }
}

impl FixedCodec for Ipv4Codec {
    type Value = Ipv4Addr;

    const WIDTH: usize = 4;

    fn decode_slot(&self, bytes: &[u8]) -> Result<Ipv4Addr> {
        Ok(Ipv4Addr::from(u32::read_le(bytes)))
    }

    fn encode_slot(&self, value: &Ipv4Addr, out: &mut [u8]) -> Result<()> {
        u32::from(*value).write_le(out);
        Ok(())
    }
}

/// `DateTime64(scale[, 'tz'])`: signed 64-bit count of `10^-scale` second
/// ticks since the epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTime64Codec {
    scale: u8,
    timezone: Option<Tz>,
}

impl DateTime64Codec {
    pub fn new(scale: u8, timezone: Option<&str>) -> Result<Self> {
        ticks_per_second(scale)?;
        let timezone = timezone.map(parse_timezone).transpose()?;
        Ok(Self { scale, timezone })
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn timezone(&self) -> Option<Tz> {
        self.timezone
    }

    /// The instant as shown in the column's timezone (UTC when none is set).
    pub fn to_local(&self, value: &DateTime<Utc>) -> DateTime<Tz> {
        crate::datetime::to_local(value, &self.timezone.unwrap_or(Tz::UTC))
    }
}

impl ColumnCodec for DateTime64Codec {
    fn column_type(&self) -> ColumnType {
        ColumnType::DateTime64 {
            scale: self.scale,
            timezone: self.timezone.map(|tz| tz.name().to_string()),
        }
    }
}

impl FixedCodec for DateTime64Codec {
    type Value = DateTime<Utc>;

    const WIDTH: usize = 8;

    fn decode_slot(&self, bytes: &[u8]) -> Result<DateTime<Utc>> {
        datetime_from_ticks(i64::read_le(bytes), self.scale)
    }

    fn encode_slot(&self, value: &DateTime<Utc>, out: &mut [u8]) -> Result<()> {
        datetime_to_ticks(value, self.scale)?.write_le(out);
        Ok(())
    }
}
