//! `Decimal(P, S)` columns: the value times `10^S`, stored as a signed
//! little-endian integer whose width follows from `P`.

use crate::codec::ColumnCodec;
use crate::codec::fixed::FixedCodec;
use crate::decimal::{Decimal128, FixedDecimal, UnscaledInt};
use crate::schema::{ColumnType, DecimalWidth};
use crate::{Error, Result};
use arrow_buffer::i256;
use core::marker::PhantomData;

fn check_storage<I: UnscaledInt>(precision: u8, scale: u8) -> Result<()> {
    ColumnType::decimal(precision, scale)?;
    let width = DecimalWidth::for_precision(precision)?;
    if width != I::STORAGE {
        return Err(Error::numeric_range(format!(
            "Decimal({precision}, {scale}) is stored in {} bytes, not {}",
            width.byte_width(),
            I::BYTES
        )));
    }
    Ok(())
}

/// `Decimal128`/`Decimal256` columns, read and written as [`FixedDecimal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalCodec<I> {
    precision: u8,
    scale: u8,
    _unscaled: PhantomData<I>,
}

pub type Decimal128Codec = DecimalCodec<i128>;
pub type Decimal256Codec = DecimalCodec<i256>;

impl<I: UnscaledInt> DecimalCodec<I> {
    pub fn new(precision: u8, scale: u8) -> Result<Self> {
        check_storage::<I>(precision, scale)?;
        Ok(Self {
            precision,
            scale,
            _unscaled: PhantomData,
        })
    }

    /// The `Decimal128(S)` / `Decimal256(S)` shorthand: widest precision for the storage.
    pub fn with_scale(scale: u8) -> Result<Self> {
        Self::new(I::STORAGE.max_precision(), scale)
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }
}

impl<I: UnscaledInt> ColumnCodec for DecimalCodec<I> {
    fn column_type(&self) -> ColumnType {
        ColumnType::Decimal {
            precision: self.precision,
            scale: self.scale,
        }
    }
}

impl<I: UnscaledInt> FixedCodec for DecimalCodec<I> {
    type Value = FixedDecimal<I>;

    const WIDTH: usize = I::BYTES;

    fn decode_slot(&self, bytes: &[u8]) -> Result<FixedDecimal<I>> {
        Ok(FixedDecimal::new(I::read_le(bytes), self.scale as u32))
    }

    fn encode_slot(&self, value: &FixedDecimal<I>, out: &mut [u8]) -> Result<()> {
        value
            .to_column_unscaled(self.precision, self.scale)?
            .write_le(out);
        Ok(())
    }
}

/// `Decimal32`/`Decimal64` columns, read and written as [`rust_decimal::Decimal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RustDecimalCodec<I> {
    precision: u8,
    scale: u8,
    _unscaled: PhantomData<I>,
}

pub type Decimal32Codec = RustDecimalCodec<i32>;
pub type Decimal64Codec = RustDecimalCodec<i64>;

impl<I: UnscaledInt> RustDecimalCodec<I> {
    pub fn new(precision: u8, scale: u8) -> Result<Self> {
        check_storage::<I>(precision, scale)?;
        Ok(Self {
            precision,
            scale,
            _unscaled: PhantomData,
        })
    }

    /// The `Decimal32(S)` / `Decimal64(S)` shorthand.
    pub fn with_scale(scale: u8) -> Result<Self> {
        Self::new(I::STORAGE.max_precision(), scale)
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }
}

impl<I: UnscaledInt> ColumnCodec for RustDecimalCodec<I> {
    fn column_type(&self) -> ColumnType {
        ColumnType::Decimal {
            precision: self.precision,
            scale: self.scale,
        }
    }
}

impl<I: UnscaledInt> FixedCodec for RustDecimalCodec<I> {
    type Value = rust_decimal::Decimal;

    const WIDTH: usize = I::BYTES;

    fn decode_slot(&self, bytes: &[u8]) -> Result<rust_decimal::Decimal> {
        let unscaled = I::read_le(bytes)
            .to_i128()
            .ok_or_else(|| Error::numeric_range("decimal value exceeds 128 bits"))?;
        rust_decimal::Decimal::try_from_i128_with_scale(unscaled, self.scale as u32)
            .map_err(|e| Error::numeric_range(e.to_string()))
    }

    fn encode_slot(&self, value: &rust_decimal::Decimal, out: &mut [u8]) -> Result<()> {
        let unscaled = Decimal128::new(value.mantissa(), value.scale())
            .to_column_unscaled(self.precision, self.scale)?;
        let unscaled = I::from_i128(unscaled).ok_or_else(|| {
            Error::numeric_range(format!("{value} does not fit {} bytes", I::BYTES))
        })?;
        unscaled.write_le(out);
        Ok(())
    }
}
