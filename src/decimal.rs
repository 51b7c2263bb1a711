//! Exact decimal values backed by a fixed-width unscaled integer.
//!
//! `Decimal128` and `Decimal256` have no native Rust counterpart, so they are
//! modelled as `(unscaled, scale)` pairs. All arithmetic is integer
//! arithmetic; nothing here goes through floating point.

use crate::schema::DecimalWidth;
use crate::{Error, Result};
use arrow_buffer::i256;
use core::fmt;
use core::str::FromStr;

/// Signed two's-complement integer usable as a decimal's unscaled value.
pub trait UnscaledInt: Copy + Eq + Ord + fmt::Debug {
    const BYTES: usize;
    const STORAGE: DecimalWidth;

    fn zero() -> Self;
    fn ten() -> Self;
    fn from_i128(v: i128) -> Option<Self>;
    fn to_i128(self) -> Option<i128>;
    fn checked_add(self, rhs: Self) -> Option<Self>;
    fn checked_sub(self, rhs: Self) -> Option<Self>;
    fn checked_mul(self, rhs: Self) -> Option<Self>;
    fn checked_div(self, rhs: Self) -> Option<Self>;
    fn checked_rem(self, rhs: Self) -> Option<Self>;
    fn checked_neg(self) -> Option<Self>;
    fn is_negative(self) -> bool;

    /// `bytes` is exactly `BYTES` long.
    fn read_le(bytes: &[u8]) -> Self;

    /// `out` is exactly `BYTES` long.
    fn write_le(self, out: &mut [u8]);
}

macro_rules! native_unscaled {
    ($($t:ty => $storage:ident),* $(,)?) => {
        $(
            impl UnscaledInt for $t {
                const BYTES: usize = core::mem::size_of::<$t>();
                const STORAGE: DecimalWidth = DecimalWidth::$storage;

                fn zero() -> Self { 0 }
                fn ten() -> Self { 10 }
                fn from_i128(v: i128) -> Option<Self> { <$t>::try_from(v).ok() }
                fn to_i128(self) -> Option<i128> { Some(self as i128) }
                fn checked_add(self, rhs: Self) -> Option<Self> { <$t>::checked_add(self, rhs) }
                fn checked_sub(self, rhs: Self) -> Option<Self> { <$t>::checked_sub(self, rhs) }
                fn checked_mul(self, rhs: Self) -> Option<Self> { <$t>::checked_mul(self, rhs) }
                fn checked_div(self, rhs: Self) -> Option<Self> { <$t>::checked_div(self, rhs) }
                fn checked_rem(self, rhs: Self) -> Option<Self> { <$t>::checked_rem(self, rhs) }
                fn checked_neg(self) -> Option<Self> { <$t>::checked_neg(self) }
                fn is_negative(self) -> bool { self < 0 }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; core::mem::size_of::<$t>()];
                    buf.copy_from_slice(bytes);
                    <$t>::from_le_bytes(buf)
                }

                fn write_le(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

native_unscaled! {
    i32 => D32,
    i64 => D64,
    i128 => D128,
}

impl UnscaledInt for i256 {
    const BYTES: usize = 32;
    const STORAGE: DecimalWidth = DecimalWidth::D256;

    fn zero() -> Self {
        i256::ZERO
    }

    fn ten() -> Self {
        i256::from_i128(10)
    }

    fn from_i128(v: i128) -> Option<Self> {
        Some(i256::from_i128(v))
    }

    fn to_i128(self) -> Option<i128> {
        i256::to_i128(self)
    }

    fn checked_add(self, rhs: Self) -> Option<Self> {
        i256::checked_add(self, rhs)
    }

    fn checked_sub(self, rhs: Self) -> Option<Self> {
        i256::checked_sub(self, rhs)
    }

    fn checked_mul(self, rhs: Self) -> Option<Self> {
        i256::checked_mul(self, rhs)
    }

    fn checked_div(self, rhs: Self) -> Option<Self> {
        i256::checked_div(self, rhs)
    }

    fn checked_rem(self, rhs: Self) -> Option<Self> {
        i256::checked_rem(self, rhs)
    }

    fn checked_neg(self) -> Option<Self> {
        i256::checked_neg(self)
    }

    fn is_negative(self) -> bool {
        i256::is_negative(self)
    }

    fn read_le(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 32];
        buf.copy_from_slice(bytes);
        i256::from_le_bytes(buf)
    }

    fn write_le(self, out: &mut [u8]) {
        out.copy_from_slice(&self.to_le_bytes());
    }
}

/// `10^exp`, or `None` when it overflows `I`.
pub fn pow10<I: UnscaledInt>(exp: u32) -> Option<I> {
    let mut acc = I::from_i128(1)?;
    for _ in 0..exp {
        acc = acc.checked_mul(I::ten())?;
    }
    Some(acc)
}

/// Number of decimal digits in `v`, ignoring sign. Zero has one digit.
pub fn digit_count<I: UnscaledInt>(v: I) -> u32 {
    let mut n = 1;
    let mut rest = v;
    loop {
        rest = match rest.checked_div(I::ten()) {
            Some(r) => r,
            None => return n,
        };
        if rest == I::zero() {
            return n;
        }
        n += 1;
    }
}

/// `unscaled * 10^-scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedDecimal<I> {
    unscaled: I,
    scale: u32,
}

pub type Decimal128 = FixedDecimal<i128>;
pub type Decimal256 = FixedDecimal<i256>;

impl<I: UnscaledInt> FixedDecimal<I> {
    pub fn new(unscaled: I, scale: u32) -> Self {
        Self { unscaled, scale }
    }

    pub fn unscaled(&self) -> I {
        self.unscaled
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_negative(&self) -> bool {
        self.unscaled.is_negative()
    }

    /// Digits of the unscaled value, i.e. the precision this value needs.
    pub fn digits(&self) -> u32 {
        digit_count(self.unscaled)
    }

    /// Re-expresses the value at `scale`. Growing the scale fails only on
    /// overflow; shrinking it fails if a nonzero digit would be dropped.
    pub fn rescale(&self, scale: u32) -> Result<Self> {
        if scale == self.scale {
            return Ok(*self);
        }
        if scale > self.scale {
            let unscaled = pow10::<I>(scale - self.scale)
                .and_then(|f| self.unscaled.checked_mul(f))
                .ok_or_else(|| {
                    Error::numeric_range(format!("{self} overflows at scale {scale}"))
                })?;
            return Ok(Self { unscaled, scale });
        }
        let Some(divisor) = pow10::<I>(self.scale - scale) else {
            if self.unscaled == I::zero() {
                return Ok(Self { unscaled: I::zero(), scale });
            }
            return Err(Error::numeric_range(format!(
                "rescaling {self} to scale {scale} drops nonzero digits"
            )));
        };
        let rem = self
            .unscaled
            .checked_rem(divisor)
            .ok_or_else(|| Error::numeric_range("decimal remainder overflow"))?;
        if rem != I::zero() {
            return Err(Error::numeric_range(format!(
                "rescaling {self} to scale {scale} drops nonzero digits"
            )));
        }
        let unscaled = self
            .unscaled
            .checked_div(divisor)
            .ok_or_else(|| Error::numeric_range("decimal division overflow"))?;
        Ok(Self { unscaled, scale })
    }

    /// Rescales to `scale` and checks the result fits `precision` digits.
    pub fn to_column_unscaled(&self, precision: u8, scale: u8) -> Result<I> {
        let v = self.rescale(scale as u32)?;
        if v.digits() > precision as u32 {
            return Err(Error::numeric_range(format!(
                "{self} needs {} digits, column precision is {precision}",
                v.digits()
            )));
        }
        Ok(v.unscaled)
    }

    /// Converts between unscaled widths when the value fits.
    pub fn cast<J: UnscaledInt>(&self) -> Result<FixedDecimal<J>> {
        let unscaled = if J::BYTES >= I::BYTES {
            widen::<I, J>(self.unscaled)
        } else {
            self.unscaled.to_i128().and_then(J::from_i128)
        }
        .ok_or_else(|| {
            Error::numeric_range(format!("{self} does not fit {}-byte decimal", J::BYTES))
        })?;
        Ok(FixedDecimal {
            unscaled,
            scale: self.scale,
        })
    }
}

/// Moves a value into an integer at least as wide, digit by digit so that
/// widths beyond `i128` are handled without loss.
fn widen<I: UnscaledInt, J: UnscaledInt>(v: I) -> Option<J> {
    if let Some(small) = v.to_i128() {
        return J::from_i128(small);
    }
    let mut digits = Vec::new();
    let mut rest = v;
    while rest != I::zero() {
        let d = rest.checked_rem(I::ten())?.to_i128()?.unsigned_abs() as i128;
        digits.push(d);
        rest = rest.checked_div(I::ten())?;
    }
    let mut acc = J::zero();
    for d in digits.into_iter().rev() {
        let d = J::from_i128(d)?;
        acc = acc.checked_mul(J::ten())?;
        acc = if v.is_negative() {
            acc.checked_sub(d)?
        } else {
            acc.checked_add(d)?
        };
    }
    Some(acc)
}

impl<I: UnscaledInt> fmt::Display for FixedDecimal<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut digits = Vec::new();
        let mut rest = self.unscaled;
        loop {
            let (Some(d), Some(next)) = (rest.checked_rem(I::ten()), rest.checked_div(I::ten()))
            else {
                return Err(fmt::Error);
            };
            let d = d.to_i128().ok_or(fmt::Error)?.unsigned_abs() as u8;
            digits.push(b'0' + d);
            rest = next;
            if rest == I::zero() {
                break;
            }
        }
        let scale = self.scale as usize;
        while digits.len() <= scale {
            digits.push(b'0');
        }
        digits.reverse();
        let (int_part, frac_part) = digits.split_at(digits.len() - scale);
        if self.unscaled.is_negative() {
            f.write_str("-")?;
        }
        f.write_str(core::str::from_utf8(int_part).map_err(|_| fmt::Error)?)?;
        if scale > 0 {
            f.write_str(".")?;
            f.write_str(core::str::from_utf8(frac_part).map_err(|_| fmt::Error)?)?;
        }
        Ok(())
    }
}

impl<I: UnscaledInt> FromStr for FixedDecimal<I> {
    type Err = Error;

    /// Accepts `[-+]digits[.digits]`; the scale is the number of fractional
    /// digits written.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::numeric_range(format!("invalid decimal literal `{s}`"));
        let (negative, body) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        let mut acc = I::zero();
        for c in int_part.bytes().chain(frac_part.bytes()) {
            if !c.is_ascii_digit() {
                return Err(invalid());
            }
            let d = I::from_i128((c - b'0') as i128).ok_or_else(invalid)?;
            acc = acc
                .checked_mul(I::ten())
                .and_then(|a| {
                    if negative {
                        a.checked_sub(d)
                    } else {
                        a.checked_add(d)
                    }
                })
                .ok_or_else(|| {
                    Error::numeric_range(format!("decimal literal `{s}` overflows {} bytes", I::BYTES))
                })?;
        }
        let scale = u32::try_from(frac_part.len()).map_err(|_| invalid())?;
        Ok(Self {
            unscaled: acc,
            scale,
        })
    }
}

impl TryFrom<rust_decimal::Decimal> for Decimal128 {
    type Error = Error;

    fn try_from(value: rust_decimal::Decimal) -> Result<Self> {
        Ok(Self::new(value.mantissa(), value.scale()))
    }
}

impl TryFrom<Decimal128> for rust_decimal::Decimal {
    type Error = Error;

    fn try_from(value: Decimal128) -> Result<Self> {
        rust_decimal::Decimal::try_from_i128_with_scale(value.unscaled(), value.scale())
            .map_err(|e| Error::numeric_range(format!("{value}: {e}")))
    }
}
