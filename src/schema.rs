use crate::{Error, Result};
use core::fmt;

/// Parsed form of a ClickHouse type string such as `Decimal(18, 4)` or
/// `DateTime64(3, 'UTC')`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    Float32,
    Float64,
    Bool,
    Date,
    Date32,
    IPv4,
    String,
    FixedString(usize),
    DateTime64 {
        scale: u8,
        timezone: Option<String>,
    },
    Decimal {
        precision: u8,
        scale: u8,
    },
    Nullable(Box<ColumnType>),
    LowCardinality(Box<ColumnType>),
}

/// Storage width of a decimal column, implied by its precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimalWidth {
    D32,
    D64,
    D128,
    D256,
}

impl DecimalWidth {
    pub fn for_precision(precision: u8) -> Result<Self> {
        match precision {
            1..=9 => Ok(DecimalWidth::D32),
            10..=18 => Ok(DecimalWidth::D64),
            19..=38 => Ok(DecimalWidth::D128),
            39..=76 => Ok(DecimalWidth::D256),
            _ => Err(Error::numeric_range(format!(
                "decimal precision {precision} outside 1..=76"
            ))),
        }
    }

    pub fn max_precision(self) -> u8 {
        match self {
            DecimalWidth::D32 => 9,
            DecimalWidth::D64 => 18,
            DecimalWidth::D128 => 38,
            DecimalWidth::D256 => 76,
        }
    }

    pub fn byte_width(self) -> usize {
        match self {
            DecimalWidth::D32 => 4,
            DecimalWidth::D64 => 8,
            DecimalWidth::D128 => 16,
            DecimalWidth::D256 => 32,
        }
    }
}

pub const MAX_DATETIME64_SCALE: u8 = 9;

impl ColumnType {
    pub fn parse(type_name: &str) -> Result<Self> {
        let s = type_name.trim();
        let Some(open) = s.find('(') else {
            return simple_type(s);
        };
        if !s.ends_with(')') {
            return Err(Error::framing(format!("unbalanced parentheses in type `{s}`")));
        }
        let head = s[..open].trim();
        let args = split_args(&s[open + 1..s.len() - 1])?;

        match head {
            "FixedString" => {
                let [n] = expect_args::<1>(head, &args)?;
                let n: usize = parse_number(head, n)?;
                if n == 0 {
                    return Err(Error::framing("FixedString size must be positive"));
                }
                Ok(ColumnType::FixedString(n))
            }
            "DateTime64" => {
                let (scale, timezone) = match args.as_slice() {
                    [scale] => (*scale, None),
                    [scale, tz] => (*scale, Some(parse_quoted(tz)?)),
                    _ => {
                        return Err(Error::framing(format!(
                            "DateTime64 takes 1 or 2 arguments, got {}",
                            args.len()
                        )));
                    }
                };
                let scale: u8 = parse_number(head, scale)?;
                if scale > MAX_DATETIME64_SCALE {
                    return Err(Error::numeric_range(format!(
                        "DateTime64 scale {scale} exceeds {MAX_DATETIME64_SCALE}"
                    )));
                }
                Ok(ColumnType::DateTime64 { scale, timezone })
            }
            "Decimal" => {
                let [p, s] = expect_args::<2>(head, &args)?;
                let precision: u8 = parse_number(head, p)?;
                let scale: u8 = parse_number(head, s)?;
                decimal(precision, scale)
            }
            "Decimal32" | "Decimal64" | "Decimal128" | "Decimal256" => {
                let [s] = expect_args::<1>(head, &args)?;
                let width = match head {
                    "Decimal32" => DecimalWidth::D32,
                    "Decimal64" => DecimalWidth::D64,
                    "Decimal128" => DecimalWidth::D128,
                    _ => DecimalWidth::D256,
                };
                let scale: u8 = parse_number(head, s)?;
                decimal(width.max_precision(), scale)
            }
            "Nullable" => {
                let [inner] = expect_args::<1>(head, &args)?;
                let inner = ColumnType::parse(inner)?;
                if matches!(
                    inner,
                    ColumnType::Nullable(_) | ColumnType::LowCardinality(_)
                ) {
                    return Err(Error::unsupported(format!("Nullable({inner})")));
                }
                Ok(ColumnType::Nullable(Box::new(inner)))
            }
            "LowCardinality" => {
                let [inner] = expect_args::<1>(head, &args)?;
                Ok(ColumnType::LowCardinality(Box::new(ColumnType::parse(
                    inner,
                )?)))
            }
            _ => Err(Error::unsupported(format!("column type `{s}`"))),
        }
    }

    /// `Decimal(precision, scale)`, checking precision is within 1..=76 and
    /// scale does not exceed it.
    pub fn decimal(precision: u8, scale: u8) -> Result<Self> {
        decimal(precision, scale)
    }

    /// Fixed per-row byte width, or `None` for variable-width and wrapped types.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            ColumnType::UInt8 | ColumnType::Int8 | ColumnType::Bool => Some(1),
            ColumnType::UInt16 | ColumnType::Int16 | ColumnType::Date => Some(2),
            ColumnType::UInt32
            | ColumnType::Int32
            | ColumnType::Float32
            | ColumnType::Date32
            | ColumnType::IPv4 => Some(4),
            ColumnType::UInt64
            | ColumnType::Int64
            | ColumnType::Float64
            | ColumnType::DateTime64 { .. } => Some(8),
            ColumnType::UInt128 | ColumnType::Int128 => Some(16),
            ColumnType::FixedString(n) => Some(*n),
            ColumnType::Decimal { precision, .. } => DecimalWidth::for_precision(*precision)
                .ok()
                .map(DecimalWidth::byte_width),
            ColumnType::String | ColumnType::Nullable(_) | ColumnType::LowCardinality(_) => None,
        }
    }
}

fn decimal(precision: u8, scale: u8) -> Result<ColumnType> {
    DecimalWidth::for_precision(precision)?;
    if scale > precision {
        return Err(Error::numeric_range(format!(
            "decimal scale {scale} exceeds precision {precision}"
        )));
    }
    Ok(ColumnType::Decimal { precision, scale })
}

fn simple_type(s: &str) -> Result<ColumnType> {
    let ty = match s {
        "UInt8" => ColumnType::UInt8,
        "UInt16" => ColumnType::UInt16,
        "UInt32" => ColumnType::UInt32,
        "UInt64" => ColumnType::UInt64,
        "UInt128" => ColumnType::UInt128,
        "Int8" => ColumnType::Int8,
        "Int16" => ColumnType::Int16,
        "Int32" => ColumnType::Int32,
        "Int64" => ColumnType::Int64,
        "Int128" => ColumnType::Int128,
        "Float32" => ColumnType::Float32,
        "Float64" => ColumnType::Float64,
        "Bool" => ColumnType::Bool,
        "Date" => ColumnType::Date,
        "Date32" => ColumnType::Date32,
        "IPv4" => ColumnType::IPv4,
        "String" => ColumnType::String,
        "" => return Err(Error::framing("empty type string")),
        _ => return Err(Error::unsupported(format!("column type `{s}`"))),
    };
    Ok(ty)
}

/// Splits a parenthesised argument list at top-level commas, leaving nested
/// parentheses and quoted strings intact.
fn split_args(inner: &str) -> Result<Vec<&str>> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut start = 0usize;
    for (i, c) in inner.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::framing("unbalanced parentheses in type arguments"))?;
            }
            ',' if !in_quote && depth == 0 => {
                args.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 || in_quote {
        return Err(Error::framing("unterminated type arguments"));
    }
    args.push(inner[start..].trim());
    if args.iter().any(|a| a.is_empty()) {
        return Err(Error::framing("empty type argument"));
    }
    Ok(args)
}

fn expect_args<'s, const N: usize>(head: &str, args: &[&'s str]) -> Result<[&'s str; N]> {
    <[&str; N]>::try_from(args).map_err(|_| {
        Error::framing(format!(
            "{head} takes {N} argument(s), got {}",
            args.len()
        ))
    })
}

fn parse_number<T: core::str::FromStr>(head: &str, arg: &str) -> Result<T> {
    arg.parse()
        .map_err(|_| Error::framing(format!("invalid numeric argument `{arg}` for {head}")))
}

fn parse_quoted(arg: &str) -> Result<String> {
    arg.strip_prefix('\'')
        .and_then(|a| a.strip_suffix('\''))
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::framing(format!("expected quoted timezone, got `{arg}`")))
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::UInt8 => f.write_str("UInt8"),
            ColumnType::UInt16 => f.write_str("UInt16"),
            ColumnType::UInt32 => f.write_str("UInt32"),
            ColumnType::UInt64 => f.write_str("UInt64"),
            ColumnType::UInt128 => f.write_str("UInt128"),
            ColumnType::Int8 => f.write_str("Int8"),
            ColumnType::Int16 => f.write_str("Int16"),
            ColumnType::Int32 => f.write_str("Int32"),
            ColumnType::Int64 => f.write_str("Int64"),
            ColumnType::Int128 => f.write_str("Int128"),
            ColumnType::Float32 => f.write_str("Float32"),
            ColumnType::Float64 => f.write_str("Float64"),
            ColumnType::Bool => f.write_str("Bool"),
            ColumnType::Date => f.write_str("Date"),
            ColumnType::Date32 => f.write_str("Date32"),
            ColumnType::IPv4 => f.write_str("IPv4"),
            ColumnType::String => f.write_str("String"),
            ColumnType::FixedString(n) => write!(f, "FixedString({n})"),
            ColumnType::DateTime64 {
                scale,
                timezone: Some(tz),
            } => write!(f, "DateTime64({scale}, '{tz}')"),
            ColumnType::DateTime64 {
                scale,
                timezone: None,
            } => write!(f, "DateTime64({scale})"),
            ColumnType::Decimal { precision, scale } => write!(f, "Decimal({precision}, {scale})"),
            ColumnType::Nullable(inner) => write!(f, "Nullable({inner})"),
            ColumnType::LowCardinality(inner) => write!(f, "LowCardinality({inner})"),
        }
    }
}
