//! Conversions between ClickHouse date/time encodings and `chrono` types.
//!
//! Stored values are always UTC based. A column timezone only changes how an
//! instant is rendered, never the encoded integer.

use crate::schema::MAX_DATETIME64_SCALE;
use crate::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_FROM_CE: i64 = 719_163;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

pub fn days_since_epoch(date: NaiveDate) -> i64 {
    date.num_days_from_ce() as i64 - UNIX_EPOCH_FROM_CE
}

pub fn date_from_days(days: i64) -> Result<NaiveDate> {
    days.checked_add(UNIX_EPOCH_FROM_CE)
        .and_then(|ce| i32::try_from(ce).ok())
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| Error::numeric_range(format!("{days} days since epoch is not a valid date")))
}

/// `10^scale` for a DateTime64 scale.
pub fn ticks_per_second(scale: u8) -> Result<i64> {
    if scale > MAX_DATETIME64_SCALE {
        return Err(Error::numeric_range(format!(
            "DateTime64 scale {scale} exceeds {MAX_DATETIME64_SCALE}"
        )));
    }
    Ok(10i64.pow(scale as u32))
}

/// Decodes a DateTime64 tick count. Seconds use floor division so pre-1970
/// instants keep a non-negative sub-second part.
pub fn datetime_from_ticks(ticks: i64, scale: u8) -> Result<DateTime<Utc>> {
    let per_second = ticks_per_second(scale)?;
    let seconds = ticks.div_euclid(per_second);
    let fraction = ticks.rem_euclid(per_second);
    let nanos = fraction * (NANOS_PER_SECOND / per_second);
    DateTime::from_timestamp(seconds, nanos as u32).ok_or_else(|| {
        Error::numeric_range(format!("DateTime64 value {ticks} at scale {scale} is out of range"))
    })
}

/// Encodes an instant as DateTime64 ticks, truncating sub-second precision
/// the scale cannot hold.
pub fn datetime_to_ticks(value: &DateTime<Utc>, scale: u8) -> Result<i64> {
    let per_second = ticks_per_second(scale)?;
    let nanos_per_tick = NANOS_PER_SECOND / per_second;
    let fraction = value.timestamp_subsec_nanos() as i64 / nanos_per_tick;
    value
        .timestamp()
        .checked_mul(per_second)
        .and_then(|t| t.checked_add(fraction))
        .ok_or_else(|| {
            Error::numeric_range(format!("{value} does not fit DateTime64({scale})"))
        })
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| Error::unsupported(format!("unknown timezone '{name}'")))
}

pub fn to_local(value: &DateTime<Utc>, tz: &Tz) -> DateTime<Tz> {
    tz.from_utc_datetime(&value.naive_utc())
}
