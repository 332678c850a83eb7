//! Built-in codecs for `Duration`, `DateTime<Utc>` and `NaiveDate`.

use std::any::type_name;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use weaver_msgpack::{Packer, Timestamp, Unpacker, ValueKind};

use super::{instance, MessageCodec};
use crate::config::WeaverConfig;
use crate::context::WeaverContext;
use crate::dynamic::Dyn;
use crate::error::{Result, WeaverError};

const SECONDS_PER_DAY: u64 = 86_400;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Describes the next value for an error message and skips it.
fn describe_and_skip(u: &mut Unpacker<'_>) -> Result<String> {
    let text = match u.peek_kind()? {
        ValueKind::Nil => "null".to_string(),
        kind => kind.to_string(),
    };
    u.skip_value()?;
    Ok(text)
}

/// Formats like `PT1M30S`: hours, minutes and seconds, no days.
pub(crate) fn format_iso_duration(d: Duration) -> String {
    let total = d.as_secs();
    let nanos = d.subsec_nanos();
    if total == 0 && nanos == 0 {
        return "PT0S".to_string();
    }
    let mut out = String::from("PT");
    let (hours, minutes, seconds) = (total / 3600, total % 3600 / 60, total % 60);
    if hours > 0 {
        out.push_str(&format!("{hours}H"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}M"));
    }
    if seconds > 0 || nanos > 0 {
        out.push_str(&seconds.to_string());
        if nanos > 0 {
            let fraction = format!("{nanos:09}");
            out.push('.');
            out.push_str(fraction.trim_end_matches('0'));
        }
        out.push('S');
    }
    out
}

fn parse_seconds(text: &str) -> Option<Duration> {
    let (whole, fraction) = match text.split_once('.') {
        Some((_, "")) => return None,
        Some(parts) => parts,
        None => (text, ""),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let seconds = whole.parse::<u64>().ok()?;
    if fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let nanos = if fraction.is_empty() {
        0
    } else {
        format!("{fraction:0<9}").parse::<u32>().ok()?
    };
    Some(Duration::new(seconds, nanos))
}

fn parse_count(text: &str, unit_seconds: u64) -> Option<Duration> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let count = text.parse::<u64>().ok()?;
    Some(Duration::from_secs(count.checked_mul(unit_seconds)?))
}

/// Parses `PnDTnHnMn.nS` with every component optional, ignoring ASCII case.
pub(crate) fn parse_iso_duration(text: &str) -> Option<Duration> {
    let upper = text.trim().to_ascii_uppercase();
    let rest = upper.strip_prefix('P')?;
    let (date, time) = match rest.split_once('T') {
        Some((date, time)) if !time.is_empty() => (date, Some(time)),
        Some(_) => return None,
        None => (rest, None),
    };
    let mut total = Duration::ZERO;
    let mut seen = false;
    if !date.is_empty() {
        total = total.checked_add(parse_count(date.strip_suffix('D')?, SECONDS_PER_DAY)?)?;
        seen = true;
    }
    if let Some(mut time) = time {
        for (unit, unit_seconds) in [('H', 3600), ('M', 60)] {
            if let Some((count, tail)) = time.split_once(unit) {
                total = total.checked_add(parse_count(count, unit_seconds)?)?;
                time = tail;
                seen = true;
            }
        }
        if !time.is_empty() {
            total = total.checked_add(parse_seconds(time.strip_suffix('S')?)?)?;
            seen = true;
        }
    }
    seen.then_some(total)
}

/// `Duration` as an ISO-8601 string. Integers are read as milliseconds.
pub(crate) struct DurationCodec;

impl MessageCodec for DurationCodec {
    fn pack(&self, value: &Dyn, p: &mut Packer, _config: &WeaverConfig) -> Result<()> {
        p.pack_str(&format_iso_duration(*instance::<Duration>(value)?))?;
        Ok(())
    }

    fn unpack(&self, u: &mut Unpacker<'_>, ctx: &mut WeaverContext) -> Result<()> {
        let target = type_name::<Duration>();
        let duration = match u.peek_kind()? {
            ValueKind::Str => {
                let text = u.unpack_str()?;
                parse_iso_duration(&text)
                    .ok_or_else(|| WeaverError::cannot_convert(format!("{text:?}"), target))?
            }
            ValueKind::Int => {
                let millis = u.unpack_i64()?;
                u64::try_from(millis)
                    .map(Duration::from_millis)
                    .map_err(|_| WeaverError::cannot_convert(millis, target))?
            }
            _ => return Err(WeaverError::cannot_convert(describe_and_skip(u)?, target)),
        };
        ctx.set_object(duration);
        Ok(())
    }
}

/// `DateTime<Utc>` as a timestamp extension. Also reads RFC 3339 strings and
/// epoch milliseconds.
pub(crate) struct DateTimeCodec;

impl MessageCodec for DateTimeCodec {
    fn pack(&self, value: &Dyn, p: &mut Packer, _config: &WeaverConfig) -> Result<()> {
        let dt = instance::<DateTime<Utc>>(value)?;
        p.pack_timestamp(&Timestamp::from_datetime(dt))?;
        Ok(())
    }

    fn unpack(&self, u: &mut Unpacker<'_>, ctx: &mut WeaverContext) -> Result<()> {
        let target = type_name::<DateTime<Utc>>();
        let dt = match u.peek_kind()? {
            ValueKind::Ext => {
                let ts = u.unpack_timestamp()?;
                ts.to_datetime()
                    .ok_or_else(|| WeaverError::cannot_convert(ts, target))?
            }
            ValueKind::Str => {
                let text = u.unpack_str()?;
                DateTime::parse_from_rfc3339(text.trim())
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| WeaverError::cannot_convert(format!("{text:?}"), target))?
            }
            ValueKind::Int => {
                let millis = u.unpack_i64()?;
                DateTime::from_timestamp_millis(millis)
                    .ok_or_else(|| WeaverError::cannot_convert(millis, target))?
            }
            _ => return Err(WeaverError::cannot_convert(describe_and_skip(u)?, target)),
        };
        ctx.set_object(dt);
        Ok(())
    }
}

/// `NaiveDate` as `YYYY-MM-DD`.
pub(crate) struct NaiveDateCodec;

impl MessageCodec for NaiveDateCodec {
    fn pack(&self, value: &Dyn, p: &mut Packer, _config: &WeaverConfig) -> Result<()> {
        let date = instance::<NaiveDate>(value)?;
        p.pack_str(&date.format(DATE_FORMAT).to_string())?;
        Ok(())
    }

    fn unpack(&self, u: &mut Unpacker<'_>, ctx: &mut WeaverContext) -> Result<()> {
        let target = type_name::<NaiveDate>();
        let date = match u.peek_kind()? {
            ValueKind::Str => {
                let text = u.unpack_str()?;
                NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
                    .map_err(|_| WeaverError::cannot_convert(format!("{text:?}"), target))?
            }
            ValueKind::Ext => {
                let ts = u.unpack_timestamp()?;
                ts.to_datetime()
                    .map(|dt| dt.date_naive())
                    .ok_or_else(|| WeaverError::cannot_convert(ts, target))?
            }
            _ => return Err(WeaverError::cannot_convert(describe_and_skip(u)?, target)),
        };
        ctx.set_object(date);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_iso_durations() {
        assert_eq!(format_iso_duration(Duration::from_secs(90)), "PT1M30S");
        assert_eq!(format_iso_duration(Duration::ZERO), "PT0S");
        assert_eq!(format_iso_duration(Duration::from_secs(3600)), "PT1H");
        assert_eq!(format_iso_duration(Duration::from_secs(2 * 86_400 + 5)), "PT48H5S");
        assert_eq!(format_iso_duration(Duration::from_millis(1500)), "PT1.5S");
        assert_eq!(format_iso_duration(Duration::from_nanos(1)), "PT0.000000001S");
    }

    #[test]
    fn parses_iso_durations() {
        assert_eq!(parse_iso_duration("PT1M30S"), Some(Duration::from_secs(90)));
        assert_eq!(parse_iso_duration("pt0s"), Some(Duration::ZERO));
        assert_eq!(parse_iso_duration("P1D"), Some(Duration::from_secs(86_400)));
        assert_eq!(
            parse_iso_duration("P1DT2H3M4.25S"),
            Some(Duration::new(86_400 + 2 * 3600 + 3 * 60 + 4, 250_000_000))
        );
        for bad in ["", "P", "PT", "1M", "PT1X", "PT-1S", "PT1.S", "PT30S1M", "P1H"] {
            assert_eq!(parse_iso_duration(bad), None, "{bad}");
        }
    }

    #[test]
    fn format_then_parse_is_identity() {
        for d in [
            Duration::from_secs(90),
            Duration::new(7 * 3600 + 1, 10),
            Duration::from_millis(250),
        ] {
            assert_eq!(parse_iso_duration(&format_iso_duration(d)), Some(d));
        }
    }
}
