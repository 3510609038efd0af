//! Timestamp handling for the Timetables API.
//!
//! The API encodes instants as 10-digit `YYMMDDHHMM` strings in German civil
//! time. Malformed values are common in live feeds, so decoding never fails:
//! anything that is not a well-formed timestamp simply decodes to `None`.

use std::cmp::Ordering;

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeDelta, TimeZone};
use chrono_tz::Tz;

/// A timezone-aware instant as reported by the feed.
pub type Instant = DateTime<Tz>;

/// The civil timezone every feed timestamp is expressed in.
pub const FEED_TZ: Tz = chrono_tz::Europe::Berlin;

/// Error returned when a date argument cannot be normalised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date {input:?}: {reason}")]
pub struct TimeError {
    input: String,
    reason: &'static str,
}

impl TimeError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// Decode a `YYMMDDHHMM` timestamp into an instant in [`FEED_TZ`].
///
/// Returns `None` for anything that is not exactly ten ASCII digits and for
/// out-of-range fields. Local times that occur twice resolve to the earlier
/// instant. Local times skipped by the spring transition are read with the
/// offset in force before it, so `02:30` on that night is `03:30` summer
/// time.
///
/// # Examples
///
/// ```
/// use chrono::{Datelike, Timelike};
/// use train_delays::domain::decode;
///
/// let t = decode("2401011005").unwrap();
/// assert_eq!((t.year(), t.month(), t.day()), (2024, 1, 1));
/// assert_eq!((t.hour(), t.minute()), (10, 5));
///
/// assert!(decode("").is_none());
/// assert!(decode("240101100").is_none());
/// assert!(decode("24010110a5").is_none());
/// assert!(decode("2413011005").is_none());
/// ```
pub fn decode(s: &str) -> Option<Instant> {
    let bytes = s.as_bytes();
    if bytes.len() != 10 || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }

    let year = 2000 + two_digits(&bytes[0..2]) as i32;
    let month = two_digits(&bytes[2..4]);
    let day = two_digits(&bytes[4..6]);
    let hour = two_digits(&bytes[6..8]);
    let minute = two_digits(&bytes[8..10]);

    let local = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
    resolve_local(&local)
}

fn resolve_local(local: &NaiveDateTime) -> Option<Instant> {
    match FEED_TZ.from_local_datetime(local) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earlier, _) => Some(earlier),
        LocalResult::None => {
            // Berlin gaps are one hour long, so an hour earlier is before it.
            let before = FEED_TZ
                .from_local_datetime(&(*local - TimeDelta::hours(1)))
                .earliest()?;
            before
                .offset()
                .fix()
                .from_local_datetime(local)
                .single()
                .map(|t| t.with_timezone(&FEED_TZ))
        }
    }
}

/// Encode an instant as `YYMMDDHHMM` in [`FEED_TZ`].
pub fn encode(instant: &Instant) -> String {
    instant
        .with_timezone(&FEED_TZ)
        .format("%y%m%d%H%M")
        .to_string()
}

/// Normalise a date argument into the `YYMMDD` path segment of the plan
/// endpoint.
///
/// Accepts `YYMMDD`, `YYYYMMDD` or `YYYY-MM-DD`. When no date is given the
/// date of `now` is used.
pub fn to_yymmdd(date: Option<&str>, now: &Instant) -> Result<String, TimeError> {
    let Some(raw) = date.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(now.with_timezone(&FEED_TZ).format("%y%m%d").to_string());
    };

    if raw.contains('-') {
        let parts: Vec<&str> = raw.split('-').collect();
        let [y, m, d] = parts.as_slice() else {
            return Err(TimeError::new(raw, "expected YYYY-MM-DD"));
        };
        let parse = |p: &str| p.parse::<u32>().ok();
        let (Some(y), Some(m), Some(d)) = (parse(*y), parse(*m), parse(*d)) else {
            return Err(TimeError::new(raw, "expected numeric date parts"));
        };
        if NaiveDate::from_ymd_opt(y as i32, m, d).is_none() {
            return Err(TimeError::new(raw, "not a calendar date"));
        }
        return Ok(format!("{:02}{:02}{:02}", y % 100, m, d));
    }

    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeError::new(raw, "expected digits"));
    }

    let (year, rest) = match raw.len() {
        8 => (raw[..4].parse::<i32>(), &raw[4..]),
        6 => (raw[..2].parse::<i32>().map(|yy| 2000 + yy), &raw[2..]),
        _ => {
            return Err(TimeError::new(
                raw,
                "date must be YYMMDD, YYYYMMDD or YYYY-MM-DD",
            ));
        }
    };
    let (Ok(year), Ok(month), Ok(day)) = (year, rest[..2].parse::<u32>(), rest[2..].parse::<u32>())
    else {
        return Err(TimeError::new(raw, "expected digits"));
    };
    if NaiveDate::from_ymd_opt(year, month, day).is_none() {
        return Err(TimeError::new(raw, "not a calendar date"));
    }
    Ok(format!("{:02}{month:02}{day:02}", year % 100))
}

/// Parse an instant as written to the CSV tables.
///
/// Accepts RFC 3339 (`2024-01-01T10:05:00+01:00`) and the space-separated
/// variant. The result is normalised into [`FEED_TZ`].
pub fn parse_instant(s: &str) -> Option<Instant> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z"))
        .ok()
        .map(|t| t.with_timezone(&FEED_TZ))
}

/// Ascending order on optional values with absent values sorted last.
pub fn cmp_absent_last<T: Ord>(a: Option<&T>, b: Option<&T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn two_digits(bytes: &[u8]) -> u32 {
    u32::from(bytes[0] - b'0') * 10 + u32::from(bytes[1] - b'0')
}

/// Serde adapter for `Option<Instant>` CSV cells.
///
/// Present instants are written as RFC 3339 with offset, absent ones as an
/// empty cell. Unparseable cells read back as absent.
pub mod serde_instant {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Instant, parse_instant};

    pub fn serialize<S: Serializer>(value: &Option<Instant>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => s.serialize_str(&t.to_rfc3339()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Instant>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.as_deref().and_then(parse_instant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn at(s: &str) -> Instant {
        decode(s).unwrap()
    }

    #[test]
    fn decode_valid() {
        let t = at("2401011005");
        assert_eq!(t.year(), 2024);
        assert_eq!(t.month(), 1);
        assert_eq!(t.day(), 1);
        assert_eq!(t.hour(), 10);
        assert_eq!(t.minute(), 5);
        assert_eq!(t.to_rfc3339(), "2024-01-01T10:05:00+01:00");
    }

    #[test]
    fn decode_summer_time_offset() {
        assert_eq!(at("2407151230").to_rfc3339(), "2024-07-15T12:30:00+02:00");
    }

    #[test]
    fn decode_rejects_malformed() {
        assert!(decode("").is_none());
        assert!(decode("24010110").is_none());
        assert!(decode("24010110055").is_none());
        assert!(decode("2401011O05").is_none());
        assert!(decode(" 401011005").is_none());
        assert!(decode("２401011005").is_none());
    }

    #[test]
    fn decode_rejects_out_of_range_fields() {
        assert!(decode("2413011005").is_none());
        assert!(decode("2402301005").is_none());
        assert!(decode("2401012405").is_none());
        assert!(decode("2401011060").is_none());
    }

    #[test]
    fn decode_dst_gap_uses_winter_offset() {
        // 2024-03-31 02:30 does not exist in Europe/Berlin.
        assert_eq!(at("2403310230").to_rfc3339(), "2024-03-31T03:30:00+02:00");
        assert_eq!(at("2403310200").to_rfc3339(), "2024-03-31T03:00:00+02:00");
        assert_eq!(at("2403310159").to_rfc3339(), "2024-03-31T01:59:00+01:00");
        assert_eq!(at("2403310300").to_rfc3339(), "2024-03-31T03:00:00+02:00");
    }

    #[test]
    fn decode_dst_fold_takes_earlier() {
        // 2024-10-27 02:30 occurs twice; the first is still on summer time.
        assert_eq!(at("2410270230").to_rfc3339(), "2024-10-27T02:30:00+02:00");
    }

    #[test]
    fn encode_matches_decode() {
        assert_eq!(encode(&at("2401011005")), "2401011005");
        let utc = at("2407151230").with_timezone(&chrono_tz::UTC);
        assert_eq!(encode(&utc), "2407151230");
    }

    #[test]
    fn yymmdd_formats() {
        let now = at("2405061200");
        assert_eq!(to_yymmdd(Some("240102"), &now).unwrap(), "240102");
        assert_eq!(to_yymmdd(Some("20240102"), &now).unwrap(), "240102");
        assert_eq!(to_yymmdd(Some("2024-01-02"), &now).unwrap(), "240102");
        assert_eq!(to_yymmdd(Some("2024-1-2"), &now).unwrap(), "240102");
        assert_eq!(to_yymmdd(Some(" 240102 "), &now).unwrap(), "240102");
        assert_eq!(to_yymmdd(None, &now).unwrap(), "240506");
        assert_eq!(to_yymmdd(Some(""), &now).unwrap(), "240506");
    }

    #[test]
    fn yymmdd_rejects_garbage() {
        let now = at("2405061200");
        assert!(to_yymmdd(Some("2401"), &now).is_err());
        assert!(to_yymmdd(Some("24-01"), &now).is_err());
        assert!(to_yymmdd(Some("2024-13-01"), &now).is_err());
        assert!(to_yymmdd(Some("20241399"), &now).is_err());
        assert!(to_yymmdd(Some("241399"), &now).is_err());
        assert!(to_yymmdd(Some("230229"), &now).is_err());
        assert_eq!(to_yymmdd(Some("240229"), &now).unwrap(), "240229");
        assert!(to_yymmdd(Some("tomorrow"), &now).is_err());

        let err = to_yymmdd(Some("2401"), &now).unwrap_err();
        assert!(err.to_string().contains("2401"));
    }

    #[test]
    fn parse_instant_formats() {
        let expected = at("2401011005");
        assert_eq!(parse_instant("2024-01-01T10:05:00+01:00"), Some(expected));
        assert_eq!(parse_instant("2024-01-01 10:05:00+01:00"), Some(expected));
        assert_eq!(parse_instant("2024-01-01T09:05:00Z"), Some(expected));
        assert_eq!(parse_instant(""), None);
        assert_eq!(parse_instant("NaT"), None);
    }

    #[test]
    fn absent_sorts_last() {
        let mut values = vec![None, Some(3), Some(1), None, Some(2)];
        values.sort_by(|a, b| cmp_absent_last(a.as_ref(), b.as_ref()));
        assert_eq!(values, vec![Some(1), Some(2), Some(3), None, None]);
    }
}
