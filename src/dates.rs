//! # Source Date Grammar Module
//!
//! ## Purpose
//! The scraped site and the clerk feeds use four fixed date/time notations.
//! Each one parses here and nowhere else, and everything normalizes to epoch
//! seconds treated as UTC-naive — the stamps carry no zone and none is
//! invented for them.
//!
//! Grammars:
//! - `MM/DD/YYYY` — overview and cosponsor dates
//! - `MM/DD/YYYY-HH:MM(AM|PM)` — full action log stamps
//! - `MM/DD/YY H:MMAM` — committee meeting stamps (two-digit year,
//!   single-digit hours occur and are zero-padded before parsing)
//! - `DD-Mon-YYYY` plus `HH:MM` — roll-call action date and time

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::errors::{PipelineError, Result};

/// Seconds since the Unix epoch, UTC-naive
pub type EpochSeconds = i64;

fn to_epoch(dt: NaiveDateTime) -> EpochSeconds {
    dt.and_utc().timestamp()
}

fn malformed(value: &str, expected: &'static str) -> PipelineError {
    PipelineError::MalformedDate {
        value: value.to_string(),
        expected,
    }
}

/// Zero-pad the hour of a `H:MM(AM|PM)`-shaped chunk. The source format
/// cannot be parsed with an unpadded single-digit hour.
fn pad_hour(time: &str) -> String {
    match time.split_once(':') {
        Some((hour, rest)) if hour.len() == 1 => format!("0{hour}:{rest}"),
        _ => time.to_string(),
    }
}

/// Parse a date-only `MM/DD/YYYY` stamp
pub fn parse_date(value: &str) -> Result<EpochSeconds> {
    let date = NaiveDate::parse_from_str(value.trim(), "%m/%d/%Y")
        .map_err(|_| malformed(value, "MM/DD/YYYY"))?;
    Ok(to_epoch(date.and_time(NaiveTime::MIN)))
}

/// Parse a full action stamp `MM/DD/YYYY-HH:MM(AM|PM)`
pub fn parse_action_stamp(value: &str) -> Result<EpochSeconds> {
    let trimmed = value.trim();
    let (date, time) = trimmed
        .split_once('-')
        .ok_or_else(|| malformed(value, "MM/DD/YYYY-HH:MM(AM|PM)"))?;
    let rebuilt = format!("{date}-{}", pad_hour(time));
    let dt = NaiveDateTime::parse_from_str(&rebuilt, "%m/%d/%Y-%I:%M%p")
        .map_err(|_| malformed(value, "MM/DD/YYYY-HH:MM(AM|PM)"))?;
    Ok(to_epoch(dt))
}

/// Parse a committee meeting stamp `MM/DD/YY H:MMAM`
pub fn parse_meeting_stamp(value: &str) -> Result<EpochSeconds> {
    let trimmed = value.trim();
    let (date, time) = trimmed
        .split_once(' ')
        .ok_or_else(|| malformed(value, "MM/DD/YY H:MMAM"))?;
    let rebuilt = format!("{date} {}", pad_hour(time));
    let dt = NaiveDateTime::parse_from_str(&rebuilt, "%m/%d/%y %I:%M%p")
        .map_err(|_| malformed(value, "MM/DD/YY H:MMAM"))?;
    Ok(to_epoch(dt))
}

/// Parse a roll-call `action-date` (`DD-Mon-YYYY`) plus `action-time`
/// `time-etz` attribute (`HH:MM`)
pub fn parse_clerk_stamp(date: &str, time: &str) -> Result<EpochSeconds> {
    let day = NaiveDate::parse_from_str(date.trim(), "%d-%b-%Y")
        .map_err(|_| malformed(date, "DD-Mon-YYYY"))?;
    let clock = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map_err(|_| malformed(time, "HH:MM"))?;
    Ok(to_epoch(day.and_time(clock)))
}

/// Parse a `legislative_day` attribute, `YYYYMMDD`
pub fn parse_compact_date(value: &str) -> Result<EpochSeconds> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y%m%d")
        .map_err(|_| malformed(value, "YYYYMMDD"))?;
    Ok(to_epoch(date.and_time(NaiveTime::MIN)))
}

/// Parse a floor action `for-search` attribute
/// (`YYYY-MM-DDTHH:MM:SS`, zone-free)
pub fn parse_floor_stamp(value: &str) -> Result<EpochSeconds> {
    let dt = NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%dT%H:%M:%S")
        .map_err(|_| malformed(value, "YYYY-MM-DDTHH:MM:SS"))?;
    Ok(to_epoch(dt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_only_is_midnight_utc() {
        assert_eq!(parse_date("01/02/2019").unwrap(), 1_546_387_200);
        assert_eq!(parse_date(" 01/02/2019 ").unwrap(), 1_546_387_200);
    }

    #[test]
    fn action_stamp_pads_single_digit_hours() {
        // 03/13/2019 at 9:05AM would fail unpadded
        let padded = parse_action_stamp("03/13/2019-9:05AM").unwrap();
        let explicit = parse_action_stamp("03/13/2019-09:05AM").unwrap();
        assert_eq!(padded, explicit);
    }

    #[test]
    fn action_stamp_handles_pm() {
        let morning = parse_action_stamp("03/13/2019-09:05AM").unwrap();
        let evening = parse_action_stamp("03/13/2019-9:05PM").unwrap();
        assert_eq!(evening - morning, 12 * 3600);
    }

    #[test]
    fn meeting_stamp_uses_two_digit_year() {
        let a = parse_meeting_stamp("12/04/19 9:00AM").unwrap();
        let b = parse_meeting_stamp("12/04/19 09:00AM").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn clerk_stamp_combines_date_and_etz_time() {
        let stamp = parse_clerk_stamp("12-Jul-2019", "14:35").unwrap();
        let base = parse_date("07/12/2019").unwrap();
        assert_eq!(stamp - base, 14 * 3600 + 35 * 60);
    }

    #[test]
    fn compact_and_floor_stamps() {
        assert_eq!(parse_compact_date("20190102").unwrap(), 1_546_387_200);
        let t = parse_floor_stamp("2019-01-02T10:30:00").unwrap();
        assert_eq!(t - 1_546_387_200, 10 * 3600 + 30 * 60);
    }

    #[test]
    fn malformed_values_are_typed_errors() {
        for bad in ["2019-01-02", "13/45/2019", "junk"] {
            match parse_date(bad) {
                Err(crate::errors::PipelineError::MalformedDate { .. }) => {}
                other => panic!("expected MalformedDate, got {other:?}"),
            }
        }
        assert!(parse_action_stamp("03/13/2019 9:05AM").is_err());
        assert!(parse_clerk_stamp("Jul-12-2019", "14:35").is_err());
    }
}
