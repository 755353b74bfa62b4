use chrono::{NaiveDateTime, TimeDelta};

/// Layout used by the feed and by everything this process displays.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const LOCAL_OFFSET_HOURS: i64 = 7;

pub const LOCAL_ZONE_NAME: &str = "UTC+7 (Indochina Time)";

pub fn parse(timestamp: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(timestamp.trim(), TIMESTAMP_FORMAT)
}

pub fn format(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Shifts a naive UTC timestamp to local time.
///
/// Rollover past midnight carries into month and year.
pub fn to_local(utc: NaiveDateTime) -> NaiveDateTime {
    utc + TimeDelta::hours(LOCAL_OFFSET_HOURS)
}

pub fn adjust(timestamp: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    parse(timestamp).map(to_local)
}
