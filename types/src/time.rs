//! Timestamps and calendar keys.
//!
//! Timestamps are Unix epoch seconds (UTC). Day keys are derived from a request
//! timestamp plus the user's UTC offset at the point of use, never from a
//! background timer.

use crate::error::TerraError;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Get the current system time as a `Timestamp`.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// An ISO calendar day (`YYYY-MM-DD`) used as the key of every per-day record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub const FORMAT: &'static str = "%Y-%m-%d";

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, TerraError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| TerraError::InvalidDayKey(format!("{year:04}-{month:02}-{day:02}")))
    }

    /// The calendar day `ts` falls on for a user at `utc_offset_secs` east of UTC.
    pub fn from_timestamp(ts: Timestamp, utc_offset_secs: i32) -> Result<Self, TerraError> {
        let offset = FixedOffset::east_opt(utc_offset_secs)
            .ok_or(TerraError::InvalidUtcOffset(utc_offset_secs))?;
        let secs = i64::try_from(ts.as_secs())
            .map_err(|_| TerraError::TimestampOutOfRange(ts.as_secs()))?;
        let utc = DateTime::from_timestamp(secs, 0)
            .ok_or(TerraError::TimestampOutOfRange(ts.as_secs()))?;
        Ok(Self(utc.with_timezone(&offset).date_naive()))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn next(&self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }

    pub fn quarter(&self) -> QuarterKey {
        QuarterKey::from_day(*self)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl FromStr for DayKey {
    type Err = TerraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // chrono accepts unpadded fields; the record keys must be canonical.
        if s.len() != 10 {
            return Err(TerraError::InvalidDayKey(s.to_string()));
        }
        NaiveDate::parse_from_str(s, Self::FORMAT)
            .map(Self)
            .map_err(|_| TerraError::InvalidDayKey(s.to_string()))
    }
}

impl TryFrom<String> for DayKey {
    type Error = TerraError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DayKey> for String {
    fn from(day: DayKey) -> Self {
        day.to_string()
    }
}

/// A calendar quarter, rendered as `YYYY-Qn`. Keys the community progress counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QuarterKey {
    year: i32,
    quarter: u8,
}

impl QuarterKey {
    pub fn new(year: i32, quarter: u8) -> Result<Self, TerraError> {
        if !(1..=4).contains(&quarter) {
            return Err(TerraError::InvalidQuarterKey(format!("{year}-Q{quarter}")));
        }
        Ok(Self { year, quarter })
    }

    pub fn from_day(day: DayKey) -> Self {
        let date = day.date();
        Self {
            year: date.year(),
            quarter: (date.month0() / 3 + 1) as u8,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn quarter(&self) -> u8 {
        self.quarter
    }
}

impl fmt::Display for QuarterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-Q{}", self.year, self.quarter)
    }
}

impl FromStr for QuarterKey {
    type Err = TerraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TerraError::InvalidQuarterKey(s.to_string());
        let (year, quarter) = s.split_once("-Q").ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let quarter: u8 = quarter.parse().map_err(|_| invalid())?;
        Self::new(year, quarter).map_err(|_| invalid())
    }
}

impl TryFrom<String> for QuarterKey {
    type Error = TerraError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<QuarterKey> for String {
    fn from(q: QuarterKey) -> Self {
        q.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2026-10-14T23:30:00Z
    const LATE_EVENING_UTC: u64 = 1_792_020_600;

    #[test]
    fn day_key_formats_as_iso_date() {
        let day = DayKey::from_ymd(2026, 3, 7).unwrap();
        assert_eq!(day.to_string(), "2026-03-07");
        assert_eq!("2026-03-07".parse::<DayKey>().unwrap(), day);
    }

    #[test]
    fn unpadded_day_key_is_rejected() {
        assert!("2026-3-7".parse::<DayKey>().is_err());
        assert!("not-a-day".parse::<DayKey>().is_err());
    }

    #[test]
    fn day_derives_from_timestamp_and_offset() {
        let ts = Timestamp::new(LATE_EVENING_UTC);
        let utc = DayKey::from_timestamp(ts, 0).unwrap();
        assert_eq!(utc.to_string(), "2026-10-14");

        // One hour east of UTC it is already tomorrow.
        let east = DayKey::from_timestamp(ts, 3600).unwrap();
        assert_eq!(east.to_string(), "2026-10-15");

        let west = DayKey::from_timestamp(ts, -8 * 3600).unwrap();
        assert_eq!(west.to_string(), "2026-10-14");
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        let err = DayKey::from_timestamp(Timestamp::new(0), 90_000).unwrap_err();
        assert_eq!(err, TerraError::InvalidUtcOffset(90_000));
    }

    #[test]
    fn quarter_from_day() {
        let q = DayKey::from_ymd(2026, 10, 14).unwrap().quarter();
        assert_eq!(q.to_string(), "2026-Q4");
        assert_eq!(DayKey::from_ymd(2026, 1, 1).unwrap().quarter().quarter(), 1);
        assert_eq!(DayKey::from_ymd(2026, 6, 30).unwrap().quarter().quarter(), 2);
        assert_eq!(DayKey::from_ymd(2026, 7, 1).unwrap().quarter().quarter(), 3);
    }

    #[test]
    fn quarter_key_parses() {
        let q: QuarterKey = "2025-Q2".parse().unwrap();
        assert_eq!((q.year(), q.quarter()), (2025, 2));
        assert!("2025-Q5".parse::<QuarterKey>().is_err());
        assert!("2025Q1".parse::<QuarterKey>().is_err());
    }

    #[test]
    fn day_key_serializes_as_string() {
        let day = DayKey::from_ymd(2026, 10, 14).unwrap();
        assert_eq!(serde_json::to_string(&day).unwrap(), "\"2026-10-14\"");
    }
}
