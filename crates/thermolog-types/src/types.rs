//! Core types for thermolog temperature series.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Date, Month, OffsetDateTime};

use crate::error::{ParseError, ParseResult};

/// Calendar day that partitions an entity's series into day files.
///
/// A day key renders as `YYYY-MM-DD`. Ordering follows the calendar, which
/// for four-digit years is the same as comparing the rendered strings.
///
/// # Examples
///
/// ```
/// use thermolog_types::DayKey;
///
/// let a: DayKey = "2021-11-27".parse().unwrap();
/// let b: DayKey = "2021-11-28".parse().unwrap();
/// assert!(a < b);
/// assert_eq!(b.to_string(), "2021-11-28");
/// assert!("2021-13-01".parse::<DayKey>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(Date);

impl DayKey {
    /// Length of the textual form (`YYYY-MM-DD`).
    pub const LEN: usize = 10;

    /// Wrap a calendar date.
    #[must_use]
    pub fn new(date: Date) -> Self {
        Self(date)
    }

    /// Day key of a timestamp, taken in the timestamp's own offset.
    ///
    /// This matches the date portion of the timestamp's RFC 3339 form,
    /// i.e. everything before the `T`.
    #[must_use]
    pub fn from_timestamp(timestamp: OffsetDateTime) -> Self {
        Self(timestamp.date())
    }

    /// Day key for the current UTC date.
    #[must_use]
    pub fn today() -> Self {
        Self::from_timestamp(OffsetDateTime::now_utc())
    }

    /// The wrapped calendar date.
    #[must_use]
    pub fn date(&self) -> Date {
        self.0
    }

    /// Parse a strict `YYYY-MM-DD` string.
    pub fn parse(s: &str) -> ParseResult<Self> {
        let invalid = || ParseError::InvalidDayKey(s.to_string());

        let bytes = s.as_bytes();
        if bytes.len() != Self::LEN || bytes[4] != b'-' || bytes[7] != b'-' {
            return Err(invalid());
        }

        let digits = |range: core::ops::Range<usize>| -> ParseResult<u32> {
            let part = &s[range];
            if !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };

        let year = digits(0..4)? as i32;
        let month = Month::try_from(digits(5..7)? as u8).map_err(|_| invalid())?;
        let day = digits(8..10)? as u8;

        Date::from_calendar_date(year, month, day)
            .map(Self)
            .map_err(|_| invalid())
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }
}

impl FromStr for DayKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Date> for DayKey {
    fn from(date: Date) -> Self {
        Self(date)
    }
}

#[cfg(feature = "serde")]
impl Serialize for DayKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for DayKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Check that an entity id maps to exactly one directory under a base path.
///
/// Ids must be non-empty, must not be `.` or `..`, and must not contain
/// path separators or NUL bytes.
///
/// # Examples
///
/// ```
/// use thermolog_types::validate_entity_id;
///
/// assert!(validate_entity_id("norte-a").is_ok());
/// assert!(validate_entity_id("").is_err());
/// assert!(validate_entity_id("../etc").is_err());
/// ```
pub fn validate_entity_id(id: &str) -> ParseResult<()> {
    let reject = |reason| {
        Err(ParseError::InvalidEntityId {
            id: id.to_string(),
            reason,
        })
    };

    if id.is_empty() {
        return reject("id cannot be empty");
    }
    if id == "." || id == ".." {
        return reject("id cannot be a relative path component");
    }
    if id.contains(['/', '\\', '\0']) {
        return reject("id cannot contain path separators or NUL");
    }

    Ok(())
}

/// A single temperature measurement for one entity.
///
/// Readings are immutable once written. The ingestion path builds them with
/// [`Reading::now`], which stamps the current UTC instant.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// Entity (sensor) identifier.
    pub id: String,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// When the measurement was received.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
}

impl Reading {
    /// Create a reading with an explicit timestamp.
    pub fn new(id: impl Into<String>, temperature: f64, timestamp: OffsetDateTime) -> Self {
        Self {
            id: id.into(),
            temperature,
            timestamp,
        }
    }

    /// Create a reading stamped with the current UTC instant.
    pub fn now(id: impl Into<String>, temperature: f64) -> Self {
        Self::new(id, temperature, OffsetDateTime::now_utc())
    }

    /// Day file this reading belongs to.
    #[must_use]
    pub fn day_key(&self) -> DayKey {
        DayKey::from_timestamp(self.timestamp)
    }
}
