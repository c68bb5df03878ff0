//! Timestamp handling for sidecar records and filter bounds.
//!
//! Sidecars store timestamps as text with an explicit timezone offset:
//! `2024-03-01 09:15:00.000000+01:00`. Parsing is lenient so that older
//! sidecars (RFC 3339, `T` separator, no offset) still load; rendering
//! always produces the canonical format.

use std::fmt;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, SubsecRound, TimeZone, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{FilesetError, Result};

/// Canonical sidecar timestamp format.
pub const SIDECAR_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f%:z";

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M:%S%.f%#z",
];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A timestamp with a fixed timezone offset.
///
/// Equality and ordering compare instants, so the same moment expressed in
/// two offsets is equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SidecarTimestamp(DateTime<FixedOffset>);

impl SidecarTimestamp {
    pub fn new(value: DateTime<FixedOffset>) -> Self {
        Self(value)
    }

    /// Current time in the server's local offset, at microsecond precision.
    pub fn now_local() -> Self {
        Self(DateTime::<FixedOffset>::from(Local::now().trunc_subsecs(6)))
    }

    /// 1970-01-01 00:00:00 UTC, used when a sidecar has no creation time.
    pub fn epoch() -> Self {
        Self::utc_constant(1970, 1, 1, 0, 0, 0)
    }

    /// Far-future value meaning "not removed".
    pub fn removed_sentinel() -> Self {
        Self::utc_constant(9999, 12, 31, 23, 59, 59)
    }

    fn utc_constant(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        let naive = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, min, sec))
            .unwrap_or_default();
        Self::from_naive_utc(naive)
    }

    /// Parses any of the accepted textual forms.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(FilesetError::InvalidInput(
                "timestamp requires a value".to_string(),
            ));
        }

        for format in OFFSET_FORMATS {
            if let Ok(value) = DateTime::parse_from_str(trimmed, format) {
                return Ok(Self(value));
            }
        }
        if let Ok(value) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self(value));
        }
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(Self::from_naive_utc(naive));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Ok(Self::from_naive_utc(naive));
            }
        }

        Err(FilesetError::InvalidInput(format!(
            "unrecognised timestamp: {raw}"
        )))
    }

    fn from_naive_utc(naive: NaiveDateTime) -> Self {
        Self(DateTime::<FixedOffset>::from(Utc.from_utc_datetime(&naive)))
    }

    pub fn as_datetime(&self) -> &DateTime<FixedOffset> {
        &self.0
    }

    /// Renders the canonical sidecar text.
    pub fn render(&self) -> String {
        self.0.format(SIDECAR_TIMESTAMP_FORMAT).to_string()
    }
}

impl fmt::Display for SidecarTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl Serialize for SidecarTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.render())
    }
}

impl<'de> Deserialize<'de> for SidecarTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct TimestampVisitor;

        impl Visitor<'_> for TimestampVisitor {
            type Value = SidecarTimestamp;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a timestamp string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Self::Value, E> {
                SidecarTimestamp::parse(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(TimestampVisitor)
    }
}

/// One side of a `created_after` / `created_before` range.
///
/// The infinities are accepted as the literal strings `-infinity` and
/// `infinity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBound {
    NegInfinity,
    Infinity,
    At(SidecarTimestamp),
}

impl TimeBound {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim() {
            "-infinity" => Ok(Self::NegInfinity),
            "infinity" | "+infinity" => Ok(Self::Infinity),
            other => SidecarTimestamp::parse(other).map(Self::At),
        }
    }
}

impl fmt::Display for TimeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegInfinity => f.write_str("-infinity"),
            Self::Infinity => f.write_str("infinity"),
            Self::At(value) => value.fmt(f),
        }
    }
}

impl Serialize for TimeBound {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeBound {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TimeBound::parse(&raw).map_err(de::Error::custom)
    }
}
