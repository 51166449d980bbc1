//! Recognized date-time formats and format resolution over sampled values.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    Rfc3339,
    SqlDateTime,
    IsoDateTime,
    IsoDate,
    UsDateTime,
    UsDate,
    Rfc2822,
}

/// Resolution order; the first format accepting every sample wins.
pub const RECOGNIZED_FORMATS: [DateFormat; 7] = [
    DateFormat::Rfc3339,
    DateFormat::SqlDateTime,
    DateFormat::IsoDateTime,
    DateFormat::IsoDate,
    DateFormat::UsDateTime,
    DateFormat::UsDate,
    DateFormat::Rfc2822,
];

const SQL_DATE_TIME: &str = "%Y-%m-%d %H:%M:%S";
const ISO_DATE_TIME: &str = "%Y-%m-%dT%H:%M:%S";
const ISO_DATE: &str = "%Y-%m-%d";
const US_DATE_TIME: &str = "%m/%d/%Y %H:%M:%S";
const US_DATE: &str = "%m/%d/%Y";

impl DateFormat {
    /// Format string as written into an Elasticsearch-style mapping.
    pub fn pattern(self) -> &'static str {
        match self {
            Self::Rfc3339 => "strict_date_optional_time",
            Self::SqlDateTime => "yyyy-MM-dd HH:mm:ss",
            Self::IsoDateTime => "yyyy-MM-dd'T'HH:mm:ss",
            Self::IsoDate => "yyyy-MM-dd",
            Self::UsDateTime => "MM/dd/yyyy HH:mm:ss z",
            Self::UsDate => "MM/dd/yyyy",
            Self::Rfc2822 => "EEE, dd MMM yyyy HH:mm:ss Z",
        }
    }

    /// Parses `raw` under this format. Naive values are taken as UTC.
    pub fn parse(self, raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        match self {
            Self::Rfc3339 => DateTime::parse_from_rfc3339(raw).ok().map(|d| d.with_timezone(&Utc)),
            Self::Rfc2822 => DateTime::parse_from_rfc2822(raw).ok().map(|d| d.with_timezone(&Utc)),
            Self::SqlDateTime => naive_utc(raw, SQL_DATE_TIME),
            Self::IsoDateTime => naive_utc(raw, ISO_DATE_TIME),
            Self::IsoDate => date_utc(raw, ISO_DATE),
            Self::UsDateTime => parse_us_date_time(raw),
            Self::UsDate => date_utc(raw, US_DATE),
        }
    }

    /// Finds the first recognized format that parses every non-empty sample.
    ///
    /// Returns `None` when there is no non-empty sample or when the samples
    /// disagree on format.
    pub fn resolve<S: AsRef<str>>(samples: &[S]) -> Option<Self> {
        let values: Vec<&str> = samples
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| !s.is_empty())
            .collect();
        if values.is_empty() {
            return None;
        }
        RECOGNIZED_FORMATS
            .into_iter()
            .find(|format| values.iter().all(|v| format.parse(v).is_some()))
    }
}

fn naive_utc(raw: &str, pattern: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, pattern)
        .ok()
        .map(|n| Utc.from_utc_datetime(&n))
}

fn date_utc(raw: &str, pattern: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(raw, pattern).ok()?;
    date.and_hms_opt(0, 0, 0).map(|n| Utc.from_utc_datetime(&n))
}

/// `MM/DD/YYYY HH:MM:SS`, optionally followed by a zone abbreviation.
fn parse_us_date_time(raw: &str) -> Option<DateTime<Utc>> {
    let (body, offset) = match raw.rsplit_once(char::is_whitespace) {
        Some((body, zone)) if zone.chars().all(|c| c.is_ascii_alphabetic()) => {
            (body.trim_end(), zone_offset(zone)?)
        }
        _ => (raw, FixedOffset::east_opt(0)?),
    };
    let naive = NaiveDateTime::parse_from_str(body, US_DATE_TIME).ok()?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|d| d.with_timezone(&Utc))
}

fn zone_offset(zone: &str) -> Option<FixedOffset> {
    let hours = match zone.to_ascii_uppercase().as_str() {
        "UTC" | "GMT" | "Z" => 0,
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        _ => return None,
    };
    FixedOffset::east_opt(hours * 3600)
}
