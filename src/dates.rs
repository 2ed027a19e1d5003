//! Date parsing and canonical serialization.
//!
//! Authors write dates the way humans do: `2016-09-29T18:00:00-0700`,
//! `28 Sept 2016`, `2016-09-28`. This module parses all of them with a
//! fixed candidate-format list and reconciles the result against the
//! site's configured IANA timezone:
//!
//! - A value that carries its own offset is converted to the site zone,
//!   preserving the instant.
//! - A naive value is localized into the site zone.
//!
//! ## Canonical form
//!
//! Everything serializes as ISO-8601 with the reconciled offset:
//! fractional seconds are omitted when zero and truncated to millisecond
//! precision otherwise, and a zero offset is rendered as `Z`:
//!
//! ```text
//! 2016-09-28T00:00:00-04:00
//! 2016-09-29T18:00:00.250-07:00
//! 2017-01-01T12:00:00Z
//! ```
//!
//! Parsing the canonical form back yields an equal value, so
//! normalization is idempotent across rebuilds.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serializer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DateError {
    #[error("unrecognized date value: {0:?}")]
    Unrecognized(String),
    #[error("{0:?} does not exist in the target timezone")]
    Nonexistent(String),
}

/// Formats tried for values that include a time-of-day but no offset.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Formats tried for date-only values (midnight is assumed).
const NAIVE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%m/%d/%Y",
];

/// Parse a loosely-formatted date string and reconcile it with `zone`.
///
/// Offset-carrying values are converted to `zone` (same instant, site
/// offset); naive values are localized. Ambiguous local times (DST fold)
/// resolve to the earlier instant.
pub fn parse_lenient(raw: &str, zone: Tz) -> Result<DateTime<FixedOffset>, DateError> {
    let raw = raw.trim();

    // Offset-aware forms first: RFC 3339, then the common colonless offset.
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&zone).fixed_offset());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Ok(dt.with_timezone(&zone).fixed_offset());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%z") {
        return Ok(dt.with_timezone(&zone).fixed_offset());
    }

    let cleaned = normalize_month_tokens(raw);

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return localize(naive, zone, raw);
        }
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
            // Date-only values mean midnight, local to the site zone.
            let naive = date
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| DateError::Unrecognized(raw.to_string()))?;
            return localize(naive, zone, raw);
        }
    }

    Err(DateError::Unrecognized(raw.to_string()))
}

fn localize(naive: NaiveDateTime, zone: Tz, raw: &str) -> Result<DateTime<FixedOffset>, DateError> {
    zone.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| DateError::Nonexistent(raw.to_string()))
}

/// Month-name cleanup for the odd abbreviations chrono's `%b` rejects.
/// The common offender is the four-letter `Sept` (with or without a
/// trailing period).
fn normalize_month_tokens(raw: &str) -> String {
    raw.split_whitespace()
        .map(|token| {
            let bare = token.trim_end_matches('.');
            if bare.eq_ignore_ascii_case("sept") {
                "Sep"
            } else {
                token
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a datetime in the canonical record form.
pub fn format_iso(dt: &DateTime<FixedOffset>) -> String {
    let mut out = if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
    } else {
        // %.3f truncates (not rounds) to millisecond precision.
        dt.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
    };
    if out.ends_with("+00:00") {
        out.truncate(out.len() - 6);
        out.push('Z');
    }
    out
}

/// Parse the canonical record form back into a datetime.
pub fn parse_iso(raw: &str) -> Result<DateTime<FixedOffset>, DateError> {
    DateTime::parse_from_rfc3339(raw).map_err(|_| DateError::Unrecognized(raw.to_string()))
}

/// Serde adapter for `Option<DateTime<FixedOffset>>` fields using the
/// canonical form. Pair with `#[serde(default, skip_serializing_if =
/// "Option::is_none")]`.
pub mod iso_opt {
    use super::*;

    pub fn serialize<S>(
        value: &Option<DateTime<FixedOffset>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&format_iso(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(s) => parse_iso(&s).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;

    fn zone(name: &str) -> Tz {
        name.parse().unwrap()
    }

    // =========================================================================
    // parse_lenient: offset-aware inputs
    // =========================================================================

    #[test]
    fn aware_rfc3339_converted_to_site_zone() {
        let dt = parse_lenient("2016-09-29T18:00:00-07:00", zone("America/New_York")).unwrap();
        // Same instant, New York offset.
        assert_eq!(format_iso(&dt), "2016-09-29T21:00:00-04:00");
    }

    #[test]
    fn aware_colonless_offset_parses() {
        let dt = parse_lenient("2016-09-29T18:00:00-0700", zone("America/Los_Angeles")).unwrap();
        assert_eq!(format_iso(&dt), "2016-09-29T18:00:00-07:00");
    }

    #[test]
    fn aware_utc_renders_z_suffix() {
        let dt = parse_lenient("2017-01-01T12:00:00+00:00", zone("UTC")).unwrap();
        assert_eq!(format_iso(&dt), "2017-01-01T12:00:00Z");
    }

    #[test]
    fn conversion_preserves_instant() {
        let a = parse_lenient("2016-09-29T18:00:00-0700", zone("America/New_York")).unwrap();
        let b = parse_lenient("2016-09-29T21:00:00-0400", zone("America/New_York")).unwrap();
        assert_eq!(a, b);
    }

    // =========================================================================
    // parse_lenient: naive inputs
    // =========================================================================

    #[test]
    fn naive_datetime_localized() {
        let dt = parse_lenient("2016-09-29T18:00:00", zone("America/New_York")).unwrap();
        assert_eq!(format_iso(&dt), "2016-09-29T18:00:00-04:00");
    }

    #[test]
    fn naive_date_is_midnight_local() {
        let dt = parse_lenient("2016-09-28", zone("America/New_York")).unwrap();
        assert_eq!(format_iso(&dt), "2016-09-28T00:00:00-04:00");
    }

    #[test]
    fn human_date_with_sept_abbreviation() {
        let dt = parse_lenient("28 Sept 2016", zone("America/New_York")).unwrap();
        assert_eq!(format_iso(&dt), "2016-09-28T00:00:00-04:00");
    }

    #[test]
    fn human_date_with_full_month_name() {
        let dt = parse_lenient("September 28, 2016", zone("UTC")).unwrap();
        assert_eq!(format_iso(&dt), "2016-09-28T00:00:00Z");
    }

    #[test]
    fn winter_date_uses_standard_offset() {
        let dt = parse_lenient("2016-01-15", zone("America/New_York")).unwrap();
        assert_eq!(format_iso(&dt), "2016-01-15T00:00:00-05:00");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_lenient("not a date", zone("UTC")).is_err());
        assert!(parse_lenient("", zone("UTC")).is_err());
    }

    // =========================================================================
    // format_iso / parse_iso round trip
    // =========================================================================

    #[test]
    fn fractional_seconds_truncated_to_millis() {
        let dt = DateTime::parse_from_rfc3339("2016-09-29T18:00:00.123456-07:00").unwrap();
        assert_eq!(format_iso(&dt), "2016-09-29T18:00:00.123-07:00");
    }

    #[test]
    fn canonical_form_round_trips() {
        for raw in ["2016-09-28T00:00:00-04:00", "2017-01-01T12:00:00Z"] {
            let dt = parse_iso(raw).unwrap();
            assert_eq!(format_iso(&dt), raw);
        }
    }

    #[test]
    fn reparsing_canonical_output_is_idempotent() {
        let first = parse_lenient("28 Sept 2016", zone("America/New_York")).unwrap();
        let rendered = format_iso(&first);
        let second = parse_lenient(&rendered, zone("America/New_York")).unwrap();
        assert_eq!(format_iso(&second), rendered);
    }
}
