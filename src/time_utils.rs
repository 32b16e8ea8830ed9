// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for vendor date/time formats.
//!
//! The API is inconsistent about timestamps: most are RFC3339, some are
//! naive ISO strings (implicitly UTC), and a few fields are raw epoch
//! seconds. Everything is normalized to UTC here and localized to the
//! account timezone at the accessor layer.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

/// Wire format for trend query date bounds.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a vendor timestamp string. Naive datetimes are assumed UTC.
pub fn parse_vendor_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    // Some endpoints drop the timezone suffix entirely
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Parse a vendor timestamp and localize it to the account timezone.
pub fn parse_to_local(value: &str, tz: Tz) -> Option<DateTime<Tz>> {
    parse_vendor_datetime(value).map(|dt| dt.with_timezone(&tz))
}

/// Convert epoch seconds to a localized datetime.
pub fn epoch_to_local(secs: i64, tz: Tz) -> Option<DateTime<Tz>> {
    DateTime::<Utc>::from_timestamp(secs, 0).map(|dt| dt.with_timezone(&tz))
}

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format a UTC timestamp the way the away-mode endpoint expects it
/// (millisecond precision, `Z` suffix).
pub fn format_away_timestamp(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
