//! Wire time format helpers
//!
//! The remote service emits timestamps as `yyyy-MM-dd'T'HH:mm:ss.SSSSSSZ`.
//! Current server revisions emit RFC 3339 with an explicit offset; an older
//! revision emitted the fractional form with no offset at all. Both are
//! accepted on decode.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Serde adapter for diary/furniture `created_at`-style wire timestamps.
///
/// Use with `#[serde(with = "roomtone_common::time::wire_datetime")]`.
pub mod wire_datetime {
    use super::*;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_wire_datetime(&s).map_err(serde::de::Error::custom)
    }
}

/// Parse a wire timestamp, tolerating both offset and offset-less forms.
pub fn parse_wire_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    // Fallback: fractional seconds, no offset (treated as UTC)
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid wire timestamp {s:?}: {e}"))
}
