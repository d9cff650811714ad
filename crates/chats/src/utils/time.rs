//! Timestamp handling. Stored as UTC RFC 3339 text with microseconds so that
//! lexical order matches chronological order.

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};

use crate::types::ChatResult;

pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(value: &str) -> ChatResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

/// A timestamp strictly after `latest`, or `now` when that already is.
pub fn next_timestamp(now: DateTime<Utc>, latest: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match latest {
        Some(latest) if latest >= now => latest + Duration::microseconds(1),
        _ => now,
    }
}
