use chrono::{DateTime, SecondsFormat, Utc};

/// Returns the current Unix timestamp in milliseconds.
pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

/// Parses an RFC 3339 timestamp into UTC; blank or malformed text yields `None`.
pub fn parse_rfc3339_utc(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|value| value.with_timezone(&Utc))
}

/// Formats a UTC instant as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn format_rfc3339_seconds(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Latest parseable timestamp among `values`, or `None` when nothing parses.
pub fn latest_timestamp<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<DateTime<Utc>> {
    values.into_iter().filter_map(parse_rfc3339_utc).max()
}
