//! Presentation helpers: HTML escaping, relative times, compact counts.

use std::fmt::Display;

use chrono::{DateTime, NaiveDateTime, Utc};

/// Shown in place of a missing timestamp.
pub const PLACEHOLDER: &str = "-";

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;

/// Escape text for insertion into HTML.
///
/// `&` goes first so the entities produced by later substitutions are not
/// escaped a second time.
pub fn escape_html(text: impl Display) -> String {
    text.to_string()
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// "just now", "5m ago", "3h ago", "2d ago", or "Jan 5" for older timestamps.
pub fn relative_time(timestamp: Option<&str>) -> String {
    relative_time_at(timestamp, Utc::now())
}

/// `relative_time` against an explicit clock.
pub fn relative_time_at(timestamp: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(raw) = timestamp.map(str::trim).filter(|t| !t.is_empty()) else {
        return PLACEHOLDER.to_string();
    };
    let Some(then) = parse_timestamp(raw) else {
        log::debug!("Unparseable timestamp: {}", raw);
        return PLACEHOLDER.to_string();
    };

    let secs = (now - then).num_seconds();
    if secs < MINUTE {
        "just now".to_string()
    } else if secs < HOUR {
        format!("{}m ago", secs / MINUTE)
    } else if secs < DAY {
        format!("{}h ago", secs / HOUR)
    } else if secs < WEEK {
        format!("{}d ago", secs / DAY)
    } else {
        then.format("%b %-d").to_string()
    }
}

/// RFC 3339, or a naive ISO-8601 date-time which the server emits in UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// 1234 -> "1.2K", 2_500_000 -> "2.5M", 999 -> "999".
pub fn abbreviate(n: i64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}
