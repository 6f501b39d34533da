use chrono::{DateTime, Utc};
use crossterm::style::{Color, Stylize};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use std::hash::{Hash, Hasher};

pub const NONE: &str = "<none>";

/// Convert an API timestamp to chrono via its RFC 3339 wire form.
pub fn to_datetime(time: &Time) -> Option<DateTime<Utc>> {
    let value = serde_json::to_value(time).ok()?;
    let text = value.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Compact kubectl-style duration: `42s`, `7m`, `3h`, `12d`.
pub fn format_duration(duration: chrono::Duration) -> String {
    let total_secs = duration.num_seconds().max(0);
    if total_secs < 60 {
        format!("{}s", total_secs)
    } else if total_secs < 3600 {
        format!("{}m", total_secs / 60)
    } else if total_secs < 86400 {
        format!("{}h", total_secs / 3600)
    } else {
        format!("{}d", total_secs / 86400)
    }
}

/// Age of a resource relative to `now`, `<unknown>` without a timestamp.
pub fn format_age(created: Option<&Time>, now: DateTime<Utc>) -> String {
    created
        .and_then(to_datetime)
        .map(|t| format_duration(now.signed_duration_since(t)))
        .unwrap_or_else(|| "<unknown>".to_string())
}

/// Join non-empty items with `sep`, or `<none>`.
pub fn join_or_none<I, S>(items: I, sep: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parts: Vec<String> = items
        .into_iter()
        .filter(|s| !s.as_ref().is_empty())
        .map(|s| s.as_ref().to_string())
        .collect();
    if parts.is_empty() {
        NONE.to_string()
    } else {
        parts.join(sep)
    }
}

/// Generate a color for a string based on hash.
pub fn get_color(s: &str) -> Color {
    let colors = [
        Color::Red,
        Color::Green,
        Color::Blue,
        Color::Yellow,
        Color::Magenta,
        Color::Cyan,
        Color::AnsiValue(91),
        Color::AnsiValue(92),
        Color::AnsiValue(94),
        Color::AnsiValue(93),
        Color::AnsiValue(95),
        Color::AnsiValue(96),
    ];
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    let hash = hasher.finish() as u32;
    colors[(hash % colors.len() as u32) as usize]
}

/// Section header printed before each pod's log lines.
pub fn log_header(pod: &str, namespace: &str, color: bool) -> String {
    let header = format!("--- Logs for pod: {} (namespace: {}) ---", pod, namespace);
    if color {
        header.with(get_color(pod)).to_string()
    } else {
        header
    }
}
