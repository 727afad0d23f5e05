// ===============================
// src/format.rs (display helpers shared by the panels)
// ===============================
use chrono::{DateTime, Local, SecondsFormat, TimeZone, Utc};

pub fn format_quantity(n: i64) -> String {
    let abs = n.unsigned_abs();
    if abs >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if abs >= 1_000 {
        format!("{:.0}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

pub fn format_price(px: f64) -> String {
    format!("{px:.4}")
}

/// HH:MM:SS in local time.
pub fn format_time(ts_ms: u64) -> String {
    match Local.timestamp_millis_opt(ts_ms as i64).single() {
        Some(t) => t.format("%H:%M:%S").to_string(),
        None => "--".to_string(),
    }
}

/// ISO-8601 UTC with milliseconds, e.g. `2024-01-01T00:00:00.000Z`.
pub fn format_iso(ts_ms: u64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts_ms as i64)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

/// Long ids are shortened to `1234..6789`.
pub fn format_id(id: u64) -> String {
    let s = id.to_string();
    if s.len() <= 8 {
        return s;
    }
    format!("{}..{}", &s[..4], &s[s.len() - 4..])
}

pub fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}
