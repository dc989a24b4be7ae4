//! Time formatting helpers.

use chrono::DateTime;
use forge_types::Timestamp;

/// Format a duration in seconds to a human-readable string.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// Render a timestamp as `YYYY-MM-DDTHH:MM:SS` (UTC).
///
/// Seconds beyond the calendar range are rendered as the raw number.
pub fn format_timestamp(ts: Timestamp) -> String {
    let secs = ts.as_secs();
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_else(|| secs.to_string())
}
