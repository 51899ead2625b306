//! Epoch seconds and how they are shown to people.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Shown in place of an absent claim.
pub const NOT_SPECIFIED: &str = "Not specified";
/// Shown in place of an absent expiry.
pub const NEVER: &str = "Never";
/// Shown for a timestamp that can not be represented.
pub const INVALID_DATE: &str = "Invalid Date";

/// The current time in epoch seconds.
pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// Render epoch seconds as `YYYY-MM-DD HH:MM:SS UTC`.
pub fn display(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| INVALID_DATE.to_string())
}

/// Read a time claim as whole epoch seconds. Fractional values are truncated,
/// anything that is not a number is treated as absent.
pub(crate) fn claim_secs(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        other => {
            debug!(?other, "time claim is not a number");
            None
        }
    }
}
