//! Stamp count reconciliation.

use crate::schema::RawExtraction;

/// Decide how many stamps the habit needs.
///
/// Precedence:
/// 1. a daily habit over a known period gets one stamp per day, whatever
///    `total_stamps` says;
/// 2. an explicit positive total;
/// 3. one stamp per day of a known period;
/// 4. zero.
pub fn reconcile(raw: &RawExtraction, time_period_days: i64) -> i64 {
    let stamps = if raw.is_daily && time_period_days > 0 {
        time_period_days
    } else if let Some(total) = raw.total_stamps.filter(|t| *t > 0) {
        total
    } else if time_period_days > 0 {
        time_period_days
    } else {
        0
    };
    stamps.max(0)
}
