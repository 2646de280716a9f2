//! The extraction pipeline: build, complete, validate, resolve, reconcile.

use std::future::Future;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::dates::{ReferenceDate, resolve_period};
use crate::error::{ExtractionError, TransportError, ValidationError};
use crate::prompt::{CompletionRequest, build_request};
use crate::quantity::reconcile;
use crate::schema::validate;

/// What the habit form receives: how many stamps, over how many days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub num_stamps: u32,
    pub time_period_days: u32,
}

fn clamp_u32(n: i64) -> u32 {
    n.clamp(0, u32::MAX as i64) as u32
}

impl ExtractionResult {
    /// Negative values clamp to zero.
    pub fn new(num_stamps: i64, time_period_days: i64) -> Self {
        Self {
            num_stamps: clamp_u32(num_stamps),
            time_period_days: clamp_u32(time_period_days),
        }
    }

    /// Zero in either field means the user has to fill it in by hand.
    pub fn needs_manual_entry(&self) -> bool {
        self.num_stamps == 0 || self.time_period_days == 0
    }
}

/// The external text-completion service.
///
/// `Ok(None)` means the service answered but produced nothing. Timeouts are the
/// client's business; they come back as [`TransportError::Timeout`].
pub trait CompletionClient {
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<Option<Value>, TransportError>> + Send;
}

/// Extract stamps and period from `condition`, with today taken in `tz`.
pub async fn extract_habit_details<C: CompletionClient>(
    client: &C,
    condition: &str,
    tz: Tz,
) -> Result<ExtractionResult, ExtractionError> {
    extract_habit_details_on(client, condition, ReferenceDate::today_in(tz)).await
}

/// Same as [`extract_habit_details`] against a fixed reference date.
pub async fn extract_habit_details_on<C: CompletionClient>(
    client: &C,
    condition: &str,
    today: ReferenceDate,
) -> Result<ExtractionResult, ExtractionError> {
    if condition.trim().is_empty() {
        return Err(ValidationError::new("condition", "non-empty text", "blank text").into());
    }

    let request = build_request(condition, today);
    debug!(today = %today.date(), condition = %request.condition, "requesting habit extraction");

    let response = client.complete(&request).await?;
    let raw = validate(response.as_ref())?;
    debug!(?raw, "validated extraction");

    let days = resolve_period(raw.target_date.as_ref(), today);
    let stamps = reconcile(&raw, days);
    let result = ExtractionResult::new(stamps, days);

    if result.needs_manual_entry() {
        warn!(
            num_stamps = result.num_stamps,
            time_period_days = result.time_period_days,
            "extraction incomplete; manual entry needed"
        );
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_negative_and_oversized() {
        assert_eq!(ExtractionResult::new(-4, -1), ExtractionResult { num_stamps: 0, time_period_days: 0 });
        assert_eq!(ExtractionResult::new(i64::MAX, 3).num_stamps, u32::MAX);
    }

    #[test]
    fn serializes_camel_case_contract() {
        let json = serde_json::to_value(ExtractionResult::new(5, 61)).unwrap();
        assert_eq!(json, serde_json::json!({"numStamps": 5, "timePeriodDays": 61}));
    }

    #[test]
    fn manual_entry_flag() {
        assert!(ExtractionResult::new(0, 10).needs_manual_entry());
        assert!(ExtractionResult::new(5, 0).needs_manual_entry());
        assert!(!ExtractionResult::new(5, 10).needs_manual_entry());
    }
}
