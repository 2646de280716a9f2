//! Date resolution: turn an extracted target date into an inclusive day count.
//!
//! All arithmetic happens on `NaiveDate`, so counts are calendar days and never
//! drift across daylight-saving transitions.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::schema::TargetDate;

/// The "today" snapshot for one extraction call, already normalized to a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReferenceDate(NaiveDate);

impl ReferenceDate {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Capture today's date as seen in the given IANA time zone.
    pub fn today_in(tz: Tz) -> Self {
        Self::at(Utc::now(), tz)
    }

    /// The local calendar date of `now` in `tz`.
    pub fn at(now: DateTime<Utc>, tz: Tz) -> Self {
        Self(now.with_timezone(&tz).date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

/// A duration phrase already reduced to a unit and a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
    Days(u32),
    Weeks(u32),
    Months(u32),
}

/// Whole calendar days from `b` to `a` (positive when `a` is later).
pub fn calendar_day_difference(a: NaiveDate, b: NaiveDate) -> i64 {
    a.signed_duration_since(b).num_days()
}

/// Last day of a window that starts on `today` and lasts `span`, counted
/// inclusively: "for 30 days" starting today ends 29 days later.
pub fn window_end(today: ReferenceDate, span: Span) -> Option<NaiveDate> {
    let start = today.date();
    let past_end = match span {
        Span::Days(0) | Span::Weeks(0) | Span::Months(0) => return None,
        Span::Days(n) => start.checked_add_days(Days::new(n as u64)),
        Span::Weeks(n) => start.checked_add_days(Days::new(n as u64 * 7)),
        Span::Months(n) => start.checked_add_months(Months::new(n)),
    }?;
    past_end.pred_opt()
}

/// Pick the year for a month/day given without one.
///
/// Tries the current year first; if that occurrence is already past, or does
/// not exist (Feb 29 outside a leap year), tries the next year.
pub fn infer_year(month: u32, day: u32, today: ReferenceDate) -> Option<NaiveDate> {
    let year = today.date().year();
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(d) if d >= today.date() => Some(d),
        _ => NaiveDate::from_ymd_opt(year + 1, month, day),
    }
}

/// Inclusive number of days from `today` through the target date.
///
/// Absent, unresolvable, or past targets resolve to 0.
pub fn resolve_period(target: Option<&TargetDate>, today: ReferenceDate) -> i64 {
    let date = match target {
        None => return 0,
        Some(TargetDate::Full(d)) => Some(*d),
        Some(TargetDate::MonthDay { month, day }) => infer_year(*month, *day, today),
    };
    let Some(date) = date else {
        tracing::warn!(?target, "target date has no valid calendar occurrence");
        return 0;
    };

    let raw_days = calendar_day_difference(date, today.date());
    if raw_days < 0 {
        tracing::warn!(%date, today = %today.date(), "target date is in the past; period unresolved");
        return 0;
    }
    raw_days + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> ReferenceDate {
        ReferenceDate::from_date(ymd(2026, 10, 19))
    }

    #[test]
    fn absent_target_is_zero() {
        assert_eq!(resolve_period(None, today()), 0);
    }

    #[test]
    fn target_today_counts_one_day() {
        let t = TargetDate::Full(ymd(2026, 10, 19));
        assert_eq!(resolve_period(Some(&t), today()), 1);
    }

    #[test]
    fn end_date_is_inclusive() {
        let t = TargetDate::Full(ymd(2026, 10, 30));
        assert_eq!(resolve_period(Some(&t), today()), 12);
    }

    #[test]
    fn past_full_date_is_zero() {
        let t = TargetDate::Full(ymd(2025, 10, 30));
        assert_eq!(resolve_period(Some(&t), today()), 0);
        let yesterday = TargetDate::Full(ymd(2026, 10, 18));
        assert_eq!(resolve_period(Some(&yesterday), today()), 0);
    }

    #[test]
    fn crosses_year_boundary() {
        let t = TargetDate::Full(ymd(2027, 1, 1));
        assert_eq!(resolve_period(Some(&t), today()), 75);
    }

    #[test]
    fn dst_transition_does_not_shift_count() {
        // US clocks fall back on 2026-11-01.
        let now = chrono_tz::America::Chicago
            .with_ymd_and_hms(2026, 10, 31, 23, 30, 0)
            .unwrap()
            .with_timezone(&Utc);
        let today = ReferenceDate::at(now, chrono_tz::America::Chicago);
        assert_eq!(today.date(), ymd(2026, 10, 31));

        let t = TargetDate::Full(ymd(2026, 11, 2));
        assert_eq!(resolve_period(Some(&t), today), 3);
    }

    #[test]
    fn reference_date_uses_local_calendar_day() {
        // 03:00 UTC is still the previous evening in Chicago.
        let now = Utc.with_ymd_and_hms(2026, 10, 20, 3, 0, 0).unwrap();
        let today = ReferenceDate::at(now, chrono_tz::America::Chicago);
        assert_eq!(today.date(), ymd(2026, 10, 19));
    }

    #[test]
    fn yearless_future_date_stays_in_current_year() {
        let t = TargetDate::MonthDay { month: 10, day: 30 };
        assert_eq!(resolve_period(Some(&t), today()), 12);
    }

    #[test]
    fn yearless_past_date_rolls_to_next_year() {
        let t = TargetDate::MonthDay { month: 9, day: 7 };
        let days = resolve_period(Some(&t), today());
        assert!(days > 0);
        assert_eq!(days, calendar_day_difference(ymd(2027, 9, 7), today().date()) + 1);
    }

    #[test]
    fn leap_day_without_year_finds_next_valid_year() {
        let t = TargetDate::MonthDay { month: 2, day: 29 };
        // 2027 is not a leap year either.
        assert_eq!(resolve_period(Some(&t), today()), 0);

        let in_2027 = ReferenceDate::from_date(ymd(2027, 3, 1));
        assert_eq!(infer_year(2, 29, in_2027), Some(ymd(2028, 2, 29)));
    }

    #[test]
    fn window_end_is_last_inclusive_day() {
        assert_eq!(window_end(today(), Span::Days(30)), Some(ymd(2026, 11, 17)));
        assert_eq!(window_end(today(), Span::Weeks(2)), Some(ymd(2026, 11, 1)));
        assert_eq!(window_end(today(), Span::Months(2)), Some(ymd(2026, 12, 18)));
        assert_eq!(window_end(today(), Span::Days(0)), None);
    }

    #[test]
    fn window_end_round_trips_to_span_length() {
        let end = window_end(today(), Span::Days(30)).unwrap();
        let t = TargetDate::Full(end);
        assert_eq!(resolve_period(Some(&t), today()), 30);

        let end = window_end(today(), Span::Months(2)).unwrap();
        let t = TargetDate::Full(end);
        assert_eq!(resolve_period(Some(&t), today()), 61);
    }
}
