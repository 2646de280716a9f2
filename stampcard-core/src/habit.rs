//! Habit form state and stamp progress.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{ReferenceDate, Span, calendar_day_difference, window_end};
use crate::extract::ExtractionResult;

/// A habit being created or edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitDraft {
    pub condition: String,
    pub num_stamps: u32,
    pub end_date: Option<NaiveDate>,
    pub created_on: NaiveDate,
    /// Keep `num_stamps` equal to the number of days in the window.
    pub match_days: bool,
}

impl HabitDraft {
    pub fn new(created_on: NaiveDate) -> Self {
        Self {
            condition: String::new(),
            num_stamps: 0,
            end_date: None,
            created_on,
            match_days: false,
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    /// Inclusive days from creation through the end date; 0 without one.
    pub fn time_period_days(&self) -> u32 {
        let Some(end) = self.end_date else {
            return 0;
        };
        let days = calendar_day_difference(end, self.created_on) + 1;
        days.clamp(0, u32::MAX as i64) as u32
    }

    pub fn subtitle(&self) -> String {
        let days = self.time_period_days();
        if days == 1 {
            "1 day".to_string()
        } else {
            format!("{days} days")
        }
    }

    fn sync_stamps(&mut self) {
        let days = self.time_period_days();
        if self.match_days && days > 0 {
            self.num_stamps = days;
        }
    }

    pub fn set_end_date(&mut self, end_date: Option<NaiveDate>) {
        self.end_date = end_date;
        self.sync_stamps();
    }

    pub fn set_match_days(&mut self, on: bool) {
        self.match_days = on;
        self.sync_stamps();
    }

    /// A hand-entered count stops following the period.
    pub fn set_num_stamps(&mut self, num_stamps: u32) {
        self.match_days = false;
        self.num_stamps = num_stamps;
    }

    /// Fill the numeric fields from an extraction.
    ///
    /// The window is anchored at `created_on`, so `time_period_days()` equals
    /// the extracted period even when an older habit is edited. Zero-valued
    /// fields are left as they are for manual entry. `match_days` is kept.
    pub fn apply_extraction(&mut self, result: &ExtractionResult) {
        if result.time_period_days > 0 {
            let start = ReferenceDate::from_date(self.created_on);
            if let Some(end) = window_end(start, Span::Days(result.time_period_days)) {
                self.end_date = Some(end);
            }
        }
        if result.num_stamps > 0 {
            self.num_stamps = result.num_stamps;
        } else {
            self.sync_stamps();
        }
    }

    pub fn finish(self) -> Habit {
        let subtitle = self.subtitle();
        Habit {
            condition: self.condition,
            subtitle,
            num_stamps: self.num_stamps,
            created_on: self.created_on,
            end_date: self.end_date,
            stamped: BTreeSet::new(),
        }
    }
}

/// A saved habit card with its stamp grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub condition: String,
    pub subtitle: String,
    pub num_stamps: u32,
    pub created_on: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub stamped: BTreeSet<u32>,
}

impl Habit {
    /// Flip the stamp at `index`. Returns the new state, or `None` when the
    /// index is outside the grid.
    pub fn toggle_stamp(&mut self, index: u32) -> Option<bool> {
        if index >= self.num_stamps {
            return None;
        }
        if self.stamped.remove(&index) {
            Some(false)
        } else {
            self.stamped.insert(index);
            Some(true)
        }
    }

    pub fn stamped_count(&self) -> u32 {
        self.stamped.range(..self.num_stamps).count() as u32
    }

    pub fn is_complete(&self) -> bool {
        self.num_stamps > 0 && self.stamped_count() >= self.num_stamps
    }
}
