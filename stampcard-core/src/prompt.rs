//! Request construction for the completion service.
//!
//! The service only has to read the sentence and report an end date, an
//! explicit count and a daily flag. Day arithmetic stays on our side.

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use serde_json::{Value, json};

use crate::dates::{ReferenceDate, Span, infer_year, window_end};

/// Everything the completion service needs for one extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    /// System-level instruction, with today's date and worked examples.
    pub instruction: String,
    /// The user's condition, verbatim.
    pub condition: String,
    /// JSON Schema of the expected output object.
    pub schema: Value,
    pub today: ReferenceDate,
}

impl CompletionRequest {
    /// The user turn for chat-style APIs. The condition is kept out of the
    /// instruction text.
    pub fn user_message(&self) -> String {
        format!("Condition: {}", self.condition)
    }
}

/// Name used when a provider wants the output schema labelled.
pub const SCHEMA_NAME: &str = "habit_extraction";

pub fn output_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "target_date": {
                "type": ["string", "null"],
                "description": "Last day of the habit window as YYYY-MM-DD. Null when the condition names no date or duration."
            },
            "total_stamps": {
                "type": ["integer", "null"],
                "description": "Explicit total number of completions. Null when the action repeats daily or no count is given."
            },
            "is_daily": {
                "type": "boolean",
                "description": "True when the condition describes an action repeated every day."
            }
        },
        "required": ["is_daily"],
        "additionalProperties": false
    })
}

fn iso(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn spoken(d: NaiveDate) -> String {
    d.format("%B %-d").to_string()
}

struct Example {
    condition: String,
    output: Value,
}

fn examples(today: ReferenceDate) -> Vec<Example> {
    let mut out = Vec::new();
    let t = today.date();

    if let Some(till) = t.checked_add_days(Days::new(11)) {
        out.push(Example {
            condition: format!("Buy new headphones if I save 500 per day till {}", spoken(till)),
            output: json!({"target_date": iso(till), "total_stamps": null, "is_daily": true}),
        });
    }

    if let Some(end) = window_end(today, Span::Months(2)) {
        out.push(Example {
            condition: "Go on a vacation if I read 5 books in the next 2 months".to_string(),
            output: json!({"target_date": iso(end), "total_stamps": 5, "is_daily": false}),
        });
    }

    if let Some(end) = window_end(today, Span::Days(30)) {
        out.push(Example {
            condition: "Finish the main story of a video game in 30 days".to_string(),
            output: json!({"target_date": iso(end), "total_stamps": 1, "is_daily": false}),
        });
    }

    if let Some(end) = window_end(today, Span::Weeks(3)) {
        out.push(Example {
            condition: "Meditate every morning for 3 weeks, then treat myself to a massage".to_string(),
            output: json!({"target_date": iso(end), "total_stamps": null, "is_daily": true}),
        });
    }

    // A month and day that has already gone by this year, so the answer
    // rolls into next year. Nothing has gone by yet on January 1.
    if let Some(earlier) = t.checked_sub_days(Days::new(40)) {
        let earlier = if earlier.year() < t.year() {
            NaiveDate::from_ymd_opt(t.year(), 1, 1).filter(|jan1| *jan1 < t)
        } else {
            Some(earlier)
        };
        if let Some(earlier) = earlier {
            let day = if earlier.month() == 2 && earlier.day() == 29 { 28 } else { earlier.day() };
            if let Some(due) = infer_year(earlier.month(), day, today) {
                out.push(Example {
                    condition: format!("Buy a camera if I complete 12 design projects by {}", spoken(due)),
                    output: json!({"target_date": iso(due), "total_stamps": 12, "is_daily": false}),
                });
            }
        }
    }

    out.push(Example {
        condition: "New sneakers after 10 gym sessions".to_string(),
        output: json!({"target_date": null, "total_stamps": 10, "is_daily": false}),
    });

    out
}

/// Build the extraction request for `condition` as of `today`.
pub fn build_request(condition: &str, today: ReferenceDate) -> CompletionRequest {
    let t = today.date();
    let mut s = String::new();

    s.push_str("You extract habit tracking details from a short goal description.\n");
    s.push_str(&format!(
        "Today's date is {} ({}).\n\n",
        t.format("%A, %B %-d, %Y"),
        iso(t)
    ));

    s.push_str("Return a JSON object with these fields:\n");
    s.push_str(
        "- target_date: the last day of the habit window, formatted YYYY-MM-DD.\n\
  * If a date is named, use it. If it has no year, use its next occurrence on or after today.\n\
  * If a duration is given (\"for 30 days\", \"in 2 weeks\", \"over the next 3 months\"), \
the window starts today, so the last day is today plus the duration minus one day.\n\
  * If neither a date nor a duration is given, use null.\n",
    );
    s.push_str(
        "- total_stamps: the explicit number of completions required (books, sessions, projects, times).\n\
  * Amounts per action (\"save 500 per day\", \"10 pushups daily\") are not completions.\n\
  * Use null when the action repeats every day or no count is stated.\n",
    );
    s.push_str(
        "- is_daily: true when the action repeats every day (\"per day\", \"daily\", \"every morning\", \"each night\"), \
otherwise false.\n\n",
    );
    s.push_str("Do not count days yourself beyond producing target_date. Respond with the JSON object only.\n\n");

    s.push_str("Examples:\n");
    for ex in examples(today) {
        s.push_str(&format!("Condition: {}\nOutput: {}\n\n", ex.condition, ex.output));
    }

    CompletionRequest {
        instruction: s.trim_end().to_string(),
        condition: condition.trim().to_string(),
        schema: output_schema(),
        today,
    }
}
