//! stampcard-core: habit condition extraction for stamp cards

pub mod dates;
pub mod error;
pub mod extract;
pub mod habit;
pub mod prompt;
pub mod quantity;
pub mod schema;

pub use dates::{ReferenceDate, Span, calendar_day_difference, resolve_period, window_end};
pub use error::{ExtractionError, TransportError, ValidationError};
pub use extract::{CompletionClient, ExtractionResult, extract_habit_details, extract_habit_details_on};
pub use habit::{Habit, HabitDraft};
pub use prompt::{CompletionRequest, SCHEMA_NAME, build_request, output_schema};
pub use quantity::reconcile;
pub use schema::{RawExtraction, TargetDate, parse_completion_text, validate};
