use chrono::NaiveDate;
use thiserror::Error;

/// Malformed template input, rejected at creation or edit time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("unknown frequency '{0}' (expected daily, weekly, biweekly or monthly)")]
    UnknownFrequency(String),

    #[error("unknown assignment strategy '{0}' (expected fixed or rotation)")]
    UnknownStrategy(String),

    #[error("unknown priority '{0}' (expected low, medium or high)")]
    UnknownPriority(String),

    #[error("{0} templates need at least one due weekday")]
    MissingDueDays(&'static str),

    #[error("monthly templates take exactly one day of month, got {0}")]
    WrongMonthDayCount(usize),

    #[error("weekday {0} is out of range (0 = Sunday .. 6 = Saturday)")]
    WeekdayOutOfRange(u8),

    #[error("day of month {0} is out of range (1..31)")]
    MonthDayOutOfRange(u8),

    #[error("fixed assignment needs an assignee")]
    MissingFixedAssignee,

    #[error("rotation needs at least one member")]
    EmptyRotationOrder,

    #[error("{year}-{month} is not a valid month")]
    InvalidMonth { year: i32, month: u32 },
}

/// Failures of the scheduling engine. All are raised before any state changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("template {0} is inactive")]
    InactiveTemplate(u64),

    #[error("invalid strategy configuration: {0}")]
    InvalidStrategyConfig(String),

    #[error("rotation index {index} is out of bounds for {len} member(s)")]
    InvalidState { index: usize, len: usize },

    #[error("template {template_id} is not due on {date}")]
    NotDue { template_id: u64, date: NaiveDate },

    #[error("copying attachments failed: {0}")]
    Attachment(String),
}
