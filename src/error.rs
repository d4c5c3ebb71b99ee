use chrono::NaiveDateTime;
use thiserror::Error;

/// Contract violations raised by the timephased engine and its value types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimephasedError {
    #[error("span finish {finish} is before its start {start}")]
    InvalidSpan {
        start: NaiveDateTime,
        finish: NaiveDateTime,
    },

    #[error("unknown time unit '{0}'")]
    InvalidUnit(String),

    #[error("unknown series kind '{0}'")]
    InvalidSeriesKind(String),

    #[error("invalid calendar: {0}")]
    InvalidCalendar(String),
}

pub type TimephasedResult<T> = Result<T, TimephasedError>;
