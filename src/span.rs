use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::duration::{TimeUnit, UnitDefaults, WorkDuration};
use crate::error::{TimephasedError, TimephasedResult};

/// A block of work performed between `start` and `finish`.
///
/// Spans are immutable values: every pipeline stage that needs a different
/// boundary or amount builds a replacement with one of the `with_*` methods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    start: NaiveDateTime,
    finish: NaiveDateTime,
    total_amount: WorkDuration,
    amount_per_day: WorkDuration,
}

impl TimeSpan {
    pub fn new(
        start: NaiveDateTime,
        finish: NaiveDateTime,
        total_amount: WorkDuration,
    ) -> TimephasedResult<Self> {
        if finish < start {
            return Err(TimephasedError::InvalidSpan { start, finish });
        }
        Ok(Self {
            start,
            finish,
            total_amount,
            amount_per_day: total_amount,
        })
    }

    /// Zero-work marker covering `start..finish`.
    pub fn padding(
        start: NaiveDateTime,
        finish: NaiveDateTime,
        unit: TimeUnit,
    ) -> TimephasedResult<Self> {
        Self::new(start, finish, WorkDuration::zero(unit))
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn finish(&self) -> NaiveDateTime {
        self.finish
    }

    pub fn total_amount(&self) -> WorkDuration {
        self.total_amount
    }

    pub fn amount_per_day(&self) -> WorkDuration {
        self.amount_per_day
    }

    pub fn is_zero(&self) -> bool {
        self.total_amount.is_zero()
    }

    pub fn start_day(&self) -> NaiveDate {
        self.start.date()
    }

    /// Day the finish belongs to. A finish landing exactly on midnight closes
    /// the previous day.
    pub fn finish_day(&self) -> NaiveDate {
        finish_day_of(self.start, self.finish)
    }

    pub fn is_single_day(&self) -> bool {
        self.start_day() == self.finish_day()
    }

    pub fn with_bounds(
        &self,
        start: NaiveDateTime,
        finish: NaiveDateTime,
    ) -> TimephasedResult<Self> {
        if finish < start {
            return Err(TimephasedError::InvalidSpan { start, finish });
        }
        Ok(Self {
            start,
            finish,
            ..*self
        })
    }

    pub fn with_total_amount(&self, total_amount: WorkDuration) -> Self {
        Self {
            total_amount,
            ..*self
        }
    }

    pub fn with_amount_per_day(&self, amount_per_day: WorkDuration) -> Self {
        Self {
            amount_per_day,
            ..*self
        }
    }

    /// Fuses `self` with a later span: `self.start .. later.finish`, amounts summed
    /// in the unit of `self`.
    pub fn merged_with(&self, later: &TimeSpan, defaults: &UnitDefaults) -> Self {
        let total = self.total_amount.plus(&later.total_amount, defaults);
        Self {
            start: self.start,
            finish: later.finish.max(self.start),
            total_amount: total,
            amount_per_day: total,
        }
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} -> {} {} ({}/day)]",
            self.start, self.finish, self.total_amount, self.amount_per_day
        )
    }
}

/// A plain interval, used for split ranges and timescale buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub finish: NaiveDateTime,
}

impl DateRange {
    pub fn new(start: NaiveDateTime, finish: NaiveDateTime) -> Self {
        Self { start, finish }
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        instant >= self.start && instant < self.finish
    }
}

pub(crate) fn finish_day_of(start: NaiveDateTime, finish: NaiveDateTime) -> NaiveDate {
    let day = finish.date();
    if finish.time() == NaiveTime::MIN && finish > start {
        day.pred_opt().unwrap_or(day)
    } else {
        day
    }
}
