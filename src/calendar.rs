use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::duration::{TimeUnit, UnitDefaults, WorkDuration};
use crate::error::{TimephasedError, TimephasedResult};

/// How far next/previous work searches walk before giving up.
const MAX_SEARCH_DAYS: i64 = 3660;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Working-time queries the normaliser and expander rely on.
///
/// Implementations must be read-only for queries so one calendar can be shared
/// by workers normalising different assignments.
pub trait ProjectCalendar: Send + Sync {
    /// Working minutes between two instants. Zero when `finish <= start`.
    fn work_minutes(&self, start: NaiveDateTime, finish: NaiveDateTime) -> f64;

    fn is_working_date(&self, date: NaiveDate) -> bool;

    /// Start of the first working period on `date`, `None` on non-working days.
    fn start_time(&self, date: NaiveDate) -> Option<NaiveTime>;

    /// End of the last working period on `date`. Midnight means end of day.
    fn finish_time(&self, date: NaiveDate) -> Option<NaiveTime>;

    /// Earliest working instant at or after `instant`.
    fn next_work_start(&self, instant: NaiveDateTime) -> Option<NaiveDateTime>;

    /// Latest working instant at or before `instant`.
    fn previous_work_finish(&self, instant: NaiveDateTime) -> Option<NaiveDateTime>;

    /// Projects `duration` of working time from `start`, forwards or backwards.
    fn date(&self, start: NaiveDateTime, duration: WorkDuration, forward: bool) -> NaiveDateTime;

    fn unit_defaults(&self) -> UnitDefaults {
        UnitDefaults::default()
    }

    fn work(&self, start: NaiveDateTime, finish: NaiveDateTime, unit: TimeUnit) -> WorkDuration {
        WorkDuration::minutes(self.work_minutes(start, finish))
            .convert_to(unit, &self.unit_defaults())
    }

    fn day_start(&self, date: NaiveDate) -> Option<NaiveDateTime> {
        self.start_time(date).map(|time| date.and_time(time))
    }

    fn day_finish(&self, date: NaiveDate) -> Option<NaiveDateTime> {
        self.finish_time(date).map(|time| {
            if time == NaiveTime::MIN {
                date.succ_opt().unwrap_or(date).and_time(time)
            } else {
                date.and_time(time)
            }
        })
    }
}

/// One working period within a day. A finish of 00:00 closes the day at midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingRange {
    start: NaiveTime,
    finish: NaiveTime,
}

impl WorkingRange {
    pub fn new(start: NaiveTime, finish: NaiveTime) -> TimephasedResult<Self> {
        let range = Self { start, finish };
        range.validate()?;
        Ok(range)
    }

    /// Convenience constructor from whole hours and minutes.
    pub fn hm(
        start_hour: u32,
        start_minute: u32,
        finish_hour: u32,
        finish_minute: u32,
    ) -> TimephasedResult<Self> {
        let start = NaiveTime::from_hms_opt(start_hour, start_minute, 0).ok_or_else(|| {
            TimephasedError::InvalidCalendar(format!("invalid time {start_hour}:{start_minute}"))
        })?;
        let finish = NaiveTime::from_hms_opt(finish_hour % 24, finish_minute, 0).ok_or_else(|| {
            TimephasedError::InvalidCalendar(format!("invalid time {finish_hour}:{finish_minute}"))
        })?;
        Self::new(start, finish)
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn finish(&self) -> NaiveTime {
        self.finish
    }

    fn start_minute(&self) -> u32 {
        minute_of_day(self.start)
    }

    fn finish_minute(&self) -> u32 {
        if self.finish == NaiveTime::MIN {
            MINUTES_PER_DAY
        } else {
            minute_of_day(self.finish)
        }
    }

    fn minutes(&self) -> u32 {
        self.finish_minute() - self.start_minute()
    }

    fn bounds_on(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let midnight = date.and_time(NaiveTime::MIN);
        (
            midnight + Duration::minutes(i64::from(self.start_minute())),
            midnight + Duration::minutes(i64::from(self.finish_minute())),
        )
    }

    fn validate(&self) -> TimephasedResult<()> {
        if self.finish_minute() <= self.start_minute() {
            return Err(TimephasedError::InvalidCalendar(format!(
                "working range {}-{} must finish after it starts",
                self.start, self.finish
            )));
        }
        Ok(())
    }
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// A date whose working periods differ from the regular week.
/// An empty `ranges` list makes the date non-working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarException {
    pub date: NaiveDate,
    #[serde(default)]
    pub ranges: Vec<WorkingRange>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkCalendar {
    working_days: HashSet<Weekday>,
    working_hours: Vec<WorkingRange>,
    holidays: HashSet<NaiveDate>,
    exceptions: HashMap<NaiveDate, Vec<WorkingRange>>,
    unit_defaults: UnitDefaults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkCalendarConfig {
    working_days: Vec<Weekday>,
    #[serde(default = "WorkCalendarConfig::standard_hours")]
    working_hours: Vec<WorkingRange>,
    #[serde(default)]
    holidays: Vec<NaiveDate>,
    #[serde(default)]
    exceptions: Vec<CalendarException>,
    #[serde(default)]
    unit_defaults: UnitDefaults,
}

impl Default for WorkCalendar {
    /// Monday to Friday, 08:00-12:00 and 13:00-17:00.
    fn default() -> Self {
        Self {
            working_days: HashSet::from(Self::WEEKDAYS),
            working_hours: WorkCalendarConfig::standard_hours(),
            holidays: HashSet::new(),
            exceptions: HashMap::new(),
            unit_defaults: UnitDefaults::default(),
        }
    }
}

impl WorkCalendar {
    const ALL_WEEKDAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    const WEEKDAYS: [Weekday; 5] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];

    pub fn custom<I, R, J>(working_days: I, working_hours: R, holidays: J) -> TimephasedResult<Self>
    where
        I: IntoIterator<Item = Weekday>,
        R: IntoIterator<Item = WorkingRange>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let config = WorkCalendarConfig::new(working_days, working_hours, holidays);
        Self::from_config(&config)
    }

    /// Monday to Friday with a single working range per day.
    pub fn weekdays(range: WorkingRange) -> Self {
        Self {
            working_days: HashSet::from(Self::WEEKDAYS),
            working_hours: vec![range],
            ..Self::default()
        }
    }

    pub fn from_config(config: &WorkCalendarConfig) -> TimephasedResult<Self> {
        let working_hours = normalise_ranges(&config.working_hours)?;
        let mut exceptions = HashMap::with_capacity(config.exceptions.len());
        for exception in &config.exceptions {
            exceptions.insert(exception.date, normalise_ranges(&exception.ranges)?);
        }
        check_unit_defaults(&config.unit_defaults)?;

        Ok(Self {
            working_days: config.working_days.iter().copied().collect(),
            working_hours,
            holidays: config.holidays.iter().copied().collect(),
            exceptions,
            unit_defaults: config.unit_defaults,
        })
    }

    /// Minutes per day and week used for day and week conversions.
    pub fn set_unit_defaults(&mut self, defaults: UnitDefaults) -> TimephasedResult<()> {
        check_unit_defaults(&defaults)?;
        self.unit_defaults = defaults;
        Ok(())
    }

    /// Add a single holiday
    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.holidays.insert(date);
    }

    /// Add multiple holidays at once
    pub fn add_holidays(&mut self, dates: &[NaiveDate]) {
        self.holidays.extend(dates);
    }

    /// Add the same custom holiday for multiple years
    /// Example: Add Dec 24 (Christmas Eve) for 2025-2030
    pub fn add_recurring_holiday(&mut self, month: u32, day: u32, start_year: i32, end_year: i32) {
        for year in start_year..=end_year {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                self.holidays.insert(date);
            }
        }
    }

    /// Override the working periods of one date. Takes precedence over holidays.
    pub fn add_exception(
        &mut self,
        date: NaiveDate,
        ranges: Vec<WorkingRange>,
    ) -> TimephasedResult<()> {
        let ranges = normalise_ranges(&ranges)?;
        self.exceptions.insert(date, ranges);
        Ok(())
    }

    /// Set custom working days (e.g., Mon-Sat for 6-day weeks)
    pub fn set_working_days(&mut self, days: Vec<Weekday>) {
        self.working_days = days.into_iter().collect();
    }

    pub fn set_working_hours(&mut self, ranges: Vec<WorkingRange>) -> TimephasedResult<()> {
        self.working_hours = normalise_ranges(&ranges)?;
        Ok(())
    }

    /// Working periods in effect on `date`, earliest first.
    pub fn ranges_for(&self, date: NaiveDate) -> &[WorkingRange] {
        if let Some(ranges) = self.exceptions.get(&date) {
            return ranges;
        }
        if self.holidays.contains(&date) || !self.working_days.contains(&date.weekday()) {
            return &[];
        }
        &self.working_hours
    }

    /// Minutes of working time on `date`.
    pub fn minutes_on(&self, date: NaiveDate) -> u32 {
        self.ranges_for(date).iter().map(WorkingRange::minutes).sum()
    }

    /// Get all working days in a date range
    pub fn working_days_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        let mut current = start;

        while current <= end {
            if self.is_working_date(current) {
                days.push(current);
            }
            current = current + Duration::days(1);
        }
        days
    }
}

fn check_unit_defaults(defaults: &UnitDefaults) -> TimephasedResult<()> {
    if defaults.minutes_per_day <= 0.0 || defaults.minutes_per_week <= 0.0 {
        return Err(TimephasedError::InvalidCalendar(
            "unit defaults must be positive".into(),
        ));
    }
    Ok(())
}

fn normalise_ranges(ranges: &[WorkingRange]) -> TimephasedResult<Vec<WorkingRange>> {
    let mut sorted = ranges.to_vec();
    for range in &sorted {
        range.validate()?;
    }
    sorted.sort_by_key(WorkingRange::start_minute);
    for pair in sorted.windows(2) {
        if pair[1].start_minute() < pair[0].finish_minute() {
            return Err(TimephasedError::InvalidCalendar(format!(
                "working ranges {}-{} and {}-{} overlap",
                pair[0].start, pair[0].finish, pair[1].start, pair[1].finish
            )));
        }
    }
    Ok(sorted)
}

impl ProjectCalendar for WorkCalendar {
    fn work_minutes(&self, start: NaiveDateTime, finish: NaiveDateTime) -> f64 {
        if finish <= start {
            return 0.0;
        }
        let mut seconds = 0i64;
        let mut day = start.date();
        while day.and_time(NaiveTime::MIN) < finish {
            for range in self.ranges_for(day) {
                let (range_start, range_finish) = range.bounds_on(day);
                let overlap = range_finish.min(finish) - range_start.max(start);
                if overlap > Duration::zero() {
                    seconds += overlap.num_seconds();
                }
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        seconds as f64 / 60.0
    }

    fn is_working_date(&self, date: NaiveDate) -> bool {
        !self.ranges_for(date).is_empty()
    }

    fn start_time(&self, date: NaiveDate) -> Option<NaiveTime> {
        self.ranges_for(date).first().map(WorkingRange::start)
    }

    fn finish_time(&self, date: NaiveDate) -> Option<NaiveTime> {
        self.ranges_for(date).last().map(WorkingRange::finish)
    }

    fn next_work_start(&self, instant: NaiveDateTime) -> Option<NaiveDateTime> {
        for offset in 0..MAX_SEARCH_DAYS {
            let day = instant.date() + Duration::days(offset);
            for range in self.ranges_for(day) {
                let (range_start, range_finish) = range.bounds_on(day);
                if range_finish > instant {
                    return Some(range_start.max(instant));
                }
            }
        }
        None
    }

    fn previous_work_finish(&self, instant: NaiveDateTime) -> Option<NaiveDateTime> {
        for offset in 0..MAX_SEARCH_DAYS {
            let day = instant.date() - Duration::days(offset);
            for range in self.ranges_for(day).iter().rev() {
                let (range_start, range_finish) = range.bounds_on(day);
                if range_start < instant {
                    return Some(range_finish.min(instant));
                }
            }
        }
        None
    }

    fn date(&self, start: NaiveDateTime, duration: WorkDuration, forward: bool) -> NaiveDateTime {
        let minutes = duration.to_minutes(&self.unit_defaults);
        if minutes <= 0.0 {
            return start;
        }
        let mut remaining = (minutes * 60.0).round() as i64;
        let mut cursor = start;

        for offset in 0..MAX_SEARCH_DAYS {
            if forward {
                let day = start.date() + Duration::days(offset);
                for range in self.ranges_for(day) {
                    let (range_start, range_finish) = range.bounds_on(day);
                    if range_finish <= cursor {
                        continue;
                    }
                    let segment_start = range_start.max(cursor);
                    let available = (range_finish - segment_start).num_seconds();
                    if remaining <= available {
                        return segment_start + Duration::seconds(remaining);
                    }
                    remaining -= available;
                    cursor = range_finish;
                }
            } else {
                let day = start.date() - Duration::days(offset);
                for range in self.ranges_for(day).iter().rev() {
                    let (range_start, range_finish) = range.bounds_on(day);
                    if range_start >= cursor {
                        continue;
                    }
                    let segment_finish = range_finish.min(cursor);
                    let available = (segment_finish - range_start).num_seconds();
                    if remaining <= available {
                        return segment_finish - Duration::seconds(remaining);
                    }
                    remaining -= available;
                    cursor = range_start;
                }
            }
        }
        cursor
    }

    fn unit_defaults(&self) -> UnitDefaults {
        self.unit_defaults
    }
}

impl WorkCalendarConfig {
    pub fn new<I, R, J>(working_days: I, working_hours: R, holidays: J) -> Self
    where
        I: IntoIterator<Item = Weekday>,
        R: IntoIterator<Item = WorkingRange>,
        J: IntoIterator<Item = NaiveDate>,
    {
        let mut working: Vec<Weekday> = working_days.into_iter().collect();
        working.sort_by_key(|wd| wd.num_days_from_monday());
        working.dedup_by(|a, b| a.num_days_from_monday() == b.num_days_from_monday());

        let mut holidays: Vec<NaiveDate> = holidays.into_iter().collect();
        holidays.sort();
        holidays.dedup();

        Self {
            working_days: working,
            working_hours: working_hours.into_iter().collect(),
            holidays,
            exceptions: Vec::new(),
            unit_defaults: UnitDefaults::default(),
        }
    }

    fn standard_hours() -> Vec<WorkingRange> {
        let eight = NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN);
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN);
        let one = NaiveTime::from_hms_opt(13, 0, 0).unwrap_or(NaiveTime::MIN);
        let five = NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN);
        vec![
            WorkingRange {
                start: eight,
                finish: noon,
            },
            WorkingRange {
                start: one,
                finish: five,
            },
        ]
    }

    pub fn with_exceptions(mut self, exceptions: Vec<CalendarException>) -> Self {
        self.exceptions = exceptions;
        self.exceptions.sort_by_key(|exception| exception.date);
        self
    }

    pub fn working_days(&self) -> &[Weekday] {
        &self.working_days
    }

    pub fn working_hours(&self) -> &[WorkingRange] {
        &self.working_hours
    }

    pub fn holidays(&self) -> &[NaiveDate] {
        &self.holidays
    }

    pub fn exceptions(&self) -> &[CalendarException] {
        &self.exceptions
    }
}

impl Default for WorkCalendarConfig {
    fn default() -> Self {
        WorkCalendarConfig::from(&WorkCalendar::default())
    }
}

impl From<&WorkCalendar> for WorkCalendarConfig {
    fn from(calendar: &WorkCalendar) -> Self {
        let working = WorkCalendar::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| calendar.working_days.contains(day))
            .collect();

        let mut holidays: Vec<NaiveDate> = calendar.holidays.iter().copied().collect();
        holidays.sort();

        let mut exceptions: Vec<CalendarException> = calendar
            .exceptions
            .iter()
            .map(|(date, ranges)| CalendarException {
                date: *date,
                ranges: ranges.clone(),
            })
            .collect();
        exceptions.sort_by_key(|exception| exception.date);

        Self {
            working_days: working,
            working_hours: calendar.working_hours.clone(),
            holidays,
            exceptions,
            unit_defaults: calendar.unit_defaults,
        }
    }
}
