use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TimephasedError;

const EPSILON: f64 = 1e-6;

/// Units a work amount can be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl TimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
            TimeUnit::Weeks => "weeks",
        }
    }

    pub fn abbreviation(&self) -> &'static str {
        match self {
            TimeUnit::Minutes => "m",
            TimeUnit::Hours => "h",
            TimeUnit::Days => "d",
            TimeUnit::Weeks => "w",
        }
    }

    fn minutes_per_unit(&self, defaults: &UnitDefaults) -> f64 {
        match self {
            TimeUnit::Minutes => 1.0,
            TimeUnit::Hours => 60.0,
            TimeUnit::Days => defaults.minutes_per_day,
            TimeUnit::Weeks => defaults.minutes_per_week,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = TimephasedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "min" | "mins" | "minute" | "minutes" => Ok(TimeUnit::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Ok(TimeUnit::Hours),
            "d" | "day" | "days" => Ok(TimeUnit::Days),
            "w" | "wk" | "week" | "weeks" => Ok(TimeUnit::Weeks),
            other => Err(TimephasedError::InvalidUnit(other.to_string())),
        }
    }
}

/// Project-level factors used when converting between day/week and clock units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitDefaults {
    pub minutes_per_day: f64,
    pub minutes_per_week: f64,
}

impl Default for UnitDefaults {
    fn default() -> Self {
        Self {
            minutes_per_day: 480.0,
            minutes_per_week: 2400.0,
        }
    }
}

/// A work amount: magnitude plus unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkDuration {
    amount: f64,
    unit: TimeUnit,
}

impl WorkDuration {
    pub fn new(amount: f64, unit: TimeUnit) -> Self {
        Self { amount, unit }
    }

    pub fn zero(unit: TimeUnit) -> Self {
        Self::new(0.0, unit)
    }

    pub fn minutes(amount: f64) -> Self {
        Self::new(amount, TimeUnit::Minutes)
    }

    pub fn hours(amount: f64) -> Self {
        Self::new(amount, TimeUnit::Hours)
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    pub fn is_zero(&self) -> bool {
        self.amount.abs() <= EPSILON
    }

    pub fn to_minutes(&self, defaults: &UnitDefaults) -> f64 {
        self.amount * self.unit.minutes_per_unit(defaults)
    }

    /// Rescales the amount into `unit`. A pure unit change, no calendar involved.
    pub fn convert_to(&self, unit: TimeUnit, defaults: &UnitDefaults) -> Self {
        if unit == self.unit {
            return *self;
        }
        let minutes = self.to_minutes(defaults);
        Self::new(minutes / unit.minutes_per_unit(defaults), unit)
    }

    /// Sum expressed in the unit of `self`.
    pub fn plus(&self, other: &WorkDuration, defaults: &UnitDefaults) -> Self {
        let other = other.convert_to(self.unit, defaults);
        Self::new(self.amount + other.amount, self.unit)
    }

    /// Difference expressed in the unit of `self`.
    pub fn minus(&self, other: &WorkDuration, defaults: &UnitDefaults) -> Self {
        let other = other.convert_to(self.unit, defaults);
        Self::new(self.amount - other.amount, self.unit)
    }

    pub fn rounded(&self, places: u32) -> Self {
        Self::new(round_to(self.amount, places), self.unit)
    }

    pub fn approx_eq(&self, other: &WorkDuration, tolerance: f64, defaults: &UnitDefaults) -> bool {
        let other = other.convert_to(self.unit, defaults);
        (self.amount - other.amount).abs() <= tolerance
    }
}

impl fmt::Display for WorkDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.abbreviation())
    }
}

pub(crate) fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
