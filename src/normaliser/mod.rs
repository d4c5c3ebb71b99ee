//! Turns raw, arbitrarily bounded work spans into a canonical per-day series.
//!
//! The pipeline is: amounts to minutes, format pre-hook, split at day
//! boundaries, merge same-day fragments, clamp to calendar hours, format
//! post-hook, rescale to the storage unit. Each stage consumes the list and
//! returns a new one.

use std::fmt;
use std::sync::Arc;

use crate::calendar::ProjectCalendar;
use crate::config::NormaliserConfig;
use crate::duration::{TimeUnit, UnitDefaults};
use crate::span::TimeSpan;

pub mod merge;
pub mod split;
pub mod validate;

pub use merge::{merge_same_day, merge_same_work};
pub use split::split_days;
pub use validate::validate_same_day;

/// Format-specific adjustments around the shared pipeline.
pub trait NormaliserHooks: fmt::Debug + Send + Sync {
    /// Runs on raw spans (already in minutes) before day splitting.
    fn before_split(&self, spans: Vec<TimeSpan>) -> Vec<TimeSpan> {
        spans
    }

    /// Runs on the validated per-day series, still in minutes.
    fn after_validate(
        &self,
        _calendar: &dyn ProjectCalendar,
        spans: Vec<TimeSpan>,
        _defaults: &UnitDefaults,
    ) -> Vec<TimeSpan> {
        spans
    }
}

/// MS Project XML behaviour: one entry per working day.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardHooks;

impl NormaliserHooks for StandardHooks {}

/// Binary MPP behaviour: consecutive days with equal work collapse into one
/// multi-day span whose `amount_per_day` carries the daily rate.
#[derive(Debug, Clone, Copy)]
pub struct CompactingHooks {
    tolerance: f64,
}

impl CompactingHooks {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

impl NormaliserHooks for CompactingHooks {
    fn after_validate(
        &self,
        calendar: &dyn ProjectCalendar,
        spans: Vec<TimeSpan>,
        defaults: &UnitDefaults,
    ) -> Vec<TimeSpan> {
        merge_same_work(calendar, spans, self.tolerance, defaults)
    }
}

#[derive(Debug, Clone)]
pub struct Normaliser {
    config: NormaliserConfig,
    hooks: Arc<dyn NormaliserHooks>,
}

impl Default for Normaliser {
    fn default() -> Self {
        Self::new(NormaliserConfig::default())
    }
}

impl Normaliser {
    pub fn new(config: NormaliserConfig) -> Self {
        let hooks: Arc<dyn NormaliserHooks> = if config.compact_runs {
            Arc::new(CompactingHooks::new(config.compaction_tolerance))
        } else {
            Arc::new(StandardHooks)
        };
        Self { config, hooks }
    }

    pub fn with_hooks(config: NormaliserConfig, hooks: Arc<dyn NormaliserHooks>) -> Self {
        Self { config, hooks }
    }

    pub fn config(&self) -> &NormaliserConfig {
        &self.config
    }

    pub fn normalise(&self, calendar: &dyn ProjectCalendar, spans: Vec<TimeSpan>) -> Vec<TimeSpan> {
        if spans.is_empty() {
            return spans;
        }
        let defaults = calendar.unit_defaults();
        let raw_count = spans.len();

        let spans = convert_units(spans, TimeUnit::Minutes, &defaults);
        let spans = self.hooks.before_split(spans);
        let spans = split_days(calendar, spans, self.config.rounding_places);
        let spans = merge_same_day(calendar, spans, &defaults);
        let spans = validate_same_day(calendar, spans);
        let spans = self.hooks.after_validate(calendar, spans, &defaults);
        let spans = convert_units(spans, self.config.storage_unit, &defaults);

        tracing::debug!(raw = raw_count, canonical = spans.len(), "normalised timephased work");
        spans
    }
}

/// Rescales every amount to `unit`.
pub fn convert_units(spans: Vec<TimeSpan>, unit: TimeUnit, defaults: &UnitDefaults) -> Vec<TimeSpan> {
    spans
        .into_iter()
        .map(|span| {
            span.with_total_amount(span.total_amount().convert_to(unit, defaults))
                .with_amount_per_day(span.amount_per_day().convert_to(unit, defaults))
        })
        .collect()
}
