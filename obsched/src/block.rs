/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core data structures of an observing schedule.
//!
//! ```text
//! caller ──(ObservingBlock)──►  scheduler  ──(ScheduleEntry)──►  Schedule
//!            ↑ input, never mutated          ↑ copies with start/end filled,
//!                                              interleaved with TransitionBlocks
//! ```
//!
//! # Ownership model
//! The caller keeps its [`ObservingBlock`]s.  `schedule()` takes a slice and
//! clones each block; targets and constraints sit behind `Arc`s, so the clone
//! is shallow.  Only the clones ever get `start_time` / `end_time` set.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::constraint::ConstraintRef;
use crate::sky::Target;

/// Free-form instrument configuration (`"filter" → "B"`, …).
///
/// Read by the [`Transitioner`](crate::transition::Transitioner) to price
/// reconfigurations between consecutive blocks.
pub type Configuration = BTreeMap<String, String>;

// ── Exposure plan ─────────────────────────────────────────────────────────────

/// Exposure breakdown kept on blocks built with
/// [`ObservingBlock::from_exposures`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposurePlan {
    pub time_per_exposure: Duration,
    pub n_exposures: u32,
    pub readout_time: Duration,
}

// ── ObservingBlock ────────────────────────────────────────────────────────────

/// A request to observe one target for a fixed duration.
///
/// # Lifecycle
/// Built by the caller, cloned by `schedule()`, and returned inside a
/// [`ScheduledObservation`] with both time fields set.  Blocks that could not
/// be placed come back untouched in [`Schedule::unscheduled`].
///
/// [`Schedule::unscheduled`]: crate::scheduler::Schedule::unscheduled
#[derive(Debug, Clone)]
pub struct ObservingBlock {
    pub target: Arc<Target>,

    /// On-sky time requested.  Must be positive.
    pub duration: Duration,

    /// Lower value = higher priority (1 is highest).
    pub priority: f64,

    pub configuration: Configuration,

    /// Constraints specific to this block, applied after the scheduler's
    /// global ones.  `None` means "global constraints only".
    pub constraints: Option<Vec<ConstraintRef>>,

    /// Set when built from an exposure count.
    pub exposures: Option<ExposurePlan>,

    /// `None` until a scheduler places the block.
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl ObservingBlock {
    pub fn new(target: Arc<Target>, duration: Duration, priority: f64) -> Self {
        Self {
            target,
            duration,
            priority,
            configuration: Configuration::new(),
            constraints: None,
            exposures: None,
            start_time: None,
            end_time: None,
        }
    }

    /// Build a block whose duration is `n_exposures × (time_per_exposure +
    /// readout_time)`.
    ///
    /// Returns `None` if that total does not fit in a `Duration`.
    pub fn from_exposures(
        target: Arc<Target>,
        priority: f64,
        time_per_exposure: Duration,
        n_exposures: u32,
        readout_time: Duration,
        configuration: Configuration,
    ) -> Option<Self> {
        let count = i32::try_from(n_exposures).ok()?;
        let duration = time_per_exposure
            .checked_add(&readout_time)?
            .checked_mul(count)?;
        Some(Self {
            configuration,
            exposures: Some(ExposurePlan {
                time_per_exposure,
                n_exposures,
                readout_time,
            }),
            ..Self::new(target, duration, priority)
        })
    }

    pub fn with_configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn with_constraints(mut self, constraints: Vec<ConstraintRef>) -> Self {
        self.constraints = Some(constraints);
        self
    }

    /// Returns `true` once a scheduler has set both time fields.
    pub fn is_scheduled(&self) -> bool {
        self.start_time.is_some() && self.end_time.is_some()
    }
}

impl fmt::Display for ObservingBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => write!(f, "{} ({} to {})", self.target, start, end),
            _ => write!(f, "{} (unscheduled)", self.target),
        }
    }
}

// ── TransitionBlock ───────────────────────────────────────────────────────────

/// Dead time between two observations (slew, reconfiguration, or a gap where
/// nothing was observable).
///
/// The duration is derived from the components and recomputed whenever they
/// are replaced; the end time is always `start_time + duration`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionBlock {
    components: BTreeMap<String, Duration>,
    duration: Duration,
    pub start_time: DateTime<Utc>,
}

impl TransitionBlock {
    /// Label of the filler inserted when no block can be observed.
    pub const NOTHING_OBSERVABLE: &'static str = "nothing_observable";
    /// Label of the telescope slew component.
    pub const SLEW_TIME: &'static str = "slew_time";

    /// Returns `None` for an empty component map: a transition with no
    /// cost components never exists.
    pub fn new(components: BTreeMap<String, Duration>, start_time: DateTime<Utc>) -> Option<Self> {
        if components.is_empty() {
            return None;
        }
        let duration = Self::total(&components);
        Some(Self {
            components,
            duration,
            start_time,
        })
    }

    /// Single-component filler of `gap` labelled `nothing_observable`.
    pub fn nothing_observable(gap: Duration, start_time: DateTime<Utc>) -> Self {
        let components = BTreeMap::from([(Self::NOTHING_OBSERVABLE.to_string(), gap)]);
        Self {
            components,
            duration: gap,
            start_time,
        }
    }

    pub fn components(&self) -> &BTreeMap<String, Duration> {
        &self.components
    }

    /// Replace the components and recompute the duration.
    ///
    /// An empty map is ignored (and reported as `false`) so the block never
    /// ends up without components.
    pub fn set_components(&mut self, components: BTreeMap<String, Duration>) -> bool {
        if components.is_empty() {
            return false;
        }
        self.duration = Self::total(&components);
        self.components = components;
        true
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + self.duration
    }

    fn total(components: &BTreeMap<String, Duration>) -> Duration {
        components
            .values()
            .fold(Duration::zero(), |acc, &d| acc + d)
    }
}

impl fmt::Display for TransitionBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .components
            .iter()
            .map(|(reason, d)| format!("{reason}: {}s", d.num_milliseconds() as f64 / 1000.0))
            .collect();
        write!(
            f,
            "({}, {} to {})",
            parts.join(", "),
            self.start_time,
            self.end_time()
        )
    }
}

// ── Schedule entries ──────────────────────────────────────────────────────────

/// A placed copy of an [`ObservingBlock`] plus what the scheduler derived
/// for it.
#[derive(Debug, Clone)]
pub struct ScheduledObservation {
    /// The copy, with `start_time` and `end_time` set.
    pub block: ObservingBlock,

    /// Global constraints followed by the block's own, as evaluated.
    pub constraints: Vec<ConstraintRef>,

    /// Score that won the placement (product score for the sequential
    /// strategy, summed window score for the priority strategy).
    pub score: f64,
}

/// One element of a schedule.
#[derive(Debug, Clone)]
pub enum ScheduleEntry {
    Observation(ScheduledObservation),
    Transition(TransitionBlock),
}

impl ScheduleEntry {
    /// Start instant.  Always set for entries produced by a scheduler.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        match self {
            ScheduleEntry::Observation(o) => o.block.start_time,
            ScheduleEntry::Transition(t) => Some(t.start_time),
        }
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        match self {
            ScheduleEntry::Observation(o) => o.block.end_time,
            ScheduleEntry::Transition(t) => Some(t.end_time()),
        }
    }

    pub fn as_observation(&self) -> Option<&ScheduledObservation> {
        match self {
            ScheduleEntry::Observation(o) => Some(o),
            ScheduleEntry::Transition(_) => None,
        }
    }

    pub fn as_transition(&self) -> Option<&TransitionBlock> {
        match self {
            ScheduleEntry::Transition(t) => Some(t),
            ScheduleEntry::Observation(_) => None,
        }
    }
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleEntry::Observation(o) => fmt::Display::fmt(&o.block, f),
            ScheduleEntry::Transition(t) => fmt::Display::fmt(t, f),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap()
    }

    fn vega() -> Arc<Target> {
        Arc::new(Target::new("Vega", 279.23, 38.78))
    }

    // ── ObservingBlock ────────────────────────────────────────────────────────

    #[test]
    fn new_block_is_unscheduled() {
        let b = ObservingBlock::new(vega(), Duration::minutes(20), 1.0);
        assert!(!b.is_scheduled());
        assert!(b.constraints.is_none());
        assert_eq!(b.to_string(), "Vega (unscheduled)");
    }

    #[test]
    fn from_exposures_sums_exposure_and_readout() {
        let b = ObservingBlock::from_exposures(
            vega(),
            2.0,
            Duration::seconds(60),
            10,
            Duration::seconds(30),
            Configuration::from([("filter".to_string(), "B".to_string())]),
        )
        .unwrap();
        assert_eq!(b.duration, Duration::seconds(900));
        assert_eq!(b.priority, 2.0);
        assert_eq!(b.configuration["filter"], "B");
        let plan = b.exposures.unwrap();
        assert_eq!(plan.n_exposures, 10);
        assert_eq!(plan.readout_time, Duration::seconds(30));
    }

    #[test]
    fn from_exposures_rejects_unrepresentable_totals() {
        let too_many = ObservingBlock::from_exposures(
            vega(),
            1.0,
            Duration::seconds(1),
            3_000_000_000,
            Duration::zero(),
            Configuration::new(),
        );
        assert!(too_many.is_none());

        let too_long = ObservingBlock::from_exposures(
            vega(),
            1.0,
            Duration::days(1_000_000_000),
            i32::MAX as u32,
            Duration::zero(),
            Configuration::new(),
        );
        assert!(too_long.is_none());
    }

    #[test]
    fn clone_shares_target() {
        let b = ObservingBlock::new(vega(), Duration::minutes(20), 1.0);
        let c = b.clone();
        assert!(Arc::ptr_eq(&b.target, &c.target));
    }

    #[test]
    fn scheduled_block_display_shows_interval() {
        let mut b = ObservingBlock::new(vega(), Duration::minutes(20), 1.0);
        b.start_time = Some(t0());
        b.end_time = Some(t0() + Duration::minutes(20));
        assert!(b.is_scheduled());
        let s = b.to_string();
        assert!(s.starts_with("Vega (2026-03-01 20:00:00 UTC to"), "got {s}");
    }

    // ── TransitionBlock ───────────────────────────────────────────────────────

    #[test]
    fn transition_with_no_components_is_not_created() {
        assert!(TransitionBlock::new(BTreeMap::new(), t0()).is_none());
    }

    #[test]
    fn transition_duration_is_sum_of_components() {
        let components = BTreeMap::from([
            ("slew_time".to_string(), Duration::seconds(90)),
            ("filter:B to V".to_string(), Duration::seconds(30)),
        ]);
        let t = TransitionBlock::new(components, t0()).unwrap();
        assert_eq!(t.duration(), Duration::seconds(120));
        assert_eq!(t.end_time(), t0() + Duration::seconds(120));
    }

    #[test]
    fn set_components_recomputes_duration() {
        let mut t = TransitionBlock::nothing_observable(Duration::minutes(30), t0());
        assert_eq!(t.duration(), Duration::minutes(30));

        let replaced = t.set_components(BTreeMap::from([(
            "slew_time".to_string(),
            Duration::seconds(45),
        )]));
        assert!(replaced);
        assert_eq!(t.duration(), Duration::seconds(45));
        assert_eq!(t.end_time(), t0() + Duration::seconds(45));
    }

    #[test]
    fn set_components_rejects_empty_map() {
        let mut t = TransitionBlock::nothing_observable(Duration::minutes(30), t0());
        assert!(!t.set_components(BTreeMap::new()));
        assert_eq!(t.components().len(), 1);
        assert_eq!(t.duration(), Duration::minutes(30));
    }

    #[test]
    fn nothing_observable_carries_its_label() {
        let t = TransitionBlock::nothing_observable(Duration::minutes(30), t0());
        assert_eq!(
            t.components().get(TransitionBlock::NOTHING_OBSERVABLE),
            Some(&Duration::minutes(30))
        );
        assert!(t.to_string().starts_with("(nothing_observable: 1800s"));
    }

    // ── ScheduleEntry ─────────────────────────────────────────────────────────

    #[test]
    fn entry_times_follow_the_wrapped_block() {
        let gap = ScheduleEntry::Transition(TransitionBlock::nothing_observable(
            Duration::minutes(30),
            t0(),
        ));
        assert_eq!(gap.start_time(), Some(t0()));
        assert_eq!(gap.end_time(), Some(t0() + Duration::minutes(30)));
        assert!(gap.as_observation().is_none());

        let obs = ScheduleEntry::Observation(ScheduledObservation {
            block: ObservingBlock::new(vega(), Duration::minutes(20), 1.0),
            constraints: vec![],
            score: 1.0,
        });
        assert_eq!(obs.start_time(), None);
        assert!(obs.as_transition().is_none());
    }
}
