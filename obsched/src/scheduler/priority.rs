/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Priority-ordered grid scheduling.
//!
//! # Algorithm
//!
//! 1. Resolution = `min(shortest block duration, slew_time)`.
//! 2. One time grid over the window at that resolution; every slot open.
//! 3. Blocks are visited in ascending priority value (1 first).
//! 4. Per block: sum its constraints per grid slot, zero the closed slots,
//!    then slide a window of `ceil((duration + slew_time) / resolution)`
//!    slots over the scores.  A window counts only if all its slots are
//!    positive; the highest-summing one wins (first on ties) and its slots
//!    are closed.
//!
//! A block that scores zero everywhere, or for which no window fits, is
//! returned in [`Schedule::unscheduled`](super::Schedule::unscheduled) and
//! consumes no slots.  Because visiting order is priority order, a
//! high-priority block can take the slot a lower-priority block would have
//! preferred.
//!
//! # Complexity
//! O(n × g) constraint evaluations for n blocks and g grid slots.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use super::{check_window, Prepared, Scheduler, SchedulerError, StrategyOutput};
use super::DEFAULT_GAP_TIME_MINUTES;
use crate::block::{ObservingBlock, ScheduleEntry, ScheduledObservation};
use crate::constraint::{summed_scores, ConstraintRef};
use crate::grid::{best_window, slots_needed, time_grid_from_range};
use crate::sky::Observer;
use crate::transition::Transitioner;

/// Default flat gap assumed between any two consecutive blocks.
pub const DEFAULT_SLEW_TIME_MINUTES: i64 = 5;

/// Greedy priority-ordered scheduler.
#[derive(Debug, Clone)]
pub struct PriorityScheduler {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    constraints: Vec<ConstraintRef>,
    observer: Arc<dyn Observer>,
    /// Not consulted by this strategy; `slew_time` stands in for it.
    transitioner: Option<Transitioner>,
    /// Not consulted by this strategy.
    gap_time: Duration,
    slew_time: Duration,
}

impl PriorityScheduler {
    pub fn new(
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        constraints: Vec<ConstraintRef>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            start_time,
            end_time,
            constraints,
            observer,
            transitioner: None,
            gap_time: Duration::minutes(DEFAULT_GAP_TIME_MINUTES),
            slew_time: Duration::minutes(DEFAULT_SLEW_TIME_MINUTES),
        }
    }

    /// Scheduler over `[center - span/2, center + span/2)`.
    pub fn from_timespan(
        center: DateTime<Utc>,
        span: Duration,
        constraints: Vec<ConstraintRef>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self::new(center - span / 2, center + span / 2, constraints, observer)
    }

    pub fn with_transitioner(mut self, transitioner: Transitioner) -> Self {
        self.transitioner = Some(transitioner);
        self
    }

    pub fn with_gap_time(mut self, gap_time: Duration) -> Self {
        self.gap_time = gap_time;
        self
    }

    pub fn with_slew_time(mut self, slew_time: Duration) -> Self {
        self.slew_time = slew_time;
        self
    }

    pub fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.start_time, self.end_time)
    }

    pub fn slew_time(&self) -> Duration {
        self.slew_time
    }

    pub fn gap_time(&self) -> Duration {
        self.gap_time
    }

    pub fn transitioner(&self) -> Option<&Transitioner> {
        self.transitioner.as_ref()
    }
}

impl Scheduler for PriorityScheduler {
    fn name(&self) -> &str {
        "priority"
    }

    fn make_schedule(&self, blocks: Vec<ObservingBlock>) -> Result<StrategyOutput, SchedulerError> {
        check_window(self.start_time, self.end_time)?;

        let Some(shortest) = blocks.iter().map(|b| b.duration).min() else {
            return Ok(StrategyOutput::default());
        };
        let resolution = shortest.min(self.slew_time);
        let times = time_grid_from_range(self.start_time, self.end_time, resolution)?;
        let mut is_open = vec![true; times.len()];

        // Visiting order: ascending priority value, input order among equals
        let mut order: Vec<usize> = (0..blocks.len()).collect();
        order.sort_by(|&a, &b| blocks[a].priority.total_cmp(&blocks[b].priority));

        let mut pending: Vec<Option<Prepared>> = blocks
            .into_iter()
            .map(|b| Some(Prepared::new(b, &self.constraints)))
            .collect();

        info!(
            block_count = pending.len(),
            slot_count = times.len(),
            resolution_s = resolution.num_seconds(),
            slew_s = self.slew_time.num_seconds(),
            "Executing priority algorithm"
        );

        let mut entries: Vec<ScheduleEntry> = Vec::new();
        let mut unscheduled: Vec<ObservingBlock> = Vec::new();

        for idx in order {
            let Some(p) = pending[idx].take() else {
                continue;
            };

            let mut scores =
                summed_scores(&p.constraints, self.observer.as_ref(), &p.block.target, &times);
            for (score, open) in scores.iter_mut().zip(&is_open) {
                if !open {
                    *score = 0.0;
                }
            }

            if !scores.iter().any(|&s| s > 0.0) {
                warn!(
                    block = %p.block.target,
                    priority = p.block.priority,
                    "✗ not observable in any open slot"
                );
                unscheduled.push(p.block);
                continue;
            }

            let Some(total) = p.block.duration.checked_add(&self.slew_time) else {
                warn!(block = %p.block.target, "✗ duration plus slew time overflows");
                unscheduled.push(p.block);
                continue;
            };
            let width = slots_needed(total, resolution);
            let end_time = self.end_time;
            let placement = best_window(&scores, width, |i| {
                times[i]
                    .checked_add_signed(total)
                    .is_some_and(|end| end <= end_time)
            });

            let Some((first, value)) = placement else {
                warn!(
                    block = %p.block.target,
                    priority = p.block.priority,
                    slots = width,
                    "✗ no contiguous window fits"
                );
                unscheduled.push(p.block);
                continue;
            };

            is_open[first..first + width].fill(false);

            let Prepared {
                mut block,
                constraints,
                ..
            } = p;
            let start = times[first];
            // Admissible windows end inside the window, so this cannot overflow
            let end = start + total;
            block.start_time = Some(start);
            block.end_time = Some(end);

            info!(
                block = %block.target,
                priority = block.priority,
                start = %start,
                end = %end,
                score = value,
                "✓ scheduled"
            );
            debug!(first_slot = first, slots = width, "slots closed");

            entries.push(ScheduleEntry::Observation(ScheduledObservation {
                block,
                constraints,
                score: value,
            }));
        }

        info!(
            scheduled = entries.len(),
            unscheduled = unscheduled.len(),
            "priority done"
        );

        Ok(StrategyOutput {
            entries,
            already_sorted: false,
            unscheduled,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::constraint_fn;
    use crate::scheduler::schedule;
    use crate::sky::{AltAz, Target};
    use chrono::TimeZone;

    // ── Test helpers ──────────────────────────────────────────────────────────

    struct Zenith;

    impl Observer for Zenith {
        fn altaz(&self, _time: DateTime<Utc>, _target: &Target) -> AltAz {
            AltAz::new(90.0, 0.0)
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap()
    }

    fn minutes(m: i64) -> DateTime<Utc> {
        t0() + Duration::minutes(m)
    }

    /// 1.0 inside `[from_min, to_min]` (inclusive), else 0.
    fn visible(from_min: i64, to_min: i64) -> ConstraintRef {
        let (from, to) = (minutes(from_min), minutes(to_min));
        constraint_fn("visible", move |_, _, times| {
            times
                .iter()
                .map(|t| if *t >= from && *t <= to { 1.0 } else { 0.0 })
                .collect()
        })
    }

    /// 1.0 inside `[from_min, to_min]`, 0.5 elsewhere.
    fn preferred(from_min: i64, to_min: i64) -> ConstraintRef {
        let (from, to) = (minutes(from_min), minutes(to_min));
        constraint_fn("preferred", move |_, _, times| {
            times
                .iter()
                .map(|t| if *t >= from && *t <= to { 1.0 } else { 0.5 })
                .collect()
        })
    }

    fn constant(value: f64) -> ConstraintRef {
        constraint_fn("constant", move |_, _, times| vec![value; times.len()])
    }

    fn block(name: &str, duration_min: i64, priority: f64, cs: Vec<ConstraintRef>) -> ObservingBlock {
        ObservingBlock::new(
            Arc::new(Target::new(name, 0.0, 0.0)),
            Duration::minutes(duration_min),
            priority,
        )
        .with_constraints(cs)
    }

    fn scheduler(window_min: i64) -> PriorityScheduler {
        PriorityScheduler::new(t0(), minutes(window_min), vec![], Arc::new(Zenith))
    }

    fn placements(result: &crate::scheduler::Schedule) -> Vec<(String, DateTime<Utc>, DateTime<Utc>)> {
        result
            .observations()
            .map(|b| {
                (
                    b.target.name.clone(),
                    b.start_time.unwrap(),
                    b.end_time.unwrap(),
                )
            })
            .collect()
    }

    // ── Placement ─────────────────────────────────────────────────────────────

    #[test]
    fn two_block_scenario_uses_each_visibility_window() {
        let blocks = vec![
            block("one", 60, 1.0, vec![visible(0, 60)]),
            block("two", 60, 2.0, vec![visible(120, 180)]),
        ];
        let result = schedule(&scheduler(360), &blocks).unwrap();

        assert_eq!(
            placements(&result),
            vec![
                ("one".to_string(), minutes(0), minutes(65)),
                ("two".to_string(), minutes(120), minutes(185)),
            ]
        );
        assert_eq!(result.transitions().count(), 0);
        assert!(result.unscheduled.is_empty());
    }

    #[test]
    fn higher_priority_claims_the_contested_slot() {
        // Both prefer the first hour; input order puts the low priority first.
        let blocks = vec![
            block("low", 55, 2.0, vec![preferred(0, 60)]),
            block("high", 55, 1.0, vec![preferred(0, 60)]),
        ];
        let result = schedule(&scheduler(180), &blocks).unwrap();

        assert_eq!(
            placements(&result),
            vec![
                ("high".to_string(), minutes(0), minutes(60)),
                ("low".to_string(), minutes(60), minutes(120)),
            ]
        );
    }

    #[test]
    fn output_is_returned_in_time_order() {
        // The first block visited lands late in the night
        let blocks = vec![
            block("late", 30, 1.0, vec![visible(120, 180)]),
            block("anytime", 30, 2.0, vec![constant(1.0)]),
        ];
        let result = schedule(&scheduler(180), &blocks).unwrap();
        let names: Vec<String> = placements(&result).into_iter().map(|p| p.0).collect();
        assert_eq!(names, vec!["anytime", "late"]);
    }

    #[test]
    fn constraint_scores_are_summed_not_multiplied() {
        let blocks = vec![block("a", 25, 1.0, vec![constant(0.5), constant(0.5)])];
        let result = schedule(&scheduler(60), &blocks).unwrap();
        let obs = result.entries[0].as_observation().unwrap();
        // 30 min at 5 min resolution = 6 slots of 0.5 + 0.5
        assert_eq!(obs.score, 6.0);
        assert_eq!(obs.constraints.len(), 2);
    }

    #[test]
    fn placement_never_runs_past_the_window() {
        // Scores rise through the night, so the latest admissible start wins.
        let ramp = constraint_fn("ramp", |_, _, times: &[DateTime<Utc>]| {
            times
                .iter()
                .map(|t| 0.01 + (*t - t0()).num_minutes() as f64 / 60.0)
                .collect()
        });
        let blocks = vec![block("a", 30, 1.0, vec![ramp])];
        let result = schedule(&scheduler(62), &blocks).unwrap();

        let (_, start, end) = placements(&result).remove(0);
        assert_eq!(start, minutes(25));
        assert_eq!(end, minutes(60));
        assert!(end <= minutes(62));
    }

    // ── Unschedulable blocks ──────────────────────────────────────────────────

    #[test]
    fn never_observable_block_is_reported_and_consumes_nothing() {
        let blocks = vec![
            block("never", 30, 1.0, vec![constant(0.0)]),
            block("anytime", 30, 2.0, vec![constant(1.0)]),
        ];
        let result = schedule(&scheduler(120), &blocks).unwrap();

        assert_eq!(
            placements(&result),
            vec![("anytime".to_string(), minutes(0), minutes(35))]
        );
        assert_eq!(result.unscheduled.len(), 1);
        assert_eq!(result.unscheduled[0].target.name, "never");
        assert!(result.unscheduled[0].start_time.is_none());
    }

    #[test]
    fn block_without_a_long_enough_window_is_reported() {
        // Visible for 30 min but needs 60 + 5
        let blocks = vec![
            block("short_window", 60, 1.0, vec![visible(0, 30)]),
            block("anytime", 60, 2.0, vec![constant(1.0)]),
        ];
        let result = schedule(&scheduler(240), &blocks).unwrap();

        assert_eq!(
            placements(&result),
            vec![("anytime".to_string(), minutes(0), minutes(65))]
        );
        assert_eq!(result.unscheduled[0].target.name, "short_window");
    }

    #[test]
    fn global_constraints_are_added_to_each_block() {
        let s = PriorityScheduler::new(t0(), minutes(120), vec![constant(0.0)], Arc::new(Zenith));
        let blocks = vec![block("a", 30, 1.0, vec![constant(1.0)])];
        let result = schedule(&s, &blocks).unwrap();
        // 0.0 + 1.0 still positive: the sum keeps the block schedulable
        assert_eq!(result.observations().count(), 1);
        let obs = result.entries[0].as_observation().unwrap();
        assert_eq!(obs.constraints.len(), 2);
        assert_eq!(obs.score, 7.0);
    }

    // ── Edge cases ────────────────────────────────────────────────────────────

    #[test]
    fn empty_input_yields_empty_schedule() {
        let result = schedule(&scheduler(60), &[]).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn zero_slew_time_is_rejected() {
        let s = scheduler(60).with_slew_time(Duration::zero());
        let blocks = vec![block("a", 30, 1.0, vec![constant(1.0)])];
        let err = schedule(&s, &blocks).unwrap_err();
        assert!(matches!(err, SchedulerError::NonPositiveResolution(_)));
    }

    #[test]
    fn repeated_runs_do_not_touch_caller_blocks() {
        let blocks = vec![
            block("one", 60, 1.0, vec![visible(0, 60)]),
            block("two", 60, 2.0, vec![visible(120, 180)]),
        ];
        let s = scheduler(360);
        let first = schedule(&s, &blocks).unwrap();
        let second = schedule(&s, &blocks).unwrap();

        assert_eq!(placements(&first), placements(&second));
        assert!(blocks.iter().all(|b| b.start_time.is_none() && b.end_time.is_none()));
    }

    #[test]
    fn oversized_slew_time_leaves_block_unscheduled() {
        let s = scheduler(60).with_slew_time(Duration::milliseconds(i64::MAX));
        let blocks = vec![block("a", 30, 1.0, vec![constant(1.0)])];
        let result = schedule(&s, &blocks).unwrap();
        assert_eq!(result.observations().count(), 0);
        assert_eq!(result.unscheduled[0].target.name, "a");
    }

    #[test]
    fn defaults_match_documented_values() {
        let s = PriorityScheduler::from_timespan(minutes(60), Duration::hours(2), vec![], Arc::new(Zenith));
        assert_eq!(s.window(), (minutes(0), minutes(120)));
        assert_eq!(s.slew_time(), Duration::minutes(5));
        assert_eq!(s.gap_time(), Duration::minutes(30));
        assert!(s.transitioner().is_none());
    }
}
