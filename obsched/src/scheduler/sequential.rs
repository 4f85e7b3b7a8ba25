/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Walk-forward greedy scheduling.
//!
//! At every step the scheduler scores each remaining block as if it started
//! "now" (after its transition from the previous observation), places the
//! best one, and advances the cursor.  If nothing scores above zero it
//! inserts a `nothing_observable` gap of `gap_time` and tries again.  The
//! final gap is shortened so it ends at the window end.
//!
//! # Scoring
//! Each block's effective constraints are evaluated at three instants:
//! the block's start, midpoint and end.  All values across constraints and
//! instants are multiplied, so a single zero anywhere rules the block out.
//! The highest product wins; ties go to the block that came first in the
//! input.  Priority is ignored.
//!
//! # End time
//! The literal walk-forward rule stamps `end_time = start_time + gap_time`,
//! which ignores the block's own duration.  [`EndTimePolicy`] selects between
//! that rule and the default, which covers the full duration plus the gap.
//!
//! # Complexity
//! O(n²) constraint evaluations for n blocks in the worst case.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::{check_window, Prepared, Scheduler, SchedulerError, StrategyOutput};
use super::DEFAULT_GAP_TIME_MINUTES;
use crate::block::{ObservingBlock, ScheduleEntry, ScheduledObservation, TransitionBlock};
use crate::constraint::{product_score, ConstraintRef};
use crate::sky::Observer;
use crate::transition::Transitioner;

/// How a placed block's `end_time` is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndTimePolicy {
    /// `end_time = start_time + duration + gap_time`; the cursor moves to
    /// `end_time`.
    #[default]
    DurationPlusGap,

    /// `end_time = start_time + gap_time`, regardless of duration.
    GapOnly,
}

/// Greedy walk-forward scheduler.
#[derive(Debug, Clone)]
pub struct SequentialScheduler {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    constraints: Vec<ConstraintRef>,
    observer: Arc<dyn Observer>,
    transitioner: Option<Transitioner>,
    gap_time: Duration,
    end_time_policy: EndTimePolicy,
}

impl SequentialScheduler {
    /// Scheduler over `[start_time, end_time)` with `constraints` applied to
    /// every block, no transitioner and a 30-minute gap.
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
            end_time_policy: EndTimePolicy::default(),
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

    pub fn with_end_time_policy(mut self, policy: EndTimePolicy) -> Self {
        self.end_time_policy = policy;
        self
    }

    pub fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.start_time, self.end_time)
    }

    pub fn gap_time(&self) -> Duration {
        self.gap_time
    }

    /// Span a placed block occupies from its start, or `None` if it does
    /// not fit in a `Duration`.
    fn committed_span(&self, block: &ObservingBlock) -> Option<Duration> {
        match self.end_time_policy {
            EndTimePolicy::DurationPlusGap => block.duration.checked_add(&self.gap_time),
            EndTimePolicy::GapOnly => Some(self.gap_time),
        }
    }

    /// Product score of `p` starting at `start`, or `0.0` if its committed
    /// span would run past the window.
    fn score_at(&self, p: &Prepared, start: DateTime<Utc>) -> f64 {
        let end = self
            .committed_span(&p.block)
            .and_then(|span| start.checked_add_signed(span));
        if !end.is_some_and(|end| end <= self.end_time) {
            return 0.0;
        }
        let times: Option<Vec<DateTime<Utc>>> = p
            .offsets
            .iter()
            .map(|&o| start.checked_add_signed(o))
            .collect();
        match times {
            Some(times) => {
                product_score(&p.constraints, self.observer.as_ref(), &p.block.target, &times)
            }
            None => 0.0,
        }
    }
}

impl Scheduler for SequentialScheduler {
    fn name(&self) -> &str {
        "sequential"
    }

    fn make_schedule(&self, blocks: Vec<ObservingBlock>) -> Result<StrategyOutput, SchedulerError> {
        check_window(self.start_time, self.end_time)?;
        if self.gap_time <= Duration::zero() {
            return Err(SchedulerError::NonPositiveGapTime(self.gap_time));
        }

        let mut pool: Vec<Prepared> = blocks
            .into_iter()
            .map(|b| Prepared::new(b, &self.constraints))
            .collect();

        info!(
            block_count = pool.len(),
            start = %self.start_time,
            end = %self.end_time,
            gap_min = self.gap_time.num_minutes(),
            "Executing sequential algorithm"
        );

        let mut entries: Vec<ScheduleEntry> = Vec::new();
        let mut last_observation: Option<usize> = None;
        let mut now = self.start_time;

        while !pool.is_empty() && now < self.end_time {
            let previous = last_observation
                .and_then(|i| entries[i].as_observation())
                .map(|o| &o.block);

            // Transition and score for every remaining block, starting now
            let mut transitions: Vec<Option<TransitionBlock>> = Vec::with_capacity(pool.len());
            let mut scores: Vec<f64> = Vec::with_capacity(pool.len());
            for p in &pool {
                let transition = self.transitioner.as_ref().and_then(|t| {
                    t.compute(previous, &p.block, now, self.observer.as_ref())
                });
                let lead = transition
                    .as_ref()
                    .map_or(Duration::zero(), TransitionBlock::duration);
                // A lead that runs off the calendar can never be observed
                let score = now
                    .checked_add_signed(lead)
                    .map_or(0.0, |start| self.score_at(p, start));
                scores.push(score);
                transitions.push(transition);
            }

            // First maximum wins
            let (best_idx, best_score) = scores
                .iter()
                .copied()
                .enumerate()
                .fold((0, f64::MIN), |best, (i, s)| if s > best.1 { (i, s) } else { best });

            if best_score <= 0.0 {
                // The last gap is cut at the window end
                let gap = self.gap_time.min(self.end_time - now);
                debug!(at = %now, gap_s = gap.num_seconds(), "nothing observable");
                entries.push(ScheduleEntry::Transition(
                    TransitionBlock::nothing_observable(gap, now),
                ));
                now += gap;
                continue;
            }

            if let Some(transition) = transitions.swap_remove(best_idx) {
                now = transition.end_time();
                entries.push(ScheduleEntry::Transition(transition));
            }

            let Prepared {
                mut block,
                constraints,
                ..
            } = pool.remove(best_idx);
            let start = now;
            // score_at already rejected spans that do not fit the window
            now = self
                .committed_span(&block)
                .and_then(|span| start.checked_add_signed(span))
                .unwrap_or(self.end_time);
            block.start_time = Some(start);
            block.end_time = Some(now);

            info!(
                block = %block.target,
                start = %start,
                end   = %now,
                score  = best_score,
                "✓ scheduled"
            );

            entries.push(ScheduleEntry::Observation(ScheduledObservation {
                block,
                constraints,
                score: best_score,
            }));
            last_observation = Some(entries.len() - 1);
        }

        let unscheduled: Vec<ObservingBlock> = pool.into_iter().map(|p| p.block).collect();
        for b in &unscheduled {
            debug!(block = %b.target, "window exhausted before block could be placed");
        }
        info!(
            scheduled = entries.iter().filter(|e| e.as_observation().is_some()).count(),
            unscheduled = unscheduled.len(),
            "sequential done"
        );

        Ok(StrategyOutput {
            entries,
            already_sorted: true,
            unscheduled,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
