/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Transition costs between consecutive observing blocks.
//!
//! Two independent terms make up a transition:
//!
//! | Component | Needs | Cost |
//! |---|---|---|
//! | `slew_time` | slew rate + previous block | angular separation / slew rate |
//! | `<key>:<old> to <new>` | reconfiguration table + previous block | table lookup per changed key |
//!
//! The first block of a schedule has no previous block, so it never pays a
//! transition.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::block::{ObservingBlock, TransitionBlock};
use crate::sky::Observer;

/// Reconfiguration costs: configuration key → `(old value, new value)` → time.
pub type ReconfigTable = BTreeMap<String, BTreeMap<(String, String), Duration>>;

/// `seconds` rounded to whole milliseconds.
///
/// Returns `None` for negative or non-finite input, or when the value does
/// not fit in a `Duration`.
pub fn duration_from_secs_f64(seconds: f64) -> Option<Duration> {
    let millis = (seconds * 1000.0).round();
    if !(millis.is_finite() && millis >= 0.0 && millis < i64::MAX as f64) {
        return None;
    }
    Duration::try_milliseconds(millis as i64)
}

/// Computes the dead time needed to go from one block to the next.
#[derive(Debug, Clone, Default)]
pub struct Transitioner {
    /// Telescope slew rate in degrees per second.  `None` disables the slew
    /// term.
    slew_rate_deg_per_sec: Option<f64>,

    /// `None` disables the reconfiguration term.
    instrument_reconfig_times: Option<ReconfigTable>,
}

impl Transitioner {
    pub fn new(
        slew_rate_deg_per_sec: Option<f64>,
        instrument_reconfig_times: Option<ReconfigTable>,
    ) -> Self {
        Self {
            slew_rate_deg_per_sec,
            instrument_reconfig_times,
        }
    }

    pub fn with_slew_rate(mut self, deg_per_sec: f64) -> Self {
        self.slew_rate_deg_per_sec = Some(deg_per_sec);
        self
    }

    pub fn with_reconfig_times(mut self, table: ReconfigTable) -> Self {
        self.instrument_reconfig_times = Some(table);
        self
    }

    pub fn slew_rate(&self) -> Option<f64> {
        self.slew_rate_deg_per_sec
    }

    pub fn reconfig_times(&self) -> Option<&ReconfigTable> {
        self.instrument_reconfig_times.as_ref()
    }

    /// Transition from `previous` to `next` starting at `start_time`.
    ///
    /// Returns `None` when no cost component applies.  Zero-length
    /// components are dropped, so a returned block always has a positive
    /// duration.
    pub fn compute(
        &self,
        previous: Option<&ObservingBlock>,
        next: &ObservingBlock,
        start_time: DateTime<Utc>,
        observer: &dyn Observer,
    ) -> Option<TransitionBlock> {
        let previous = previous?;
        let mut components: BTreeMap<String, Duration> = BTreeMap::new();

        if let Some(rate) = self.slew_rate_deg_per_sec {
            if let Some(slew) = Self::slew_time(previous, next, start_time, observer, rate) {
                components.insert(TransitionBlock::SLEW_TIME.to_string(), slew);
            }
        }

        if let Some(table) = &self.instrument_reconfig_times {
            components.extend(Self::instrument_transitions(table, previous, next));
        }

        components.retain(|_, d| *d > Duration::zero());

        let transition = TransitionBlock::new(components, start_time)?;
        debug!(
            from     = %previous.target,
            to       = %next.target,
            duration_s = transition.duration().num_seconds(),
            "transition computed"
        );
        Some(transition)
    }

    fn slew_time(
        previous: &ObservingBlock,
        next: &ObservingBlock,
        at: DateTime<Utc>,
        observer: &dyn Observer,
        rate: f64,
    ) -> Option<Duration> {
        if !(rate.is_finite() && rate > 0.0) {
            warn!(rate, "slew rate must be positive, slew term skipped");
            return None;
        }
        let from = observer.altaz(at, &previous.target);
        let to = observer.altaz(at, &next.target);
        let separation = from.separation(&to);
        let slew = duration_from_secs_f64(separation / rate);
        if slew.is_none() {
            warn!(rate, separation, "slew time not representable, slew term skipped");
        }
        slew
    }

    /// One labelled component for every configuration key whose value
    /// changes between the blocks and whose `(old, new)` pair has a
    /// registered cost.
    fn instrument_transitions(
        table: &ReconfigTable,
        previous: &ObservingBlock,
        next: &ObservingBlock,
    ) -> BTreeMap<String, Duration> {
        let mut components = BTreeMap::new();
        for (key, old) in &previous.configuration {
            let Some(new) = next.configuration.get(key) else {
                continue;
            };
            if old == new {
                continue;
            }
            let cost = table
                .get(key)
                .and_then(|costs| costs.get(&(old.clone(), new.clone())));
            if let Some(&cost) = cost {
                components.insert(format!("{key}:{old} to {new}"), cost);
            }
        }
        components
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
