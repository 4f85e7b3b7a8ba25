//! Observation schedulers.
//!
//! A [`Scheduler`] is a placement strategy: it receives private copies of the
//! caller's [`ObservingBlock`]s and returns them time-stamped, interleaved
//! with any [`TransitionBlock`]s it needed.  The free function [`schedule()`]
//! is the single public entry point shared by every strategy:
//!
//! ```text
//! schedule(strategy, &blocks)
//!   ├── clone every block            (caller's blocks are never touched)
//!   ├── strategy.make_schedule(copies)
//!   └── re-sort by start_time        (only if the strategy says it must)
//! ```
//!
//! Two strategies ship with the crate:
//!
//! | Strategy | Order | Combination | Timeline model |
//! |---|---|---|---|
//! | [`SequentialScheduler`] | walk forward in time, best block "now" | product over constraints × 3 offsets | scalar cursor |
//! | [`PriorityScheduler`] | ascending priority value | per-slot sum of constraints | open/closed slot mask on one grid |
//!
//! # Example
//! ```rust,ignore
//! let scheduler = SequentialScheduler::new(start, end, constraints, observer)
//!     .with_transitioner(transitioner);
//! let result = schedule(&scheduler, &blocks)?;
//! for entry in &result.entries {
//!     println!("{entry}");
//! }
//! ```

pub mod error;
pub mod priority;
pub mod sequential;

pub use error::SchedulerError;
pub use priority::PriorityScheduler;
pub use sequential::{EndTimePolicy, SequentialScheduler};

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::block::{ObservingBlock, ScheduleEntry, TransitionBlock};
use crate::constraint::{effective_constraints, ConstraintRef};

/// Default spacing after each sequential placement, and the size of a
/// forced advance when nothing is observable.
pub const DEFAULT_GAP_TIME_MINUTES: i64 = 30;

// ── Strategy contract ─────────────────────────────────────────────────────────

/// What a strategy hands back to [`schedule()`].
#[derive(Debug, Default)]
pub struct StrategyOutput {
    pub entries: Vec<ScheduleEntry>,

    /// `true` if `entries` are already in ascending `start_time` order.
    pub already_sorted: bool,

    /// Copies that could not be placed, untouched.
    pub unscheduled: Vec<ObservingBlock>,
}

/// A placement strategy.
///
/// Implementors override [`make_schedule`](Self::make_schedule).  The
/// default body fails with [`SchedulerError::NotImplemented`], so a strategy
/// that forgets to provide one fails fast instead of returning an empty
/// schedule.
pub trait Scheduler {
    /// Strategy name, used in logs and errors.
    fn name(&self) -> &str;

    /// Place `blocks` (already private copies) on the timeline.
    fn make_schedule(&self, _blocks: Vec<ObservingBlock>) -> Result<StrategyOutput, SchedulerError> {
        Err(SchedulerError::NotImplemented {
            strategy: self.name().to_string(),
        })
    }
}

// ── Result ────────────────────────────────────────────────────────────────────

/// Outcome of one [`schedule()`] call.
#[derive(Debug, Default)]
pub struct Schedule {
    /// Observations and transitions in ascending `start_time` order.
    pub entries: Vec<ScheduleEntry>,

    /// Blocks the strategy could not place.  They do not appear in
    /// `entries`.
    pub unscheduled: Vec<ObservingBlock>,
}

impl Schedule {
    /// Placed observation blocks, in schedule order.
    pub fn observations(&self) -> impl Iterator<Item = &ObservingBlock> {
        self.entries
            .iter()
            .filter_map(|e| e.as_observation().map(|o| &o.block))
    }

    /// Transition blocks, in schedule order.
    pub fn transitions(&self) -> impl Iterator<Item = &TransitionBlock> {
        self.entries.iter().filter_map(|e| e.as_transition())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Schedule `blocks` with `strategy`.
///
/// The blocks are cloned before the strategy sees them, so the caller's
/// originals keep `start_time == None`.  When the strategy does not emit
/// entries in time order they are re-sorted by `start_time`.
///
/// # Re-sort collisions
/// The re-sort keys a map by `start_time`.  If two entries share a start
/// time the one written last wins and the other is dropped from
/// `entries`.  Neither built-in strategy produces such collisions.
///
/// # Errors
/// Propagates the strategy's [`SchedulerError`].
pub fn schedule<S>(strategy: &S, blocks: &[ObservingBlock]) -> Result<Schedule, SchedulerError>
where
    S: Scheduler + ?Sized,
{
    let copies: Vec<ObservingBlock> = blocks.to_vec();

    info!(
        strategy = strategy.name(),
        block_count = copies.len(),
        "=== schedule() ==="
    );

    let output = strategy.make_schedule(copies)?;

    let entries = if output.already_sorted {
        output.entries
    } else {
        sort_by_start_time(output.entries)
    };

    let result = Schedule {
        entries,
        unscheduled: output.unscheduled,
    };

    info!(
        strategy = strategy.name(),
        entries = result.entries.len(),
        observations = result.observations().count(),
        unscheduled = result.unscheduled.len(),
        "=== Scheduling complete ==="
    );

    Ok(result)
}

/// Order entries by `start_time`; later entries overwrite earlier ones with
/// the same key.
fn sort_by_start_time(entries: Vec<ScheduleEntry>) -> Vec<ScheduleEntry> {
    let total = entries.len();
    let mut by_start: BTreeMap<Option<DateTime<Utc>>, ScheduleEntry> = BTreeMap::new();
    for entry in entries {
        by_start.insert(entry.start_time(), entry);
    }
    if by_start.len() < total {
        warn!(
            dropped = total - by_start.len(),
            "entries with duplicate start times collapsed during re-sort"
        );
    }
    by_start.into_values().collect()
}

// ── Shared per-call state ─────────────────────────────────────────────────────

/// Scheduler-local data derived for one block.  Kept beside the block rather
/// than on it, so the block type stays plain.
#[derive(Debug)]
struct Prepared {
    block: ObservingBlock,
    constraints: Vec<ConstraintRef>,
    /// Start, midpoint and end of the block relative to its start.
    offsets: [Duration; 3],
}

impl Prepared {
    fn new(block: ObservingBlock, global: &[ConstraintRef]) -> Self {
        let constraints = effective_constraints(global, block.constraints.as_deref());
        let offsets = [Duration::zero(), block.duration / 2, block.duration];
        Self {
            block,
            constraints,
            offsets,
        }
    }
}

/// Window check shared by both strategies.
fn check_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), SchedulerError> {
    if end < start {
        return Err(SchedulerError::InvalidWindow { start, end });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
