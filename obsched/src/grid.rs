/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pure helpers for slot-based placement: time grids and fixed-width windows
//! over a score array.
//!
//! These are free functions rather than methods so they can be used and
//! tested independently of the schedulers.

use chrono::{DateTime, Duration, Utc};

use crate::scheduler::SchedulerError;

/// Scores at or below this value count as "not observable" when validating a
/// placement window.
pub const MIN_SLOT_SCORE: f64 = 1e-5;

/// Evenly spaced instants `start, start + resolution, …` strictly before
/// `end`.
///
/// Returns an empty grid when `end <= start`.
///
/// # Errors
/// [`SchedulerError::NonPositiveResolution`] if `resolution <= 0`, which
/// would never reach `end`.
pub fn time_grid_from_range(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    resolution: Duration,
) -> Result<Vec<DateTime<Utc>>, SchedulerError> {
    if resolution <= Duration::zero() {
        return Err(SchedulerError::NonPositiveResolution(resolution));
    }

    let mut grid = Vec::new();
    let mut next = Some(start);
    while let Some(t) = next.filter(|t| *t < end) {
        grid.push(t);
        next = t.checked_add_signed(resolution);
    }
    Ok(grid)
}

/// Number of whole slots of `resolution` needed to cover `span` (ceiling).
///
/// `resolution` must be positive.
pub fn slots_needed(span: Duration, resolution: Duration) -> usize {
    let span_ms = span.num_milliseconds().max(0);
    let res_ms = resolution.num_milliseconds().max(1);
    (span_ms.saturating_add(res_ms - 1) / res_ms) as usize
}

/// Every contiguous sub-slice of `width` elements, in start order.
///
/// Yields nothing when `width` is zero or larger than `scores`.
pub fn stride_windows(scores: &[f64], width: usize) -> impl Iterator<Item = &[f64]> {
    let windows = if width == 0 || width > scores.len() {
        None
    } else {
        Some(scores.windows(width))
    };
    windows.into_iter().flatten()
}

/// Pick the best placement of a `width`-slot job over `scores`.
///
/// A window is valid when every slot in it scores above
/// [`MIN_SLOT_SCORE`] and `admissible(start_index)` holds; its value is the
/// sum of its slots.  Returns `(start_index, value)` of the highest-valued
/// valid window (the first one on ties), or `None` if no window is valid.
pub fn best_window(
    scores: &[f64],
    width: usize,
    admissible: impl Fn(usize) -> bool,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;

    for (idx, window) in stride_windows(scores, width).enumerate() {
        if !admissible(idx) || !window.iter().all(|&s| s > MIN_SLOT_SCORE) {
            continue;
        }
        let value: f64 = window.iter().sum();
        match best {
            Some((_, v)) if v >= value => {}
            _ => best = Some((idx, value)),
        }
    }

    best
}

// ── Tests ─────────────────────────────────────────────────────────────────────
