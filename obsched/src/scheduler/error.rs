/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the observation schedulers.
//!
//! A block that cannot be placed is **not** an error: it is reported through
//! [`Schedule::unscheduled`](super::Schedule::unscheduled).  The variants
//! below only cover calls that cannot produce a meaningful schedule at all.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Top-level error type returned by [`schedule()`](super::schedule) and by
/// [`Scheduler::make_schedule`](super::Scheduler::make_schedule).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulerError {
    /// The strategy did not provide a `make_schedule` implementation.
    #[error("scheduling strategy '{strategy}' does not implement make_schedule")]
    NotImplemented { strategy: String },

    /// The observing window ends before it starts.
    #[error("observing window ends ({end}) before it starts ({start})")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// A sequential gap of zero or less would never advance the cursor.
    #[error("gap_time must be positive, got {0}")]
    NonPositiveGapTime(Duration),

    /// A grid resolution of zero or less cannot discretise the window.
    #[error("time resolution must be positive, got {0}")]
    NonPositiveResolution(Duration),
}

// ── Tests ─────────────────────────────────────────────────────────────────────
