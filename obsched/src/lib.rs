/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! obsched – greedy observation scheduling for a single telescope
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── block          – observing / transition blocks and schedule entries
//! ├── sky            – targets, alt/az positions, Observer contract
//! ├── constraint     – feasibility-scoring contract and combinators
//! ├── grid           – time grids and fixed-width window search
//! ├── transition     – slew + instrument reconfiguration costs
//! ├── scheduler/     – schedule() entry point and the two strategies
//! └── config/        – YAML schedule configuration
//! ```

pub mod block;
pub mod config;
pub mod constraint;
pub mod grid;
pub mod scheduler;
pub mod sky;
pub mod transition;

pub use block::{ObservingBlock, ScheduleEntry, TransitionBlock};
pub use scheduler::{
    schedule, PriorityScheduler, Schedule, Scheduler, SchedulerError, SequentialScheduler,
};
