/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Feasibility scoring contract.
//!
//! A [`Constraint`] maps an observer, a target and a set of instants to one
//! score per instant in `[0, 1]`: `0` means the target cannot be observed,
//! `1` means fully feasible.  How the scores of several constraints are
//! combined is up to the scheduling strategy:
//!
//! | Strategy | Combination |
//! |---|---|
//! | [`SequentialScheduler`](crate::scheduler::SequentialScheduler) | product over constraints *and* instants |
//! | [`PriorityScheduler`](crate::scheduler::PriorityScheduler) | sum over constraints, per instant |
//!
//! The scoring library itself lives outside this crate.  Callers either
//! implement the trait or wrap a closure with [`constraint_fn`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::sky::{Observer, Target};

/// A pure feasibility-scoring function.
pub trait Constraint: Send + Sync {
    /// Name used in logs and `Debug` output.
    fn name(&self) -> &str {
        "constraint"
    }

    /// Score `target` at each of `times`.
    ///
    /// Must return exactly `times.len()` values.
    fn evaluate(&self, observer: &dyn Observer, target: &Target, times: &[DateTime<Utc>])
        -> Vec<f64>;
}

impl fmt::Debug for dyn Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constraint({})", self.name())
    }
}

/// Shared handle to a constraint.  Copies of a block share their constraints.
pub type ConstraintRef = Arc<dyn Constraint>;

// ── Closure adapter ───────────────────────────────────────────────────────────

/// A named closure that satisfies [`Constraint`].
pub struct FnConstraint<F> {
    name: String,
    f: F,
}

impl<F> Constraint for FnConstraint<F>
where
    F: Fn(&dyn Observer, &Target, &[DateTime<Utc>]) -> Vec<f64> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(
        &self,
        observer: &dyn Observer,
        target: &Target,
        times: &[DateTime<Utc>],
    ) -> Vec<f64> {
        (self.f)(observer, target, times)
    }
}

/// Wrap a closure as a shared [`Constraint`].
///
/// ```rust
/// use obsched::constraint::{constraint_fn, Constraint};
///
/// let always = constraint_fn("always", |_, _, times| vec![1.0; times.len()]);
/// assert_eq!(always.name(), "always");
/// ```
pub fn constraint_fn<F>(name: impl Into<String>, f: F) -> ConstraintRef
where
    F: Fn(&dyn Observer, &Target, &[DateTime<Utc>]) -> Vec<f64> + Send + Sync + 'static,
{
    Arc::new(FnConstraint {
        name: name.into(),
        f,
    })
}

// ── Combination helpers ───────────────────────────────────────────────────────

/// Global constraints followed by the block's own.
pub fn effective_constraints(
    global: &[ConstraintRef],
    own: Option<&[ConstraintRef]>,
) -> Vec<ConstraintRef> {
    let mut all = global.to_vec();
    if let Some(own) = own {
        all.extend(own.iter().cloned());
    }
    all
}

/// Product of every constraint's score at every instant.
///
/// A single zero anywhere collapses the result to zero.  An empty
/// constraint list scores `1.0` (nothing forbids the observation).
pub fn product_score(
    constraints: &[ConstraintRef],
    observer: &dyn Observer,
    target: &Target,
    times: &[DateTime<Utc>],
) -> f64 {
    constraints
        .iter()
        .flat_map(|c| c.evaluate(observer, target, times))
        .product()
}

/// Per-instant sum of every constraint's score.
pub fn summed_scores(
    constraints: &[ConstraintRef],
    observer: &dyn Observer,
    target: &Target,
    times: &[DateTime<Utc>],
) -> Vec<f64> {
    let mut scores = vec![0.0; times.len()];
    for constraint in constraints {
        for (acc, s) in scores
            .iter_mut()
            .zip(constraint.evaluate(observer, target, times))
        {
            *acc += s;
        }
    }
    scores
}

// ── Tests ─────────────────────────────────────────────────────────────────────
