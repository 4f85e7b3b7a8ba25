/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Sky-side collaborators of the scheduler: targets, horizontal positions
//! and the observer contract.
//!
//! The scheduler never computes astronomical geometry itself.  It asks an
//! [`Observer`] for the apparent [`AltAz`] position of a [`Target`] at an
//! instant, and only the [`Transitioner`](crate::transition::Transitioner)
//! does even that (to turn an angular separation into a slew time).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Target ────────────────────────────────────────────────────────────────────

/// A fixed celestial target in equatorial coordinates.
///
/// Blocks hold targets behind an `Arc`, so the copies made while scheduling
/// point at the same target as the caller's originals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Human-readable name, used in logs and `Display` output.
    pub name: String,

    /// Right ascension in degrees.
    pub ra_deg: f64,

    /// Declination in degrees.
    pub dec_deg: f64,
}

impl Target {
    pub fn new(name: impl Into<String>, ra_deg: f64, dec_deg: f64) -> Self {
        Self {
            name: name.into(),
            ra_deg,
            dec_deg,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ── AltAz ─────────────────────────────────────────────────────────────────────

/// Apparent horizontal position (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AltAz {
    pub alt_deg: f64,
    pub az_deg: f64,
}

impl AltAz {
    pub fn new(alt_deg: f64, az_deg: f64) -> Self {
        Self { alt_deg, az_deg }
    }

    /// Great-circle separation to `other`, in degrees.
    ///
    /// Uses the Vincenty form, which stays accurate for both tiny and
    /// near-antipodal separations where the plain `acos` form loses
    /// precision.
    pub fn separation(&self, other: &AltAz) -> f64 {
        let (lat1, lon1) = (self.alt_deg.to_radians(), self.az_deg.to_radians());
        let (lat2, lon2) = (other.alt_deg.to_radians(), other.az_deg.to_radians());
        let dlon = lon2 - lon1;

        let (sin_lat1, cos_lat1) = lat1.sin_cos();
        let (sin_lat2, cos_lat2) = lat2.sin_cos();
        let (sin_dlon, cos_dlon) = dlon.sin_cos();

        let num1 = cos_lat2 * sin_dlon;
        let num2 = cos_lat1 * sin_lat2 - sin_lat1 * cos_lat2 * cos_dlon;
        let denom = sin_lat1 * sin_lat2 + cos_lat1 * cos_lat2 * cos_dlon;

        num1.hypot(num2).atan2(denom).to_degrees()
    }
}

// ── Observer ──────────────────────────────────────────────────────────────────

/// An observing site able to report where a target appears in its sky.
///
/// Implementations must be pure: the scheduler may ask for the same
/// `(time, target)` pair many times.
pub trait Observer: Send + Sync {
    /// Site name, used in logs.
    fn name(&self) -> &str {
        "observer"
    }

    /// Apparent altitude/azimuth of `target` at `time`.
    fn altaz(&self, time: DateTime<Utc>, target: &Target) -> AltAz;
}

impl fmt::Debug for dyn Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer").field("name", &self.name()).finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
