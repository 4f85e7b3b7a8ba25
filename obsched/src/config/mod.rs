//! Scheduling configuration loading.
//!
//! The expected YAML structure is:
//! ```yaml
//! window:
//!   start: "2026-03-01T20:00:00Z"
//!   end:   "2026-03-02T04:00:00Z"
//! gap_time_minutes: 30
//! slew_time_minutes: 5
//! transitioner:
//!   slew_rate_deg_per_sec: 0.8
//!   instrument_reconfig_times:
//!     filter:
//!       - { from: "B", to: "V", seconds: 600 }
//!       - { from: "V", to: "B", seconds: 600 }
//! ```
//!
//! Only `window` is required.  Constraints and the observer are code, not
//! data, so they are supplied by the caller when a scheduler is built.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::constraint::ConstraintRef;
use crate::scheduler::priority::DEFAULT_SLEW_TIME_MINUTES;
use crate::scheduler::{PriorityScheduler, SequentialScheduler, DEFAULT_GAP_TIME_MINUTES};
use crate::sky::Observer;
use crate::transition::{duration_from_secs_f64, ReconfigTable, Transitioner};

/// Ceiling for every duration read from a configuration file.
pub const MAX_CONFIGURED_DAYS: i64 = 366;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Deserialize)]
struct ScheduleConfigFile {
    window: WindowEntry,
    #[serde(default = "default_gap_time_minutes")]
    gap_time_minutes: i64,
    #[serde(default = "default_slew_time_minutes")]
    slew_time_minutes: i64,
    transitioner: Option<TransitionerEntry>,
}

/// RFC 3339 instants, e.g. `2026-03-01T20:00:00Z`.
#[derive(Debug, Deserialize)]
struct WindowEntry {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TransitionerEntry {
    slew_rate_deg_per_sec: Option<f64>,
    /// Configuration key → list of costed value changes.
    instrument_reconfig_times: Option<BTreeMap<String, Vec<ReconfigEntry>>>,
}

#[derive(Debug, Deserialize)]
struct ReconfigEntry {
    from: String,
    to: String,
    seconds: f64,
}

fn default_gap_time_minutes() -> i64 {
    DEFAULT_GAP_TIME_MINUTES
}

fn default_slew_time_minutes() -> i64 {
    DEFAULT_SLEW_TIME_MINUTES
}

fn max_configured_duration() -> Duration {
    Duration::days(MAX_CONFIGURED_DAYS)
}

/// `minutes` as a `Duration`, which must be positive and at most
/// [`MAX_CONFIGURED_DAYS`].
fn positive_minutes(field: &str, minutes: i64) -> Result<Duration> {
    ensure!(minutes > 0, "{field} must be positive, got {minutes}");
    Duration::try_minutes(minutes)
        .filter(|d| *d <= max_configured_duration())
        .with_context(|| {
            format!("{field} of {minutes} minutes exceeds {MAX_CONFIGURED_DAYS} days")
        })
}

// ── Public data structures ────────────────────────────────────────────────────

/// Everything about a scheduling run that can live in a file.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub gap_time: Duration,
    /// Flat inter-block gap used by [`PriorityScheduler`].
    pub slew_time: Duration,
    pub transitioner: Option<Transitioner>,
}

impl ScheduleConfig {
    /// Parses the YAML file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, the YAML is
    /// structurally invalid, or a value is out of range: an inverted
    /// window, a non-positive gap or slew time, a negative reconfiguration
    /// time, or any duration above [`MAX_CONFIGURED_DAYS`].
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading schedule configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    /// Parses configuration from an in-memory YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: ScheduleConfigFile =
            serde_yaml::from_str(content).context("Failed to parse YAML")?;

        let WindowEntry { start, end } = file.window;
        ensure!(
            end >= start,
            "window end ({end}) precedes window start ({start})"
        );

        let gap_time = positive_minutes("gap_time_minutes", file.gap_time_minutes)?;
        let slew_time = positive_minutes("slew_time_minutes", file.slew_time_minutes)?;
        let transitioner = file.transitioner.map(build_transitioner).transpose()?;

        let config = Self {
            start_time: start,
            end_time: end,
            gap_time,
            slew_time,
            transitioner,
        };

        info!(
            "Loaded schedule window {} to {} | gap: {}min | slew: {}min | transitioner: {}",
            config.start_time,
            config.end_time,
            file.gap_time_minutes,
            file.slew_time_minutes,
            if config.transitioner.is_some() { "yes" } else { "no" },
        );

        Ok(config)
    }

    pub fn transitioner(&self) -> Option<&Transitioner> {
        self.transitioner.as_ref()
    }

    /// Sequential scheduler over the configured window.
    pub fn sequential_scheduler(
        &self,
        constraints: Vec<ConstraintRef>,
        observer: Arc<dyn Observer>,
    ) -> SequentialScheduler {
        let scheduler =
            SequentialScheduler::new(self.start_time, self.end_time, constraints, observer)
                .with_gap_time(self.gap_time);
        match &self.transitioner {
            Some(t) => scheduler.with_transitioner(t.clone()),
            None => scheduler,
        }
    }

    /// Priority scheduler over the configured window.
    pub fn priority_scheduler(
        &self,
        constraints: Vec<ConstraintRef>,
        observer: Arc<dyn Observer>,
    ) -> PriorityScheduler {
        let scheduler =
            PriorityScheduler::new(self.start_time, self.end_time, constraints, observer)
                .with_gap_time(self.gap_time)
                .with_slew_time(self.slew_time);
        match &self.transitioner {
            Some(t) => scheduler.with_transitioner(t.clone()),
            None => scheduler,
        }
    }
}

fn build_transitioner(entry: TransitionerEntry) -> Result<Transitioner> {
    let table = entry
        .instrument_reconfig_times
        .map(build_reconfig_table)
        .transpose()?;
    Ok(Transitioner::new(entry.slew_rate_deg_per_sec, table))
}

fn build_reconfig_table(raw: BTreeMap<String, Vec<ReconfigEntry>>) -> Result<ReconfigTable> {
    let mut table = ReconfigTable::new();
    for (key, changes) in raw {
        let costs = table.entry(key.clone()).or_default();
        for change in changes {
            let cost = duration_from_secs_f64(change.seconds)
                .filter(|d| *d <= max_configured_duration())
                .with_context(|| {
                    format!(
                        "reconfiguration time for {key} {} to {} must be between 0 and {MAX_CONFIGURED_DAYS} days, got {}s",
                        change.from, change.to, change.seconds
                    )
                })?;
            debug!("  Reconfig: {key} {} to {} = {}s", change.from, change.to, change.seconds);
            if costs.insert((change.from.clone(), change.to.clone()), cost).is_some() {
                warn!(
                    "Duplicate reconfiguration entry {key} {} to {}, keeping the last one",
                    change.from, change.to
                );
            }
        }
    }
    Ok(table)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
