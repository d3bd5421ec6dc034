use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::{
    core::{Level, Ticks},
    error::{SimError, SimResult},
};

/// Static definition of one simulated process.
///
/// CPU burst `k` is followed by I/O burst `k`; there is no I/O after the last
/// CPU burst, so `io_bursts.len() == cpu_bursts.len() - 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub pid: String,
    pub arrival_time: Ticks,
    #[serde(rename = "cpu_burst")]
    pub cpu_bursts: Vec<Ticks>,
    #[serde(rename = "io_burst", default)]
    pub io_bursts: Vec<Ticks>,
    /// Initial queue level.
    #[serde(rename = "priority", default)]
    pub priority_hint: u8,
}

impl ProcessSpec {
    pub fn new(
        pid: impl Into<String>,
        arrival_time: Ticks,
        cpu_bursts: Vec<Ticks>,
        io_bursts: Vec<Ticks>,
    ) -> Self {
        Self {
            pid: pid.into(),
            arrival_time,
            cpu_bursts,
            io_bursts,
            priority_hint: 0,
        }
    }

    pub fn with_priority(mut self, priority_hint: u8) -> Self {
        self.priority_hint = priority_hint;
        self
    }

    pub fn level(&self) -> SimResult<Level> {
        Level::from_index(self.priority_hint).ok_or_else(|| {
            SimError::process(
                &self.pid,
                format!("priority {} is not a queue level", self.priority_hint),
            )
        })
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.pid.is_empty() {
            return Err(SimError::process(&self.pid, "empty pid"));
        }
        if self.cpu_bursts.is_empty() {
            return Err(SimError::process(&self.pid, "no cpu bursts"));
        }
        if let Some(pos) = self.cpu_bursts.iter().position(|&b| b == 0) {
            return Err(SimError::process(&self.pid, format!("cpu burst {pos} is zero")));
        }
        if self.io_bursts.len() + 1 != self.cpu_bursts.len() {
            return Err(SimError::process(
                &self.pid,
                format!(
                    "{} cpu bursts need {} io bursts, got {}",
                    self.cpu_bursts.len(),
                    self.cpu_bursts.len() - 1,
                    self.io_bursts.len()
                ),
            ));
        }
        self.level()?;
        Ok(())
    }

    pub fn total_cpu(&self) -> Ticks {
        self.cpu_bursts.iter().fold(0, |acc, &b| acc.saturating_add(b))
    }
}

pub fn validate_workload(processes: &[ProcessSpec]) -> SimResult<()> {
    let mut seen = FxHashSet::default();
    for spec in processes {
        spec.validate()?;
        if !seen.insert(spec.pid.as_str()) {
            return Err(SimError::process(&spec.pid, "duplicate pid"));
        }
    }
    Ok(())
}

pub const DEFAULT_AGING_THRESHOLD: Ticks = 5;
pub const DEFAULT_MAX_TICKS: Ticks = 1_000_000;

fn default_aging_threshold() -> Ticks {
    DEFAULT_AGING_THRESHOLD
}

fn default_max_ticks() -> Ticks {
    DEFAULT_MAX_TICKS
}

/// Knobs for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "aging", default)]
    pub aging_enabled: bool,
    /// Ticks a Q1/Q2 process may wait before it is promoted one level.
    #[serde(default = "default_aging_threshold")]
    pub aging_threshold: Ticks,
    #[serde(default)]
    pub cpu_variance: f64,
    #[serde(default)]
    pub io_variance: f64,
    /// Unseeded runs draw from the OS and are not reproducible.
    #[serde(rename = "seed", default)]
    pub rng_seed: Option<u64>,
    /// The run fails once the clock reaches this many ticks.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: Ticks,
    /// Every `n` ticks all waiting Q1/Q2 processes move to Q0.
    #[serde(default)]
    pub boost_interval: Option<Ticks>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            aging_enabled: false,
            aging_threshold: DEFAULT_AGING_THRESHOLD,
            cpu_variance: 0.0,
            io_variance: 0.0,
            rng_seed: None,
            max_ticks: DEFAULT_MAX_TICKS,
            boost_interval: None,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> SimResult<()> {
        for (name, v) in [
            ("cpu_variance", self.cpu_variance),
            ("io_variance", self.io_variance),
        ] {
            if !(0.0..1.0).contains(&v) {
                return Err(SimError::InvalidSettings(format!(
                    "{name} must be in [0, 1), got {v}"
                )));
            }
        }
        if self.aging_threshold == 0 {
            return Err(SimError::InvalidSettings("aging_threshold must be at least 1".into()));
        }
        if self.max_ticks == 0 {
            return Err(SimError::InvalidSettings("max_ticks must be at least 1".into()));
        }
        if self.boost_interval == Some(0) {
            return Err(SimError::InvalidSettings("boost_interval must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub processes: Vec<ProcessSpec>,
    #[serde(default)]
    pub settings: Settings,
}
