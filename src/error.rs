use thiserror::Error;

use crate::core::Ticks;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("invalid process definition for {pid:?}: {reason}")]
    InvalidProcessDefinition { pid: String, reason: String },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("simulation exceeded {max_ticks} ticks with {unfinished} process(es) unfinished")]
    SimulationBudgetExceeded { max_ticks: Ticks, unfinished: usize },

    // Internal-consistency fault; the run is aborted rather than reported.
    #[error("scheduler invariant violated: {0}")]
    InvariantViolated(String),
}

impl SimError {
    pub(crate) fn process(pid: &str, reason: impl Into<String>) -> Self {
        Self::InvalidProcessDefinition {
            pid: pid.to_string(),
            reason: reason.into(),
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;
