pub mod core;
pub mod error;
pub mod scheduler;
pub mod sim;

pub use crate::core::{Level, SchedCoreEvent};
pub use error::{SimError, SimResult};
pub use scheduler::{MlfqScheduler, Scheduler};
pub use sim::{
    ProcessMetrics, ProcessSpec, QueueChange, Settings, Sim, SimulationRequest, SimulationResult,
    Summary, TimelineEntry,
};

/// Run a complete MLFQ simulation over `processes`.
///
/// Every call builds its own context, queues and generator, so independent
/// runs can proceed concurrently without sharing state.
pub fn simulate(processes: &[ProcessSpec], settings: &Settings) -> SimResult<SimulationResult> {
    Sim::<MlfqScheduler>::new(processes.to_vec(), settings)?.run()
}
