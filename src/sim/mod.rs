pub mod driver;
pub mod job;
pub mod report;

pub use driver::Sim;
pub use job::{ProcessSpec, Settings, SimulationRequest, validate_workload};
pub use report::{ProcessMetrics, QueueChange, SimulationResult, Summary, TimelineEntry};
