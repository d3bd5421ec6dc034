pub mod driver;
pub mod event;
pub mod observer;
pub mod state;
pub mod timeline;
pub mod variance;

pub use driver::SchedCore;
pub use event::SchedCoreEvent;
pub use state::{Level, ProcId, ProcState, Process, QueueId, ReadyQueue, SimCtx, Ticks, WakeAt};
pub use timeline::{Segment, TimelineBuilder};
pub use variance::VarianceGen;
