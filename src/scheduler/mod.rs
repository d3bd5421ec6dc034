pub mod aging;
pub mod mlfq;

use crate::{
    core::{Level, ProcId, SchedCoreEvent, SimCtx, Ticks},
    error::SimResult,
    sim::Settings,
};
pub use aging::AgingMonitor;
pub use mlfq::MlfqScheduler;

pub type EnqueueFlags = u64;

// First admission at arrival
pub const ENQ_ARRIVAL: EnqueueFlags = 1 << 0;
// Returning from I/O
pub const ENQ_WAKEUP: EnqueueFlags = 1 << 1;
// Burst finished before the quantum did, more work remains
pub const ENQ_YIELD: EnqueueFlags = 1 << 2;
// Join the head of the queue instead of the tail
pub const ENQ_HEAD: EnqueueFlags = 1 << 4;
// Quantum expired
pub const ENQ_PREEMPT: EnqueueFlags = 1 << 32;

pub trait Scheduler {
    fn init(ctx: &mut SimCtx, settings: &Settings) -> Self;

    /// Place a Ready process on a run queue.
    fn enqueue(&mut self, ctx: &mut SimCtx, proc: ProcId, flags: EnqueueFlags) -> SimResult<()>;

    /// Pick the next process for an idle cpu.
    fn dispatch(&mut self, ctx: &mut SimCtx) -> Option<ProcId>;

    /// Per-tick housekeeping, run after arrivals and before dispatch.
    fn tick(&mut self, _ctx: &mut SimCtx, _events: &mut Vec<SchedCoreEvent>) -> SimResult<()> {
        Ok(())
    }

    fn quantum(&self, level: Level) -> Option<Ticks> {
        level.quantum()
    }
}
