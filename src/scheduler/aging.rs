use crate::{
    core::{ProcId, QueueId, SimCtx, Ticks},
    error::SimResult,
};

/// Finds ready processes that have waited long enough to deserve a promotion.
#[derive(Debug, Clone, Copy)]
pub struct AgingMonitor {
    threshold: Ticks,
}

impl AgingMonitor {
    pub fn new(threshold: Ticks) -> Self {
        Self { threshold }
    }

    /// Members of `queue`, in FIFO order, with `now - ready_since >= threshold`.
    pub fn overdue(&self, ctx: &SimCtx, queue: QueueId) -> SimResult<Vec<ProcId>> {
        let now = ctx.now;
        Ok(ctx
            .queue(queue)?
            .iter()
            .filter(|&proc| now.saturating_sub(ctx.proc(proc).ready_since) >= self.threshold)
            .collect())
    }
}
