use log::debug;

use super::{AgingMonitor, ENQ_HEAD, ENQ_PREEMPT, EnqueueFlags, Scheduler};
use crate::{
    core::{Level, ProcId, QueueId, SchedCoreEvent, SimCtx, Ticks},
    error::SimResult,
    sim::Settings,
};

/// Three-level feedback queue.
///
/// Processes start at their hinted level, drop one level each time they use
/// up a full quantum and keep their level across I/O and voluntary yields.
/// Q2 is plain FCFS. Waiting processes can climb back up through aging or
/// the periodic boost.
pub struct MlfqScheduler {
    levels: [QueueId; 3],
    aging: Option<AgingMonitor>,
    boost_interval: Option<Ticks>,
}

impl Scheduler for MlfqScheduler {
    fn init(ctx: &mut SimCtx, settings: &Settings) -> Self {
        Self {
            levels: [ctx.create_queue(), ctx.create_queue(), ctx.create_queue()],
            aging: settings
                .aging_enabled
                .then(|| AgingMonitor::new(settings.aging_threshold)),
            boost_interval: settings.boost_interval,
        }
    }

    fn enqueue(&mut self, ctx: &mut SimCtx, proc: ProcId, flags: EnqueueFlags) -> SimResult<()> {
        if flags & ENQ_PREEMPT != 0 {
            return self.demote(ctx, proc);
        }
        let level = ctx.proc(proc).level;
        self.enqueue_at(ctx, proc, level, flags & ENQ_HEAD != 0)
    }

    fn dispatch(&mut self, ctx: &mut SimCtx) -> Option<ProcId> {
        self.dequeue_next(ctx)
    }

    fn tick(&mut self, ctx: &mut SimCtx, events: &mut Vec<SchedCoreEvent>) -> SimResult<()> {
        self.boost(ctx, events)?;
        self.age(ctx, events)
    }
}

impl MlfqScheduler {
    pub fn queue_id(&self, level: Level) -> QueueId {
        self.levels[level.index()]
    }

    pub fn enqueue_at(
        &mut self,
        ctx: &mut SimCtx,
        proc: ProcId,
        level: Level,
        at_head: bool,
    ) -> SimResult<()> {
        ctx.proc_mut(proc).level = level;
        ctx.queue_push(self.queue_id(level), proc, at_head)
    }

    /// Head of the highest non-empty level.
    pub fn dequeue_next(&mut self, ctx: &mut SimCtx) -> Option<ProcId> {
        self.levels.iter().find_map(|&queue| ctx.queue_pop(queue))
    }

    /// Move one level up and jump to the head of that queue.
    pub fn promote(&mut self, ctx: &mut SimCtx, proc: ProcId) -> SimResult<()> {
        if ctx.proc_in_any_queue(proc) {
            ctx.queue_remove(proc)?;
        }
        let p = ctx.proc_mut(proc);
        p.level = p.level.higher();
        self.enqueue(ctx, proc, ENQ_HEAD)
    }

    /// Move one level down and join the tail of that queue.
    pub fn demote(&mut self, ctx: &mut SimCtx, proc: ProcId) -> SimResult<()> {
        if ctx.proc_in_any_queue(proc) {
            ctx.queue_remove(proc)?;
        }
        let to = ctx.proc(proc).level.lower();
        self.enqueue_at(ctx, proc, to, false)
    }

    fn boost(&mut self, ctx: &mut SimCtx, events: &mut Vec<SchedCoreEvent>) -> SimResult<()> {
        let Some(interval) = self.boost_interval else {
            return Ok(());
        };
        if ctx.now == 0 || ctx.now % interval != 0 {
            return Ok(());
        }

        for from in [Level::Q1, Level::Q2] {
            while let Some(proc) = ctx.queue_pop(self.queue_id(from)) {
                self.enqueue_at(ctx, proc, Level::Q0, false)?;
                debug!("t={} {} boosted {from} -> Q0", ctx.now, ctx.proc(proc).name);
                events.push(SchedCoreEvent::Boosted { proc, from });
            }
        }
        Ok(())
    }

    fn age(&mut self, ctx: &mut SimCtx, events: &mut Vec<SchedCoreEvent>) -> SimResult<()> {
        let Some(aging) = self.aging else {
            return Ok(());
        };

        // Q1 before Q2 so nothing climbs two levels in one tick
        for from in [Level::Q1, Level::Q2] {
            let overdue = aging.overdue(ctx, self.queue_id(from))?;
            // Each promotion lands at the head; go backwards to keep FIFO order.
            for &proc in overdue.iter().rev() {
                self.promote(ctx, proc)?;
                let to = ctx.proc(proc).level;
                debug!("t={} {} aged {from} -> {to}", ctx.now, ctx.proc(proc).name);
                events.push(SchedCoreEvent::Promoted { proc, from, to });
            }
        }
        Ok(())
    }
}
