use log::debug;

use super::{
    event::SchedCoreEvent,
    observer::Observer,
    state::{ProcId, ProcState, SimCtx, Ticks},
    timeline::TimelineBuilder,
    variance::VarianceGen,
};
use crate::{
    error::{SimError, SimResult},
    scheduler::{ENQ_ARRIVAL, ENQ_PREEMPT, ENQ_WAKEUP, ENQ_YIELD, Scheduler},
    sim::Settings,
};

pub struct SchedCore<S: Scheduler> {
    pub ctx: SimCtx,
    pub scheduler: S,
    variance: VarianceGen,
    timeline: TimelineBuilder,
    observer: Observer,
}

impl<S: Scheduler> SchedCore<S> {
    pub fn new(settings: &Settings) -> Self {
        let mut ctx = SimCtx::new();
        let scheduler = S::init(&mut ctx, settings);
        Self {
            ctx,
            scheduler,
            variance: VarianceGen::new(
                settings.cpu_variance,
                settings.io_variance,
                settings.rng_seed,
            ),
            timeline: TimelineBuilder::new(),
            observer: Observer::new(),
        }
    }

    /// Admit a newly arrived process at its initial level.
    pub fn admit(&mut self, proc: ProcId, events: &mut Vec<SchedCoreEvent>) -> SimResult<()> {
        self.ctx.mark_ready(proc)?;
        self.scheduler.enqueue(&mut self.ctx, proc, ENQ_ARRIVAL)?;

        let p = self.ctx.proc(proc);
        debug!("t={} {} arrived at {}", self.ctx.now, p.name, p.level);
        events.push(SchedCoreEvent::Arrived {
            proc,
            level: p.level,
        });
        Ok(())
    }

    /// Run one tick: housekeeping, I/O completions, dispatch, one tick of CPU,
    /// then the end-of-tick transitions of whoever ran.
    pub fn tick(&mut self, events: &mut Vec<SchedCoreEvent>) -> SimResult<()> {
        self.scheduler.tick(&mut self.ctx, events)?;
        self.wake_blocked(events)?;

        if self.ctx.running.is_none() {
            self.try_dispatch(events)?;
        }
        self.ctx.account_waiting();

        let current = self.ctx.running;
        match current {
            Some(proc) => self.run_tick(proc)?,
            None => events.push(SchedCoreEvent::CpuIdle),
        }
        self.observer.observe(&self.ctx)?;

        self.ctx.advance_time(1);
        if let Some(proc) = current {
            self.finish_tick(proc, events)?;
        }
        Ok(())
    }

    fn wake_blocked(&mut self, events: &mut Vec<SchedCoreEvent>) -> SimResult<()> {
        for proc in self.ctx.take_woken() {
            self.ctx.mark_ready(proc)?;
            self.scheduler.enqueue(&mut self.ctx, proc, ENQ_WAKEUP)?;

            let p = self.ctx.proc(proc);
            debug!("t={} {} finished I/O, back on {}", self.ctx.now, p.name, p.level);
            events.push(SchedCoreEvent::Woke {
                proc,
                level: p.level,
            });
        }
        Ok(())
    }

    fn try_dispatch(&mut self, events: &mut Vec<SchedCoreEvent>) -> SimResult<()> {
        let Some(proc) = self.scheduler.dispatch(&mut self.ctx) else {
            return Ok(());
        };

        let p = self.ctx.proc_mut(proc);
        if !p.burst_jittered {
            let nominal = p.cpu_bursts[p.burst_index];
            p.remaining_in_burst = self.variance.cpu_burst(nominal);
            p.burst_jittered = true;
        }
        let level = p.level;
        let remaining = p.remaining_in_burst;

        let slice = self.scheduler.quantum(level).map(|q| q.min(remaining));
        self.ctx.set_running(proc, slice)?;

        debug!(
            "t={} dispatch {} from {level} (burst left {remaining}, slice {slice:?})",
            self.ctx.now,
            self.ctx.proc(proc).name
        );
        events.push(SchedCoreEvent::Dispatched { proc, level, slice });
        Ok(())
    }

    fn run_tick(&mut self, proc: ProcId) -> SimResult<()> {
        let now = self.ctx.now;
        let p = self.ctx.proc_mut(proc);

        p.remaining_in_burst = p.remaining_in_burst.checked_sub(1).ok_or_else(|| {
            SimError::InvariantViolated(format!("process {} ran with an empty burst", p.name))
        })?;
        match &mut p.state {
            ProcState::Running {
                slice_left: Some(slice),
            } => {
                *slice = slice.checked_sub(1).ok_or_else(|| {
                    SimError::InvariantViolated(format!("process {proc} ran past its quantum"))
                })?;
            }
            ProcState::Running { slice_left: None } => {}
            state => {
                return Err(SimError::InvariantViolated(format!(
                    "cpu holds process {proc} in state {state:?}"
                )));
            }
        }
        p.cpu_time += 1;

        self.timeline.record(now, proc, p.level);
        Ok(())
    }

    // Called with the clock already advanced past the tick that just ran.
    fn finish_tick(&mut self, proc: ProcId, events: &mut Vec<SchedCoreEvent>) -> SimResult<()> {
        let now = self.ctx.now;
        let p = self.ctx.proc(proc);
        let burst_done = p.remaining_in_burst == 0;
        let last_burst = p.is_last_burst();
        let next_io = p.io_bursts.get(p.burst_index).copied();
        let from = p.level;
        let slice_expired = matches!(
            p.state,
            ProcState::Running {
                slice_left: Some(0)
            }
        );

        if burst_done {
            self.ctx.clear_cpu();
            if last_burst {
                self.ctx.mark_terminated(proc)?;
                debug!("t={now} {} terminated", self.ctx.proc(proc).name);
                events.push(SchedCoreEvent::Terminated { proc });
                return Ok(());
            }

            let nominal_io = next_io.ok_or_else(|| {
                SimError::InvariantViolated(format!("process {proc} has no I/O burst to block on"))
            })?;
            let io = self.variance.io_burst(nominal_io);

            let p = self.ctx.proc_mut(proc);
            p.burst_index += 1;
            p.remaining_in_burst = p.cpu_bursts[p.burst_index];
            p.burst_jittered = false;
            p.io_time = p.io_time.saturating_add(io);

            if io == 0 {
                self.ctx.mark_ready(proc)?;
                self.scheduler.enqueue(&mut self.ctx, proc, ENQ_YIELD)?;
                debug!("t={now} {} yielded, requeued on {from}", self.ctx.proc(proc).name);
                events.push(SchedCoreEvent::Requeued { proc, level: from });
            } else {
                // A wake tick past the clock's range never fires; the tick budget ends the run
                let until = now.saturating_add(io);
                self.ctx.mark_blocked(proc, until)?;
                debug!("t={now} {} blocked on I/O until {until}", self.ctx.proc(proc).name);
                events.push(SchedCoreEvent::Blocked { proc, until });
            }
        } else if slice_expired {
            self.ctx.clear_cpu();
            self.ctx.mark_ready(proc)?;
            self.scheduler.enqueue(&mut self.ctx, proc, ENQ_PREEMPT)?;
            let to = self.ctx.proc(proc).level;
            debug!("t={now} {} used its quantum, {from} -> {to}", self.ctx.proc(proc).name);
            events.push(SchedCoreEvent::Demoted { proc, from, to });
        }

        Ok(())
    }

    pub fn now(&self) -> Ticks {
        self.ctx.now
    }

    pub fn timeline(&self) -> &TimelineBuilder {
        &self.timeline
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }
}
