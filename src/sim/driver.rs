use log::{info, trace, warn};

use super::{
    job::{ProcessSpec, Settings, validate_workload},
    report::{SimulationResult, build_report},
};
use crate::{
    core::{ProcId, SchedCoreEvent, Ticks, driver::SchedCore},
    error::{SimError, SimResult},
    scheduler::Scheduler,
};

pub struct Sim<S: Scheduler> {
    pub core: SchedCore<S>,
    // Process ids are assigned in (arrival_time, pid) order, so arrivals are a cursor walk
    arrival_cursor: usize,
    max_ticks: Ticks,
}

impl<S: Scheduler> Sim<S> {
    pub fn new(mut processes: Vec<ProcessSpec>, settings: &Settings) -> SimResult<Self> {
        settings.validate()?;
        validate_workload(&processes)?;

        processes.sort_by(|a, b| {
            a.arrival_time
                .cmp(&b.arrival_time)
                .then_with(|| a.pid.cmp(&b.pid))
        });

        let mut core = SchedCore::<S>::new(settings);
        for spec in &processes {
            core.ctx.create_process(
                &spec.pid,
                spec.arrival_time,
                &spec.cpu_bursts,
                &spec.io_bursts,
                spec.level()?,
            );
        }

        Ok(Self {
            core,
            arrival_cursor: 0,
            max_ticks: settings.max_ticks,
        })
    }

    /// Advance the clock by one tick and return what happened during it.
    pub fn step(&mut self) -> SimResult<Vec<SchedCoreEvent>> {
        if self.core.now() >= self.max_ticks {
            let unfinished = self.core.ctx.unfinished();
            warn!(
                "tick budget of {} exhausted with {unfinished} process(es) unfinished",
                self.max_ticks
            );
            return Err(SimError::SimulationBudgetExceeded {
                max_ticks: self.max_ticks,
                unfinished,
            });
        }

        let mut events = Vec::new();
        self.handle_arrivals(&mut events)?;
        self.core.tick(&mut events)?;
        Ok(events)
    }

    fn handle_arrivals(&mut self, events: &mut Vec<SchedCoreEvent>) -> SimResult<()> {
        let now = self.core.now();
        while let Some(proc) = self.next_arrival(now) {
            self.core.admit(proc, events)?;
            self.arrival_cursor += 1;
        }
        Ok(())
    }

    fn next_arrival(&self, now: Ticks) -> Option<ProcId> {
        let proc = self.arrival_cursor;
        // Contiguous, since processes are sorted by arrival
        (proc < self.core.ctx.processes.len() && self.core.ctx.proc(proc).arrival_time == now)
            .then_some(proc)
    }

    pub fn all_processes_terminated(&self) -> bool {
        self.core.ctx.all_terminated()
    }

    pub fn now(&self) -> Ticks {
        self.core.now()
    }

    pub fn process_name(&self, proc: ProcId) -> &str {
        &self.core.ctx.proc(proc).name
    }

    pub fn report(&self) -> SimResult<SimulationResult> {
        build_report(&self.core.ctx, self.core.timeline())
    }

    /// Step until every process has terminated, then report.
    pub fn run(mut self) -> SimResult<SimulationResult> {
        info!(
            "simulating {} process(es), budget {} ticks",
            self.core.ctx.processes.len(),
            self.max_ticks
        );

        while !self.all_processes_terminated() {
            let now = self.now();
            for event in self.step()? {
                trace!("t={now} {event:?}");
            }
        }

        let result = self.report()?;
        info!(
            "finished at t={} after {} observed ticks, cpu utilization {:.2}",
            result.summary.total_time,
            self.core.observer().steps(),
            result.summary.cpu_utilization
        );
        Ok(result)
    }
}
