use super::state::{ProcState, SimCtx};
use crate::error::{SimError, SimResult};

/// Per-tick structural checks over the whole run context.
#[derive(Debug, Default)]
pub struct Observer {
    step: u64,
}

fn check(ok: bool, fault: impl FnOnce() -> String) -> SimResult<()> {
    if ok {
        Ok(())
    } else {
        Err(SimError::InvariantViolated(fault()))
    }
}

impl Observer {
    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn steps(&self) -> u64 {
        self.step
    }

    pub fn observe(&mut self, ctx: &SimCtx) -> SimResult<()> {
        self.step += 1;

        let running = ctx
            .processes
            .iter()
            .filter(|p| matches!(p.state, ProcState::Running { .. }))
            .count();
        check(running <= 1, || {
            format!("{running} processes Running on a single cpu")
        })?;

        if let Some(proc) = ctx.running {
            check(
                matches!(ctx.proc(proc).state, ProcState::Running { .. }),
                || format!("cpu holds process {proc}, which is not Running"),
            )?;
        }

        for (&proc, &queue) in &ctx.proc_to_queue {
            let state = ctx.proc(proc).state;
            check(state == ProcState::Ready, || {
                format!("process {proc} in queue {queue:?} is {state:?}, not Ready")
            })?;
            check(ctx.queue(queue)?.contains(proc), || {
                format!("queue {queue:?} does not hold process {proc}")
            })?;
        }

        for (&proc, wake) in ctx.blocked.iter() {
            let state = ctx.proc(proc).state;
            check(
                state == ProcState::Blocked { wake_at: wake.tick },
                || format!("process {proc} waits on I/O while {state:?}"),
            )?;
        }

        for p in &ctx.processes {
            check(
                p.remaining_in_burst > 0
                    || matches!(p.state, ProcState::Running { .. } | ProcState::Terminated),
                || format!("process {} has an empty burst while {:?}", p.id, p.state),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Level;

    fn ready_ctx() -> SimCtx {
        let mut ctx = SimCtx::new();
        let q = ctx.create_queue();
        for name in ["A", "B"] {
            let proc = ctx.create_process(name, 0, &[3], &[], Level::Q0);
            ctx.mark_ready(proc).unwrap();
            ctx.queue_push(q, proc, false).unwrap();
        }
        ctx
    }

    #[test]
    fn consistent_context_passes() {
        let mut ctx = ready_ctx();
        let mut observer = Observer::new();
        observer.observe(&ctx).unwrap();

        let q = ctx.proc_to_queue[&0];
        let proc = ctx.queue_pop(q).unwrap();
        ctx.set_running(proc, Some(3)).unwrap();
        observer.observe(&ctx).unwrap();
        assert_eq!(observer.steps(), 2);
    }

    #[test]
    fn second_running_process_is_a_fault() {
        let mut ctx = ready_ctx();
        for proc in [0, 1] {
            ctx.queue_remove(proc).unwrap();
            ctx.proc_mut(proc).state = ProcState::Running { slice_left: None };
        }
        ctx.running = Some(0);

        let err = Observer::new().observe(&ctx).unwrap_err();
        assert_eq!(
            err,
            SimError::InvariantViolated("2 processes Running on a single cpu".into())
        );
    }

    #[test]
    fn queued_process_must_be_ready() {
        let mut ctx = ready_ctx();
        ctx.proc_mut(1).state = ProcState::Blocked { wake_at: 4 };

        let err = Observer::new().observe(&ctx).unwrap_err();
        assert!(matches!(err, SimError::InvariantViolated(msg) if msg.contains("not Ready")));
    }
}
