use crate::core::{Level, ProcId, Ticks};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedCoreEvent {
    Arrived {
        proc: ProcId,
        level: Level,
    },
    // Periodic boost moved a waiting process to Q0
    Boosted {
        proc: ProcId,
        from: Level,
    },
    // Aging promotion
    Promoted {
        proc: ProcId,
        from: Level,
        to: Level,
    },
    Woke {
        proc: ProcId,
        level: Level,
    },
    Dispatched {
        proc: ProcId,
        level: Level,
        slice: Option<Ticks>,
    },
    // Quantum expired
    Demoted {
        proc: ProcId,
        from: Level,
        to: Level,
    },
    // Burst finished with a zero-length I/O burst behind it
    Requeued {
        proc: ProcId,
        level: Level,
    },
    Blocked {
        proc: ProcId,
        until: Ticks,
    },
    Terminated {
        proc: ProcId,
    },
    // CPU idle even after dispatch
    CpuIdle,
}
