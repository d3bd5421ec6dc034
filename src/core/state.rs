use keyed_priority_queue::KeyedPriorityQueue;
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};
use std::{cmp::Ordering, collections::VecDeque, fmt};

use crate::error::{SimError, SimResult};

// Index into the process Vec
pub type ProcId = usize;
pub type Ticks = u64;
new_key_type! {
    pub struct QueueId;
}

/// Priority level of a ready queue. `Q0` is served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Q0,
    Q1,
    Q2,
}

impl Level {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Q0),
            1 => Some(Self::Q1),
            2 => Some(Self::Q2),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Ticks a dispatch may run before preemption; `None` runs the burst to completion.
    pub fn quantum(self) -> Option<Ticks> {
        match self {
            Self::Q0 => Some(4),
            Self::Q1 => Some(8),
            Self::Q2 => None,
        }
    }

    pub fn lower(self) -> Self {
        match self {
            Self::Q0 => Self::Q1,
            Self::Q1 | Self::Q2 => Self::Q2,
        }
    }

    pub fn higher(self) -> Self {
        match self {
            Self::Q0 | Self::Q1 => Self::Q0,
            Self::Q2 => Self::Q1,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.index())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    New,
    Ready,
    // `slice_left` is the quantum remaining for this dispatch; `None` at Q2
    Running { slice_left: Option<Ticks> },
    Blocked { wake_at: Ticks },
    Terminated,
}

impl ProcState {
    fn can_become(&self, next: &ProcState) -> bool {
        use ProcState::*;
        matches!(
            (self, next),
            (New, Ready)
                | (Ready, Running { .. })
                | (Running { .. }, Ready)
                | (Running { .. }, Blocked { .. })
                | (Running { .. }, Terminated)
                | (Blocked { .. }, Ready)
        )
    }
}

#[derive(Debug)]
pub struct Process {
    pub id: ProcId,
    pub name: String,
    pub arrival_time: Ticks,
    pub cpu_bursts: Vec<Ticks>,
    pub io_bursts: Vec<Ticks>,

    pub state: ProcState,
    pub level: Level,
    pub burst_index: usize,
    pub remaining_in_burst: Ticks,
    // Whether the current CPU burst has had its variance drawn
    pub burst_jittered: bool,
    pub ready_since: Ticks,
    // (tick, level) of every enqueue
    pub queue_history: Vec<(Ticks, Level)>,

    pub first_run_time: Option<Ticks>,
    pub completion_time: Option<Ticks>,
    pub waiting_time: Ticks,
    pub cpu_time: Ticks,
    pub io_time: Ticks,
    pub context_switches: u64,
}

impl Process {
    pub fn is_last_burst(&self) -> bool {
        self.burst_index + 1 >= self.cpu_bursts.len()
    }
}

/// Wake-up key for a blocked process.
#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub struct WakeAt {
    pub tick: Ticks,
    pub proc: ProcId,
}

// KeyedPriorityQueue is a max-heap, so we need to flip-flop WakeAt's Ord
impl PartialOrd for WakeAt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WakeAt {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .tick
            .cmp(&self.tick)
            .then_with(|| other.proc.cmp(&self.proc))
    }
}

#[derive(Debug, Default)]
pub struct ReadyQueue {
    members: VecDeque<ProcId>,
}

impl ReadyQueue {
    pub fn contains(&self, proc: ProcId) -> bool {
        self.members.contains(&proc)
    }

    pub fn iter(&self) -> impl Iterator<Item = ProcId> + '_ {
        self.members.iter().copied()
    }
}

/// All mutable state of one simulation run.
#[derive(Debug)]
pub struct SimCtx {
    pub now: Ticks,
    pub running: Option<ProcId>,
    pub processes: Vec<Process>,
    pub queues: SlotMap<QueueId, ReadyQueue>,
    pub proc_to_queue: FxHashMap<ProcId, QueueId>,
    pub blocked: KeyedPriorityQueue<ProcId, WakeAt>,
}

impl Default for SimCtx {
    fn default() -> Self {
        Self::new()
    }
}

impl SimCtx {
    pub fn new() -> Self {
        Self {
            now: 0,
            running: None,
            processes: Vec::new(),
            queues: SlotMap::with_key(),
            proc_to_queue: FxHashMap::default(),
            blocked: KeyedPriorityQueue::new(),
        }
    }

    pub fn create_process(
        &mut self,
        name: &str,
        arrival_time: Ticks,
        cpu_bursts: &[Ticks],
        io_bursts: &[Ticks],
        level: Level,
    ) -> ProcId {
        let id = self.processes.len();
        let remaining_in_burst = cpu_bursts.first().copied().unwrap_or(0);

        self.processes.push(Process {
            id,
            name: name.to_string(),
            arrival_time,
            cpu_bursts: cpu_bursts.to_vec(),
            io_bursts: io_bursts.to_vec(),
            state: ProcState::New,
            level,
            burst_index: 0,
            remaining_in_burst,
            burst_jittered: false,
            ready_since: arrival_time,
            queue_history: Vec::new(),
            first_run_time: None,
            completion_time: None,
            waiting_time: 0,
            cpu_time: 0,
            io_time: 0,
            context_switches: 0,
        });

        id
    }

    pub fn advance_time(&mut self, delta: Ticks) {
        self.now = self.now.saturating_add(delta);
    }

    pub fn create_queue(&mut self) -> QueueId {
        self.queues.insert(ReadyQueue::default())
    }

    pub fn proc(&self, proc: ProcId) -> &Process {
        &self.processes[proc]
    }

    pub fn proc_mut(&mut self, proc: ProcId) -> &mut Process {
        &mut self.processes[proc]
    }

    pub fn queue(&self, queue: QueueId) -> SimResult<&ReadyQueue> {
        self.queues
            .get(queue)
            .ok_or_else(|| SimError::InvariantViolated(format!("unknown queue {queue:?}")))
    }

    /// Insert a Ready process into `queue` and stamp its `ready_since`.
    pub fn queue_push(&mut self, queue: QueueId, proc: ProcId, at_head: bool) -> SimResult<()> {
        if let Some(current) = self.proc_to_queue.get(&proc) {
            return Err(SimError::InvariantViolated(format!(
                "process {proc} already present in queue {current:?}"
            )));
        }
        if self.proc(proc).state != ProcState::Ready {
            return Err(SimError::InvariantViolated(format!(
                "process {proc} enqueued while {:?}",
                self.proc(proc).state
            )));
        }

        let now = self.now;
        let members = &mut self
            .queues
            .get_mut(queue)
            .ok_or_else(|| SimError::InvariantViolated(format!("unknown queue {queue:?}")))?
            .members;
        if at_head {
            members.push_front(proc);
        } else {
            members.push_back(proc);
        }

        self.proc_to_queue.insert(proc, queue);
        let process = self.proc_mut(proc);
        process.ready_since = now;
        process.queue_history.push((now, process.level));
        Ok(())
    }

    pub fn queue_pop(&mut self, queue: QueueId) -> Option<ProcId> {
        let proc = self.queues.get_mut(queue)?.members.pop_front()?;

        let removed = self.proc_to_queue.remove(&proc);
        debug_assert!(removed.is_some(), "Process {proc} missing queue membership");

        Some(proc)
    }

    pub fn queue_remove(&mut self, proc: ProcId) -> SimResult<QueueId> {
        let queue = self.proc_to_queue.remove(&proc).ok_or_else(|| {
            SimError::InvariantViolated(format!("process {proc} is not in any queue"))
        })?;
        let members = &mut self
            .queues
            .get_mut(queue)
            .ok_or_else(|| SimError::InvariantViolated(format!("unknown queue {queue:?}")))?
            .members;
        let pos = members.iter().position(|&p| p == proc).ok_or_else(|| {
            SimError::InvariantViolated(format!("queue {queue:?} lost process {proc}"))
        })?;
        members.remove(pos);
        Ok(queue)
    }

    pub fn proc_in_any_queue(&self, proc: ProcId) -> bool {
        self.proc_to_queue.contains_key(&proc)
    }

    fn transition(&mut self, proc: ProcId, next: ProcState) -> SimResult<ProcState> {
        let current = self.proc(proc).state;
        if !current.can_become(&next) {
            return Err(SimError::InvariantViolated(format!(
                "illegal transition for process {proc}: {current:?} -> {next:?}"
            )));
        }
        self.proc_mut(proc).state = next;
        Ok(current)
    }

    pub fn mark_ready(&mut self, proc: ProcId) -> SimResult<()> {
        self.transition(proc, ProcState::Ready)?;
        Ok(())
    }

    pub fn set_running(&mut self, proc: ProcId, slice_left: Option<Ticks>) -> SimResult<()> {
        if let Some(current) = self.running {
            return Err(SimError::InvariantViolated(format!(
                "cpu already running process {current}"
            )));
        }
        debug_assert!(
            !self.proc_in_any_queue(proc),
            "Running process {proc} must not be enqueued"
        );

        self.transition(proc, ProcState::Running { slice_left })?;
        self.running = Some(proc);

        let now = self.now;
        let process = self.proc_mut(proc);
        process.first_run_time.get_or_insert(now);
        process.context_switches += 1;
        Ok(())
    }

    pub fn clear_cpu(&mut self) {
        self.running = None;
    }

    pub fn mark_blocked(&mut self, proc: ProcId, wake_at: Ticks) -> SimResult<()> {
        debug_assert!(
            !self.proc_in_any_queue(proc),
            "Blocking process {proc} that is still enqueued"
        );
        self.transition(proc, ProcState::Blocked { wake_at })?;
        self.blocked.push(
            proc,
            WakeAt {
                tick: wake_at,
                proc,
            },
        );
        Ok(())
    }

    pub fn mark_terminated(&mut self, proc: ProcId) -> SimResult<()> {
        self.transition(proc, ProcState::Terminated)?;

        let now = self.now;
        let process = self.proc_mut(proc);
        process.completion_time = Some(now);
        process.remaining_in_burst = 0;
        process.burst_index += 1;
        Ok(())
    }

    /// Pop every blocked process whose I/O completes at or before `now`, earliest first.
    pub fn take_woken(&mut self) -> Vec<ProcId> {
        let mut woken = Vec::new();
        while let Some((_, wake)) = self.blocked.peek() {
            if wake.tick > self.now {
                break;
            }
            if let Some((proc, _)) = self.blocked.pop() {
                woken.push(proc);
            }
        }
        woken
    }

    /// Charge one tick of waiting to every process sitting in a ready queue.
    pub fn account_waiting(&mut self) {
        for &proc in self.proc_to_queue.keys() {
            self.processes[proc].waiting_time += 1;
        }
    }

    pub fn unfinished(&self) -> usize {
        self.processes
            .iter()
            .filter(|p| p.state != ProcState::Terminated)
            .count()
    }

    pub fn all_terminated(&self) -> bool {
        self.unfinished() == 0
    }
}
