use super::state::{Level, ProcId, Ticks};

/// A contiguous stretch of CPU time given to one process at one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub proc: ProcId,
    pub level: Level,
    pub start: Ticks,
    // Exclusive
    pub end: Ticks,
}

/// Coalesces per-tick CPU assignments into Gantt segments.
#[derive(Debug, Default)]
pub struct TimelineBuilder {
    segments: Vec<Segment>,
    busy_ticks: Ticks,
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tick: Ticks, proc: ProcId, level: Level) {
        self.busy_ticks += 1;

        match self.segments.last_mut() {
            Some(last) if last.proc == proc && last.level == level && last.end == tick => {
                last.end += 1;
            }
            _ => self.segments.push(Segment {
                proc,
                level,
                start: tick,
                end: tick + 1,
            }),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn busy_ticks(&self) -> Ticks {
        self.busy_ticks
    }
}
