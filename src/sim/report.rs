use average::{Estimate, Mean};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    core::{SimCtx, Ticks, TimelineBuilder},
    error::{SimError, SimResult},
};

/// One Gantt bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub pid: String,
    pub start: Ticks,
    pub end: Ticks,
    pub level: u8,
}

/// The level a process was queued at, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueChange {
    pub tick: Ticks,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessMetrics {
    pub waiting_time: Ticks,
    pub turnaround_time: Ticks,
    pub response_time: Ticks,
    pub completion_time: Ticks,
    pub cpu_time: Ticks,
    pub io_time: Ticks,
    pub context_switches: u64,
    pub queue_history: Vec<QueueChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub avg_waiting: f64,
    pub avg_turnaround: f64,
    pub avg_response: f64,
    pub cpu_utilization: f64,
    pub throughput: f64,
    pub total_time: Ticks,
    pub idle_ticks: Ticks,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub gantt: Vec<TimelineEntry>,
    pub metrics: BTreeMap<String, ProcessMetrics>,
    pub summary: Summary,
}

/// Turn a finished run into per-process and aggregate statistics.
pub fn build_report(ctx: &SimCtx, timeline: &TimelineBuilder) -> SimResult<SimulationResult> {
    let gantt = timeline
        .segments()
        .iter()
        .map(|s| TimelineEntry {
            pid: ctx.proc(s.proc).name.clone(),
            start: s.start,
            end: s.end,
            level: s.level.index() as u8,
        })
        .collect();

    let mut metrics = BTreeMap::new();
    for p in &ctx.processes {
        let (Some(completion_time), Some(first_run)) = (p.completion_time, p.first_run_time) else {
            return Err(SimError::InvariantViolated(format!(
                "process {} reported before it terminated",
                p.name
            )));
        };
        let turnaround_time = completion_time - p.arrival_time;
        let accounted = p
            .waiting_time
            .checked_add(p.cpu_time)
            .and_then(|t| t.checked_add(p.io_time));
        if accounted != Some(turnaround_time) {
            return Err(SimError::InvariantViolated(format!(
                "process {}: waiting {} + cpu {} + io {} != turnaround {}",
                p.name, p.waiting_time, p.cpu_time, p.io_time, turnaround_time
            )));
        }

        metrics.insert(
            p.name.clone(),
            ProcessMetrics {
                waiting_time: p.waiting_time,
                turnaround_time,
                response_time: first_run - p.arrival_time,
                completion_time,
                cpu_time: p.cpu_time,
                io_time: p.io_time,
                context_switches: p.context_switches,
                queue_history: p
                    .queue_history
                    .iter()
                    .map(|&(tick, level)| QueueChange {
                        tick,
                        level: level.index() as u8,
                    })
                    .collect(),
            },
        );
    }

    let total_time = ctx.now;
    let busy = timeline.busy_ticks();
    let per_tick = |x: f64| if total_time == 0 { 0.0 } else { x / total_time as f64 };

    let summary = Summary {
        avg_waiting: avg(metrics.values().map(|m| m.waiting_time as f64)),
        avg_turnaround: avg(metrics.values().map(|m| m.turnaround_time as f64)),
        avg_response: avg(metrics.values().map(|m| m.response_time as f64)),
        cpu_utilization: per_tick(busy as f64),
        throughput: per_tick(metrics.len() as f64),
        total_time,
        idle_ticks: total_time - busy,
    };

    Ok(SimulationResult {
        gantt,
        metrics,
        summary,
    })
}

fn avg(iter: impl Iterator<Item = f64>) -> f64 {
    let mean: Mean = iter.collect();
    if mean.is_empty() { 0.0 } else { mean.estimate() }
}
