use mlfq_model::{
    Level, MlfqScheduler, ProcessSpec, QueueChange, SchedCoreEvent, Settings, Sim, SimError,
    SimulationResult, simulate,
};
use rand::prelude::*;

fn settings() -> Settings {
    Settings {
        rng_seed: Some(0),
        ..Settings::default()
    }
}

fn history(result: &SimulationResult, pid: &str) -> Vec<(u64, u8)> {
    result.metrics[pid]
        .queue_history
        .iter()
        .map(|&QueueChange { tick, level }| (tick, level))
        .collect()
}

fn bars(result: &SimulationResult) -> Vec<(&str, u64, u64, u8)> {
    result
        .gantt
        .iter()
        .map(|e| (e.pid.as_str(), e.start, e.end, e.level))
        .collect()
}

#[test]
fn single_cpu_bound_process_sinks_one_level_per_quantum() {
    let result = simulate(&[ProcessSpec::new("P1", 0, vec![10], vec![])], &settings()).unwrap();

    assert_eq!(bars(&result), vec![("P1", 0, 4, 0), ("P1", 4, 10, 1)]);
    let m = &result.metrics["P1"];
    assert_eq!(m.completion_time, 10);
    assert_eq!(m.waiting_time, 0);
    assert_eq!(m.turnaround_time, 10);
    assert_eq!(m.response_time, 0);
    assert_eq!(m.context_switches, 2);
    assert_eq!(history(&result, "P1"), vec![(0, 0), (4, 1)]);
    assert_eq!(result.summary.cpu_utilization, 1.0);
    assert_eq!(result.summary.throughput, 0.1);
}

#[test]
fn long_burst_reaches_fcfs_level() {
    let result = simulate(&[ProcessSpec::new("P1", 0, vec![14], vec![])], &settings()).unwrap();
    assert_eq!(
        bars(&result),
        vec![("P1", 0, 4, 0), ("P1", 4, 12, 1), ("P1", 12, 14, 2)]
    );
}

#[test]
fn simultaneous_arrivals_run_in_pid_order() {
    let procs = [
        ProcessSpec::new("P2", 0, vec![4], vec![]),
        ProcessSpec::new("P1", 0, vec![4], vec![]),
    ];
    let result = simulate(&procs, &settings()).unwrap();

    assert_eq!(bars(&result), vec![("P1", 0, 4, 0), ("P2", 4, 8, 0)]);
    assert_eq!(result.metrics["P1"].waiting_time, 0);
    assert_eq!(result.metrics["P2"].waiting_time, 4);
    assert_eq!(result.metrics["P2"].response_time, 4);
    assert_eq!(result.summary.avg_waiting, 2.0);
    assert_eq!(result.summary.avg_turnaround, 6.0);
}

#[test]
fn io_burst_leaves_cpu_idle() {
    let result = simulate(&[ProcessSpec::new("P1", 0, vec![2, 3], vec![5])], &settings()).unwrap();

    assert_eq!(bars(&result), vec![("P1", 0, 2, 0), ("P1", 7, 10, 0)]);
    let m = &result.metrics["P1"];
    assert_eq!(m.io_time, 5);
    assert_eq!(m.turnaround_time, 10);
    assert_eq!(history(&result, "P1"), vec![(0, 0), (7, 0)]);
    assert_eq!(result.summary.idle_ticks, 5);
    assert_eq!(result.summary.cpu_utilization, 0.5);
}

#[test]
fn io_return_keeps_level_and_waits_its_turn() {
    let procs = [
        ProcessSpec::new("P1", 0, vec![2, 2], vec![3]),
        ProcessSpec::new("P2", 0, vec![6], vec![]),
    ];
    let result = simulate(&procs, &settings()).unwrap();

    assert_eq!(
        bars(&result),
        vec![
            ("P1", 0, 2, 0),
            ("P2", 2, 6, 0),
            ("P1", 6, 8, 0),
            ("P2", 8, 10, 1),
        ]
    );

    let p1 = &result.metrics["P1"];
    assert_eq!((p1.completion_time, p1.waiting_time, p1.io_time), (8, 1, 3));
    let p2 = &result.metrics["P2"];
    assert_eq!((p2.completion_time, p2.waiting_time, p2.response_time), (10, 4, 2));
}

#[test]
fn zero_length_io_requeues_without_blocking() {
    let procs = [
        ProcessSpec::new("A", 0, vec![2, 2], vec![0]),
        ProcessSpec::new("B", 0, vec![3], vec![]),
    ];
    let result = simulate(&procs, &settings()).unwrap();

    assert_eq!(
        bars(&result),
        vec![("A", 0, 2, 0), ("B", 2, 5, 0), ("A", 5, 7, 0)]
    );
    assert_eq!(result.metrics["A"].io_time, 0);
    assert_eq!(result.metrics["A"].waiting_time, 3);
}

#[test]
fn late_arrival_leaves_leading_idle_gap() {
    let result = simulate(&[ProcessSpec::new("P1", 3, vec![2], vec![])], &settings()).unwrap();

    assert_eq!(bars(&result), vec![("P1", 3, 5, 0)]);
    assert_eq!(result.metrics["P1"].turnaround_time, 2);
    assert_eq!(result.summary.total_time, 5);
    assert_eq!(result.summary.idle_ticks, 3);
}

#[test]
fn priority_hint_sets_starting_level() {
    let procs = [ProcessSpec::new("P1", 0, vec![10], vec![]).with_priority(2)];
    let result = simulate(&procs, &settings()).unwrap();
    assert_eq!(bars(&result), vec![("P1", 0, 10, 2)]);
}

fn starvation_workload() -> Vec<ProcessSpec> {
    vec![
        ProcessSpec::new("hi", 0, vec![20], vec![]),
        ProcessSpec::new("lo", 0, vec![3], vec![]).with_priority(2),
    ]
}

#[test]
fn without_aging_low_priority_waits_at_q2() {
    let result = simulate(&starvation_workload(), &settings()).unwrap();
    assert_eq!(
        bars(&result),
        vec![
            ("hi", 0, 4, 0),
            ("hi", 4, 12, 1),
            ("lo", 12, 15, 2),
            ("hi", 15, 23, 2),
        ]
    );
}

#[test]
fn aging_promotes_after_threshold_ticks_of_waiting() {
    let settings = Settings {
        aging_enabled: true,
        aging_threshold: 5,
        ..settings()
    };
    let mut sim = Sim::<MlfqScheduler>::new(starvation_workload(), &settings).unwrap();

    let mut promotions = Vec::new();
    while !sim.all_processes_terminated() {
        let now = sim.now();
        for event in sim.step().unwrap() {
            if let SchedCoreEvent::Promoted { proc, from, to } = event {
                promotions.push((now, sim.process_name(proc).to_string(), from, to));
            }
        }
    }

    assert_eq!(
        promotions,
        vec![
            (5, "lo".to_string(), Level::Q2, Level::Q1),
            (10, "lo".to_string(), Level::Q1, Level::Q0),
        ]
    );

    let result = sim.report().unwrap();
    assert_eq!(
        bars(&result),
        vec![
            ("hi", 0, 4, 0),
            ("hi", 4, 12, 1),
            ("lo", 12, 15, 0),
            ("hi", 15, 23, 2),
        ]
    );
    assert_eq!(result.metrics["lo"].waiting_time, 12);
    assert_eq!(history(&result, "lo"), vec![(0, 2), (5, 1), (10, 0)]);
}

#[test]
fn periodic_boost_lifts_waiting_processes() {
    let settings = Settings {
        boost_interval: Some(6),
        ..settings()
    };
    let result = simulate(&starvation_workload(), &settings).unwrap();
    assert_eq!(bars(&result)[2], ("lo", 12, 15, 0));
}

#[test]
fn budget_exhaustion_is_an_error() {
    let settings = Settings {
        max_ticks: 50,
        ..settings()
    };
    let err = simulate(&[ProcessSpec::new("P1", 0, vec![100], vec![])], &settings).unwrap_err();
    assert_eq!(
        err,
        SimError::SimulationBudgetExceeded {
            max_ticks: 50,
            unfinished: 1
        }
    );

    // Exactly enough ticks is fine
    let settings = Settings {
        max_ticks: 100,
        ..settings
    };
    assert!(simulate(&[ProcessSpec::new("P1", 0, vec![100], vec![])], &settings).is_ok());
}

#[test]
fn unbounded_io_wait_runs_into_the_budget() {
    let settings = Settings {
        max_ticks: 100,
        ..settings()
    };
    let procs = [ProcessSpec::new("P1", 0, vec![1, 1], vec![u64::MAX])];
    let expected = SimError::SimulationBudgetExceeded {
        max_ticks: 100,
        unfinished: 1,
    };
    assert_eq!(simulate(&procs, &settings).unwrap_err(), expected);

    let jittered = Settings {
        io_variance: 0.5,
        ..settings
    };
    assert_eq!(simulate(&procs, &jittered).unwrap_err(), expected);
}

#[test]
fn invalid_input_never_starts() {
    let bad = [ProcessSpec::new("P1", 0, vec![3, 3], vec![])];
    assert!(matches!(
        simulate(&bad, &settings()),
        Err(SimError::InvalidProcessDefinition { .. })
    ));

    let settings = Settings {
        io_variance: 1.5,
        ..settings()
    };
    assert!(matches!(
        simulate(&[ProcessSpec::new("P1", 0, vec![3], vec![])], &settings),
        Err(SimError::InvalidSettings(_))
    ));
}

#[test]
fn empty_workload_is_trivial() {
    let result = simulate(&[], &settings()).unwrap();
    assert!(result.gantt.is_empty());
    assert!(result.metrics.is_empty());
    assert_eq!(result.summary.total_time, 0);
    assert_eq!(result.summary.cpu_utilization, 0.0);
    assert_eq!(result.summary.throughput, 0.0);
}

fn random_workload(rng: &mut StdRng) -> Vec<ProcessSpec> {
    let n = rng.random_range(1..=8);
    (0..n)
        .map(|i| {
            let bursts = rng.random_range(1..=4);
            let cpu = (0..bursts).map(|_| rng.random_range(1..=15)).collect();
            let io = (1..bursts).map(|_| rng.random_range(0..=6)).collect();
            ProcessSpec::new(format!("P{i}"), rng.random_range(0..=20), cpu, io)
                .with_priority(rng.random_range(0..=2))
        })
        .collect()
}

fn random_settings(rng: &mut StdRng, seed: u64) -> Settings {
    Settings {
        aging_enabled: rng.random_bool(0.5),
        aging_threshold: rng.random_range(1..=10),
        cpu_variance: rng.random_range(0.0..0.9),
        io_variance: rng.random_range(0.0..0.9),
        rng_seed: Some(seed),
        boost_interval: rng.random_bool(0.2).then(|| rng.random_range(5..=30)),
        ..Settings::default()
    }
}

#[test]
fn accounting_holds_for_random_workloads() {
    for seed in 0..200 {
        let mut rng = StdRng::seed_from_u64(seed);
        let procs = random_workload(&mut rng);
        let settings = random_settings(&mut rng, seed);
        let result = simulate(&procs, &settings).unwrap();

        // Single cpu: bars are ordered and never overlap
        for pair in result.gantt.windows(2) {
            assert!(pair[0].end <= pair[1].start, "seed {seed}: overlap {pair:?}");
        }

        for spec in &procs {
            let m = &result.metrics[&spec.pid];
            assert_eq!(m.turnaround_time, m.completion_time - spec.arrival_time);
            assert_eq!(m.waiting_time + m.cpu_time + m.io_time, m.turnaround_time);
            assert!(m.turnaround_time >= m.cpu_time);

            let ran: u64 = result
                .gantt
                .iter()
                .filter(|e| e.pid == spec.pid)
                .map(|e| e.end - e.start)
                .sum();
            assert_eq!(ran, m.cpu_time, "seed {seed}: {}", spec.pid);

            if settings.cpu_variance == 0.0 {
                assert_eq!(m.cpu_time, spec.total_cpu());
            }
        }

        let busy: u64 = result.gantt.iter().map(|e| e.end - e.start).sum();
        assert_eq!(busy + result.summary.idle_ticks, result.summary.total_time);
    }
}

#[test]
fn without_variance_cpu_time_matches_nominal_demand() {
    for seed in 0..50 {
        let mut rng = StdRng::seed_from_u64(seed);
        let procs = random_workload(&mut rng);
        let result = simulate(&procs, &settings()).unwrap();
        for spec in &procs {
            let m = &result.metrics[&spec.pid];
            assert_eq!(m.cpu_time, spec.total_cpu());
            assert!(m.turnaround_time >= spec.total_cpu());
            assert_eq!(m.io_time, spec.io_bursts.iter().sum::<u64>());
        }
    }
}

#[test]
fn same_seed_reproduces_byte_identical_output() {
    let mut rng = StdRng::seed_from_u64(7);
    let procs = random_workload(&mut rng);
    let settings = Settings {
        cpu_variance: 0.5,
        io_variance: 0.5,
        aging_enabled: true,
        rng_seed: Some(1234),
        ..Settings::default()
    };

    let a = serde_json::to_string(&simulate(&procs, &settings).unwrap()).unwrap();
    let b = serde_json::to_string(&simulate(&procs, &settings).unwrap()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn concurrent_runs_do_not_interfere() {
    let procs = starvation_workload();
    let settings = Settings {
        cpu_variance: 0.4,
        rng_seed: Some(99),
        ..Settings::default()
    };
    let expected = simulate(&procs, &settings).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let procs = procs.clone();
            let settings = settings.clone();
            std::thread::spawn(move || simulate(&procs, &settings).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
