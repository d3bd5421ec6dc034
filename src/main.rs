use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, info};
use rand::prelude::*;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::{fs, io::Read, path::PathBuf};

use mlfq_model::{MlfqScheduler, ProcessSpec, Settings, Sim, SimulationRequest};

/// Simulate a three-level feedback queue scheduler and print the Gantt trace
/// and metrics as JSON.
#[derive(Debug, Parser)]
#[command(version)]
struct Opts {
    /// Request file ({"processes": [...], "settings": {...}}). Reads stdin if omitted.
    input: Option<PathBuf>,

    /// Generate a Bernoulli-arrival workload spanning this many ticks instead of reading a request.
    #[clap(long)]
    generate: Option<u64>,

    /// Per-tick arrival probability for --generate.
    #[clap(long, default_value = "0.3")]
    p_arrival: f64,

    /// Probability that a generated burst is short.
    #[clap(long, default_value = "0.3")]
    p_short: f64,

    #[clap(long, default_value = "3")]
    short_ticks: u64,

    #[clap(long, default_value = "12")]
    long_ticks: u64,

    /// Seed for the workload generator and burst variance. Overrides the request's seed.
    #[clap(long)]
    seed: Option<u64>,

    /// Enable aging for generated workloads.
    #[clap(long)]
    aging: bool,

    /// Print every scheduling event to stderr.
    #[clap(long)]
    trace: bool,

    #[clap(long)]
    pretty: bool,

    /// Enable verbose output. Specify multiple times to increase verbosity.
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    let level = match opts.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)?;

    let mut request = match opts.generate {
        Some(ticks) => SimulationRequest {
            processes: bernoulli_jobs(
                ticks,
                opts.p_arrival,
                opts.p_short,
                opts.short_ticks,
                opts.long_ticks,
                opts.seed.unwrap_or(0),
            )?,
            settings: Settings {
                aging_enabled: opts.aging,
                ..Settings::default()
            },
        },
        None => read_request(opts.input.as_ref())?,
    };
    if opts.seed.is_some() {
        request.settings.rng_seed = opts.seed;
    }
    info!("loaded {} process(es)", request.processes.len());

    let mut sim = Sim::<MlfqScheduler>::new(request.processes, &request.settings)?;
    while !sim.all_processes_terminated() {
        let now = sim.now();
        for event in sim.step()? {
            if opts.trace {
                eprintln!("t={} {:?}", now, event);
            }
        }
    }
    let result = sim.report()?;

    let out = if opts.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{out}");
    Ok(())
}

fn read_request(path: Option<&PathBuf>) -> Result<SimulationRequest> {
    let raw = match path {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading request from stdin")?;
            buf
        }
    };
    serde_json::from_str(&raw).context("parsing simulation request")
}

fn bernoulli_jobs(
    ticks: u64,
    p_arrival: f64,
    p_short: f64,
    short_ticks: u64,
    long_ticks: u64,
    seed: u64,
) -> Result<Vec<ProcessSpec>> {
    if !(0.0..=1.0).contains(&p_arrival) || !(0.0..=1.0).contains(&p_short) {
        bail!("probabilities must be within [0, 1]");
    }
    if short_ticks == 0 || long_ticks == 0 {
        bail!("burst lengths must be positive");
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut jobs = Vec::new();

    for t in 0..ticks {
        if rng.random::<f64>() < p_arrival {
            let bursts = rng.random_range(1..=3);
            let cpu_bursts: Vec<u64> = (0..bursts)
                .map(|_| {
                    if rng.random::<f64>() < p_short {
                        short_ticks
                    } else {
                        long_ticks
                    }
                })
                .collect();
            let io_bursts = (1..bursts).map(|_| rng.random_range(1..=6)).collect();

            jobs.push(ProcessSpec::new(
                format!("P{}", jobs.len() + 1),
                t,
                cpu_bursts,
                io_bursts,
            ));
        }
    }

    Ok(jobs)
}
