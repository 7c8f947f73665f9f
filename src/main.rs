use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use loadsim::prelude::*;
use loadsim::scheduler::ExecutionTrace;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "loadsim")]
#[command(about = "Multiprocessor load-balancing simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one simulation
    Run {
        #[command(flatten)]
        sim: SimArgs,

        /// Write the report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Record an execution trace and write it as JSON
        #[arg(long)]
        trace_output: Option<PathBuf>,

        /// Print turnaround percentiles and per-processor rows
        #[arg(short, long)]
        verbose: bool,

        /// Log live progress every N milliseconds
        #[arg(long)]
        progress_ms: Option<u64>,
    },
    /// Run both strategies with the same seed and workload
    Compare {
        #[command(flatten)]
        sim: SimArgs,

        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Args, Clone)]
struct SimArgs {
    /// Load the base configuration from a JSON file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of processors
    #[arg(short, long)]
    processors: Option<usize>,

    /// Balancing strategy (centralized, work-stealing)
    #[arg(short, long)]
    strategy: Option<String>,

    /// Initial assignment (shortest-queue, round-robin, origin)
    #[arg(short, long)]
    assignment: Option<String>,

    /// Ticks during which tasks arrive
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Stop generating after this many tasks
    #[arg(long)]
    max_tasks: Option<u64>,

    /// Extra ticks allowed to finish outstanding work
    #[arg(long)]
    drain: Option<u64>,

    /// Centralized rebalance interval in ticks
    #[arg(long)]
    interval: Option<u64>,

    /// Centralized imbalance threshold
    #[arg(long)]
    threshold: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Arrival policy (uniform, fixed, bursty)
    #[arg(long)]
    arrival: Option<String>,

    /// Tasks per tick (fixed)
    #[arg(long, default_value = "1")]
    per_tick: u32,

    /// Lower bound on tasks per tick (uniform)
    #[arg(long, default_value = "0")]
    min_tasks: u32,

    /// Upper bound on tasks per tick (uniform) or burst size (bursty)
    #[arg(long, default_value = "2")]
    max_tasks_per_tick: u32,

    #[arg(long, default_value = "1")]
    min_length: u64,

    #[arg(long, default_value = "5")]
    max_length: u64,

    /// Single-arrival probability per tick (bursty)
    #[arg(long, default_value = "0.6")]
    arrival_probability: f64,

    /// Burst probability per tick (bursty)
    #[arg(long, default_value = "0.05")]
    burst_probability: f64,

    /// Fail a processor: TICK:PROCESSOR (repeatable)
    #[arg(long, value_parser = parse_fault)]
    fail: Vec<(u64, usize)>,

    /// Recover a processor: TICK:PROCESSOR (repeatable)
    #[arg(long, value_parser = parse_fault)]
    recover: Vec<(u64, usize)>,
}

fn parse_fault(s: &str) -> std::result::Result<(u64, usize), String> {
    let (tick, processor) = s
        .split_once(':')
        .ok_or_else(|| format!("expected TICK:PROCESSOR, got '{}'", s))?;
    let tick = tick.parse().map_err(|e| format!("bad tick '{}': {}", tick, e))?;
    let processor = processor
        .parse()
        .map_err(|e| format!("bad processor '{}': {}", processor, e))?;
    Ok((tick, processor))
}

impl SimArgs {
    fn to_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(n) = self.processors {
            config.processor_count = n;
        }
        if let Some(s) = &self.strategy {
            config.strategy = s.parse()?;
        }
        if let Some(a) = &self.assignment {
            config.assignment = a.parse()?;
        }
        if let Some(t) = self.ticks {
            config.tick_budget = t;
        }
        if let Some(n) = self.max_tasks {
            config.max_tasks = Some(n);
        }
        if let Some(d) = self.drain {
            config.max_drain_ticks = d;
        }
        if let Some(i) = self.interval {
            config.rebalance_interval = i;
        }
        if let Some(t) = self.threshold {
            config.imbalance_threshold = t;
        }
        if let Some(s) = self.seed {
            config.seed = s;
        }

        if let Some(kind) = &self.arrival {
            config.arrival = match kind.as_str() {
                "fixed" => ArrivalPolicy::Fixed {
                    per_tick: self.per_tick,
                    length: self.min_length,
                },
                "uniform" => ArrivalPolicy::Uniform {
                    min_tasks: self.min_tasks,
                    max_tasks: self.max_tasks_per_tick,
                    min_length: self.min_length,
                    max_length: self.max_length,
                },
                "bursty" => ArrivalPolicy::Bursty {
                    arrival_probability: self.arrival_probability,
                    burst_probability: self.burst_probability,
                    burst_size: self.max_tasks_per_tick,
                    min_length: self.min_length,
                    max_length: self.max_length,
                },
                other => bail!("unknown arrival policy '{}'", other),
            };
        }

        for &(tick, processor) in &self.fail {
            config.faults.push(FaultEvent::fail(tick, processor));
        }
        for &(tick, processor) in &self.recover {
            config.faults.push(FaultEvent::recover(tick, processor));
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber")?;

    match cli.command {
        Commands::Run {
            sim,
            output,
            trace_output,
            verbose,
            progress_ms,
        } => {
            let mut config = sim.to_config()?;
            config.record_trace = trace_output.is_some();
            run(config, output, trace_output, verbose, progress_ms)
        }
        Commands::Compare { sim, verbose } => compare(sim.to_config()?, verbose),
    }
}

fn run(
    config: Config,
    output: Option<PathBuf>,
    trace_output: Option<PathBuf>,
    verbose: bool,
    progress_ms: Option<u64>,
) -> Result<()> {
    let mut engine = Engine::new(config)?;
    let metrics = engine.metrics();
    let done = AtomicBool::new(false);

    let report = std::thread::scope(|s| {
        if let Some(ms) = progress_ms {
            let metrics = &metrics;
            let done = &done;
            s.spawn(move || {
                while !done.load(Ordering::Acquire) {
                    std::thread::sleep(Duration::from_millis(ms));
                    let snap = metrics.snapshot();
                    info!(
                        ticks = snap.ticks,
                        completed = snap.tasks_completed,
                        in_flight = snap.in_flight(),
                        utilization = snap.utilization(),
                        "progress"
                    );
                }
            });
        }
        let report = engine.run();
        done.store(true, Ordering::Release);
        report
    })?;

    ConsoleExporter::new(verbose).export(&report)?;

    if let Some(path) = output {
        JsonExporter::new(&path).export(&report)?;
        info!(path = %path.display(), "report written");
    }

    if let Some(path) = trace_output {
        let trace: &ExecutionTrace = engine.trace().context("trace was not recorded")?;
        trace.save(&path)?;
        info!(path = %path.display(), events = trace.len(), "trace written");
    }

    Ok(())
}

fn compare(config: Config, verbose: bool) -> Result<()> {
    let console = ConsoleExporter::new(verbose);

    for strategy in [BalancingStrategy::Centralized, BalancingStrategy::WorkStealing] {
        let config = Config {
            strategy,
            ..config.clone()
        };
        let report = loadsim::simulate(config)?;
        console.export(&report)?;
        println!();
    }

    Ok(())
}
