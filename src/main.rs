use std::alloc::System;
use std::collections::HashMap;
use std::hint::black_box;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use heapledger::{AccountingAllocator, ReplayConfig, Replayer, SharedLedger};
use tracing_subscriber::EnvFilter;

static LEDGER: SharedLedger = SharedLedger::new();

#[global_allocator]
static GLOBAL: AccountingAllocator<System> = AccountingAllocator::new(System, &LEDGER);

#[derive(Parser, Debug)]
#[command(name = "heapledger", about = "Peak and average heap need, sampled at every heap event")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a trace of heap events through a fresh ledger.
    Replay {
        /// Trace file (`<kind> <new_size> [<old_size>]` per line).
        trace: PathBuf,
        /// Fail on the first invalid event kind instead of skipping it.
        #[arg(long)]
        strict: bool,
        /// Print live bytes after every accepted event.
        #[arg(long)]
        timeline: bool,
    },
    /// Account this process's own heap while it runs a synthetic workload.
    Demo {
        /// Number of workload rounds.
        #[arg(long, default_value_t = 64)]
        rounds: usize,
        /// Bytes per buffer allocated in each round.
        #[arg(long, default_value_t = 4096)]
        block_size: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            trace,
            strict,
            timeline,
        } => run_replay(trace, strict, timeline)?,
        Commands::Demo { rounds, block_size } => run_demo(rounds, block_size)?,
    }

    Ok(())
}

fn run_replay(trace: PathBuf, strict: bool, timeline: bool) -> Result<()> {
    let replayer = Replayer::new(ReplayConfig {
        strict,
        record_timeline: timeline,
    });
    let outcome = replayer
        .replay_file(&trace)
        .with_context(|| format!("failed to replay {}", trace.display()))?;

    if let Some(timeline) = &outcome.timeline {
        for (event, live) in timeline.samples() {
            println!("{}\t{}", event, live);
        }
    }
    if outcome.rejected > 0 {
        println!("Rejected events: {}", outcome.rejected);
    }
    println!("{}", outcome.snapshot);

    Ok(())
}

fn run_demo(rounds: usize, block_size: usize) -> Result<()> {
    LEDGER.init();

    let mut retained: Vec<Vec<u8>> = Vec::new();
    let mut index: HashMap<usize, String> = HashMap::new();
    for round in 0..rounds {
        let mut buffer = vec![0u8; block_size];
        buffer.extend_from_slice(&[round as u8; 16]);
        index.insert(round, format!("round-{}", round));
        if round % 4 == 0 {
            retained.push(buffer);
        } else {
            black_box(&buffer);
        }
        if round % 16 == 15 {
            retained.clear();
            retained.shrink_to_fit();
        }
    }
    black_box(&index);
    drop(retained);
    drop(index);

    let snapshot = LEDGER.report().context("ledger was not initialized")?;
    println!("{}", snapshot);

    Ok(())
}
